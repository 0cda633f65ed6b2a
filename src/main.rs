use clap::{App, Arg};
use havabol::{ErrorKind, Trace};
use log::info;
use std::fs;
use std::io;
use std::process;

fn main() {
    env_logger::init();
    let matches = App::new("havabol")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Runs a HavaBol program")
        .arg(
            Arg::with_name("SOURCE")
                .help("Program to run")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("trace-tokens")
                .long("trace-tokens")
                .help("Print each token as it is read"),
        )
        .arg(
            Arg::with_name("trace-expr")
                .long("trace-expr")
                .help("Print the result of each expression"),
        )
        .arg(
            Arg::with_name("trace-assign")
                .long("trace-assign")
                .help("Print each assignment"),
        )
        .get_matches();

    let trace = Trace {
        tokens: matches.is_present("trace-tokens"),
        expressions: matches.is_present("trace-expr"),
        assignments: matches.is_present("trace-assign"),
    };
    // SOURCE is required, so clap has already rejected a missing one.
    let file = matches.value_of("SOURCE").unwrap_or_default();
    process::exit(run_file(file, trace));
}

fn exit_code(kind: ErrorKind) -> i32 {
    if kind.is_static() {
        65
    } else {
        70
    }
}

fn run_file(file: &str, trace: Trace) -> i32 {
    let contents = match fs::read_to_string(file) {
        Ok(contents) => contents,
        Err(e) => {
            eprintln!("{}: {}", file, e);
            return 66;
        }
    };
    info!("running {} ({} bytes)", file, contents.len());
    let stdout = io::stdout();
    match havabol::interpret_with_trace(&contents, stdout.lock(), trace) {
        Ok(_) => 0,
        Err(err) => {
            let code = exit_code(err.kind);
            eprintln!("{}", err.with_file(file));
            code
        }
    }
}
