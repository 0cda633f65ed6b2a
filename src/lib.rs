pub mod environment;
pub mod error;
pub mod interpreter;
pub mod operators;
pub mod scanner;
pub mod token;
pub mod value;

mod expression;
mod flow;
mod functions;

pub use crate::error::{ErrorKind, InterpretError};
pub use crate::interpreter::{Interpreter, Trace};

use crate::scanner::Scanner;
use std::io::Write;

/// Scans and runs a whole program, writing `print` output and trace lines to
/// `out`, which is handed back on success.
pub fn interpret<W: Write>(source: &str, out: W) -> Result<W, InterpretError> {
    interpret_with_trace(source, out, Trace::default())
}

/// Like `interpret`, with trace switches already on before the first
/// statement.
pub fn interpret_with_trace<W: Write>(
    source: &str,
    out: W,
    trace: Trace,
) -> Result<W, InterpretError> {
    let mut interpreter = Interpreter::new(Scanner::new(source)?, out).with_trace(trace);
    interpreter.interpret()?;
    Ok(interpreter.into_output())
}
