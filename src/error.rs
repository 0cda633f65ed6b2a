use crate::token::Token;
use std::error::Error;
use std::fmt;
use std::fmt::Formatter;
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ErrorKind {
    LexicalError,
    SyntaxError,
    TypeError,
    NameError,
    UnterminatedConstruct,
    NumericError,
    NotImplemented,
    IoError,
}

impl ErrorKind {
    /// Errors found by looking at the program text rather than by running it.
    pub fn is_static(self) -> bool {
        match self {
            ErrorKind::LexicalError
            | ErrorKind::SyntaxError
            | ErrorKind::NameError
            | ErrorKind::UnterminatedConstruct => true,
            _ => false,
        }
    }
}

/// An error that aborts interpretation, located in the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpretError {
    pub kind: ErrorKind,
    pub line: usize,
    pub column: usize,
    pub message: String,
    pub file: Option<String>,
}

impl InterpretError {
    pub fn new(kind: ErrorKind, line: usize, column: usize, message: impl Into<String>) -> Self {
        InterpretError {
            kind,
            line,
            column,
            message: message.into(),
            file: None,
        }
    }

    pub fn at(kind: ErrorKind, token: &Token, message: impl Into<String>) -> Self {
        InterpretError::new(kind, token.line, token.column, message)
    }

    pub fn with_file(mut self, file: &str) -> Self {
        self.file = Some(file.to_string());
        self
    }
}

impl fmt::Display for InterpretError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(file) = &self.file {
            write!(f, "File \"{}\", ", file)?;
        }
        write!(
            f,
            "line {}, column {}: {}: {}",
            self.line, self.column, self.kind, self.message
        )
    }
}

impl Error for InterpretError {
    fn description(&self) -> &str {
        &self.message
    }
}

/// Failure inside the value layer, before it is tied to a lexeme.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ValueError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        ValueError {
            kind,
            message: message.into(),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        ValueError::new(ErrorKind::TypeError, message)
    }

    pub fn numeric(message: impl Into<String>) -> Self {
        ValueError::new(ErrorKind::NumericError, message)
    }

    pub fn at(self, token: &Token) -> InterpretError {
        InterpretError::at(self.kind, token, self.message)
    }
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl Error for ValueError {}
