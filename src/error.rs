//! The error taxonomy used at the command-parsing boundary (FEN parsing,
//! UCI tokenizing, long-algebraic move parsing). Nothing below that
//! boundary returns `Result`: move generation, make/unmake, search and the
//! transposition table assume well-formed input and use `debug_assert!`
//! for the preconditions that indicate a programming bug rather than bad
//! input.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    InvalidFen { field: &'static str, value: String },
    UnknownCommand { line: String },
    IllegalMove { token: String },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidFen { field, value } => {
                write!(f, "invalid FEN {field} field: {value:?}")
            }
            EngineError::UnknownCommand { line } => write!(f, "unknown command: {line:?}"),
            EngineError::IllegalMove { token } => write!(f, "illegal move: {token}"),
        }
    }
}

impl std::error::Error for EngineError {}
