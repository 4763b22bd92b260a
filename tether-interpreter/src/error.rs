//! Error types surfaced by the interpreter's host-facing entry points.
//!
//! Inside the interpreter failures are conditions delivered by unwinding;
//! these types only appear where a top-level context turns an escaped
//! non-local exit back into a `Result`.

use miette::Diagnostic;
use tether_parser::ParseError;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum InterpreterError {
    #[error("Evaluation aborted: {message}")]
    #[diagnostic(
        code(tether::interpreter::aborted),
        help("An error or restart was not handled before reaching top level")
    )]
    Aborted { message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),
}

pub type Result<T> = std::result::Result<T, InterpreterError>;
