//! Host-side errors produced by the bridge.

use miette::Diagnostic;
use thiserror::Error;

use crate::unwind::UnwindToken;

#[derive(Error, Diagnostic, Debug)]
pub enum BridgeError {
    /// The interpreter signalled an error condition
    #[error("{message}")]
    #[diagnostic(code(tether::bridge::eval))]
    Eval { message: String },

    /// Evaluation was cancelled by an interrupt
    #[error("Evaluation interrupted")]
    #[diagnostic(code(tether::bridge::interrupted))]
    Interrupted,

    /// A protocol violation inside the bridge itself
    #[error("Internal bridge error: {message}")]
    #[diagnostic(
        code(tether::bridge::internal),
        help("This indicates a bug in tether-bridge or in the interpreter, not in the evaluated code")
    )]
    Internal { message: String },

    /// A non-local exit left a guarded interpreter call.
    ///
    /// Must be handed back to the interpreter with `resume_jump`, or resolved
    /// at the outermost host frame with `toplevel`.
    #[error("Non-local exit from interpreter: {}", .0.describe())]
    #[diagnostic(
        code(tether::bridge::longjump),
        help("Resume it with `resume_jump` or resolve it with `toplevel`")
    )]
    Longjump(UnwindToken),

    /// A non-local exit that reached the outermost host frame
    #[error("Evaluation aborted: {message}")]
    #[diagnostic(code(tether::bridge::aborted))]
    Aborted { message: String },
}

impl BridgeError {
    pub(crate) fn internal(message: impl Into<String>) -> Self {
        BridgeError::Internal {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
