//! Tether Interpreter
//!
//! An embedded, R-flavoured interpreter. Values live in a handle table
//! owned by the interpreter; host code refers to them through [`Sexp`]
//! handles and keeps them alive with the protect stack or the preserve set.
//!
//! Errors, interrupts and restarts are non-local exits: they unwind the host
//! stack straight to the context that handles them, skipping every frame in
//! between. Host code that needs to survive such an exit runs under
//! [`Interpreter::unwind_protect`] or [`Interpreter::toplevel_exec`].

#![allow(clippy::uninlined_format_args)]

pub mod builtins;
pub mod context;
pub mod convert;
pub mod display;
pub mod error;
pub mod eval;
pub mod heap;
pub mod interpreter;
pub mod options;
pub mod protect;
pub mod sexp;

// Include tests directory with all test modules
#[cfg(test)]
#[path = "tests/mod.rs"]
pub mod tests;

// Re-export public API
pub use builtins::{builtin_names, identical};
pub use context::{BOTTOM, ContextId, Jump, JumpKind, is_jump};
pub use convert::ParseStatus;
pub use display::{deparse, format_double, format_value};
pub use error::{InterpreterError, Result};
pub use interpreter::{Interpreter, InterpreterStats};
pub use options::InterpreterOptions;
pub use protect::{Shelter, Shield};
pub use sexp::{Arg, Object, Sexp};

/// Parse `source` and evaluate every expression in the global scope inside
/// a top-level context, returning the last value.
///
/// Mainly useful for tests and the REPL.
pub fn evaluate_from_string(interp: &Interpreter, source: &str) -> Result<Sexp> {
    let (status, exprs) = interp.parse_vector(source);
    if status != ParseStatus::Ok {
        let error = interp.last_parse_error().ok_or_else(|| InterpreterError::Aborted {
            message: "parse failed".to_string(),
        })?;
        return Err(error.into());
    }

    let _exprs = Shield::new(interp, exprs);
    interp.toplevel_exec(|interp| interp.eval(exprs, interp.global_env()))
}
