//! Tether Bridge
//!
//! Safe calls between host code and the Tether interpreter. The interpreter
//! signals errors, interrupts and restarts by unwinding straight to the
//! context that handles them; the functions here make sure such an exit is
//! always turned into a [`BridgeError`] before it can skip a host frame.
//!
//! - [`unwind_protect`] guards any interpreter call, returning
//!   [`BridgeError::Longjump`] when the call is left by a jump.
//! - [`evaluate`] additionally catches error and interrupt conditions and
//!   reports them as [`BridgeError::Eval`] and [`BridgeError::Interrupted`].
//! - [`parse`] and [`parse_eval`] handle trusted source fragments.
//! - [`try_catch`] runs a host closure as if interpreter code had called it.

#![allow(clippy::uninlined_format_args)]

pub mod callback;
pub mod error;
pub mod parse;
pub mod sentinel;
mod state;
pub mod translate;
pub mod unwind;

// Include tests directory with all test modules
#[cfg(test)]
#[path = "tests/mod.rs"]
pub mod tests;

// Re-export public API
pub use callback::{DISPATCH_SYMBOL, try_catch};
pub use error::{BridgeError, Result};
pub use parse::{parse, parse_eval};
pub use sentinel::{CAUGHT_CONDITION_CLASS, Sentinel};
pub use translate::evaluate;
pub use unwind::{UnwindToken, resume_jump, toplevel, unwind_protect};

/// Parse `text` and evaluate it with condition translation.
///
/// Convenience for `evaluate(parse(text), scope)`.
pub fn evaluate_source(
    interp: &tether_interpreter::Interpreter,
    text: &str,
    scope: tether_interpreter::Sexp,
) -> Result<tether_interpreter::Sexp> {
    let expr = parse(interp, text)?;
    let _expr = tether_interpreter::Shield::new(interp, expr);
    evaluate(interp, expr, scope)
}
