//! Parsing trusted source fragments.
//!
//! Fragments parsed here are part of the program, not user input, so any
//! failure is reported as `BridgeError::Internal`.

use tether_interpreter::{Interpreter, ParseStatus, Sexp, Shield};
use tracing::trace;

use crate::error::{BridgeError, Result};
use crate::unwind::unwind_protect;

fn parse_single(interp: &Interpreter, text: &str) -> Result<Sexp> {
    let source = interp.mk_string(text);
    let _source = Shield::new(interp, source);
    let code = interp.string_elt(source, 0);

    let (status, exprs) = interp.parse_vector(&code);
    match status {
        ParseStatus::Ok => {}
        ParseStatus::Incomplete => {
            return Err(BridgeError::internal(format!(
                "incomplete expression in {:?}",
                text
            )));
        }
        ParseStatus::Error => {
            let detail = interp
                .last_parse_error()
                .map(|error| error.to_string())
                .unwrap_or_default();
            return Err(BridgeError::internal(format!(
                "failed to parse {:?}: {}",
                text, detail
            )));
        }
    }

    match interp.length(exprs) {
        1 => Ok(interp.vector_elt(exprs, 0)),
        count => Err(BridgeError::internal(format!(
            "expected a single expression in {:?}, found {}",
            text, count
        ))),
    }
}

/// Parse `text`, which must hold exactly one expression
pub fn parse(interp: &Interpreter, text: &str) -> Result<Sexp> {
    trace!(text, "parse");
    unwind_protect(interp, |interp| parse_single(interp, text))?
}

/// Parse `text` and evaluate it in `scope`.
///
/// Evaluation is not translated: an unhandled interpreter error leaves as
/// `BridgeError::Longjump`.
pub fn parse_eval(interp: &Interpreter, text: &str, scope: Sexp) -> Result<Sexp> {
    trace!(text, "parse and evaluate");
    unwind_protect(interp, |interp| {
        let expr = parse_single(interp, text)?;
        let _expr = Shield::new(interp, expr);
        Ok(interp.eval(expr, scope))
    })?
}
