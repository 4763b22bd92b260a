//! Condition sentinels: conditions carried back as ordinary values.
//!
//! The wrapper the bridge evaluates catches error and interrupt conditions
//! with a handler that returns `structure(list(condition), class =
//! "tether:::caughtCondition")`. Anything else is the evaluation's value.

use tether_interpreter::{Interpreter, Sexp};

/// Class attribute marking a caught condition
pub const CAUGHT_CONDITION_CLASS: &str = "tether:::caughtCondition";

/// Handler installed for caught conditions, in interpreter source
pub(crate) const HANDLER_SOURCE: &str =
    "function(cnd) structure(list(cnd), class = \"tether:::caughtCondition\")";

#[derive(Debug, Clone, PartialEq)]
pub enum Sentinel {
    /// An ordinary result
    Value(Sexp),
    /// A caught error condition
    Error(Sexp),
    /// A caught interrupt
    Interrupt,
    /// Tagged as a caught condition but not shaped like one
    Malformed(String),
}

impl Sentinel {
    /// Classify the result of a wrapped evaluation.
    ///
    /// Inspects the value through the interpreter, so run it under the jump
    /// guard.
    pub fn classify(interp: &Interpreter, value: Sexp) -> Self {
        if !interp.inherits(value, CAUGHT_CONDITION_CLASS) {
            return Sentinel::Value(value);
        }

        if !interp.is_list(value) || interp.length(value) != 1 {
            return Sentinel::Malformed(format!(
                "caught condition must be a list of length one, found {} of length {}",
                interp.type_name(value),
                interp.length(value)
            ));
        }

        let condition = interp.vector_elt(value, 0);
        if interp.inherits(condition, "error") {
            Sentinel::Error(condition)
        } else if interp.inherits(condition, "interrupt") {
            Sentinel::Interrupt
        } else {
            Sentinel::Malformed(format!(
                "caught condition has unexpected class {:?}",
                interp.class(condition)
            ))
        }
    }
}
