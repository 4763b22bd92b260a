//! The condition translator.
//!
//! Evaluates an expression inside an interpreter-level `tryCatch` whose
//! handler returns error and interrupt conditions as sentinel values, then
//! turns the sentinel into the matching `BridgeError`.

use tether_interpreter::{Arg, Interpreter, Sexp, Shield};
use tracing::{debug, warn};

use crate::error::{BridgeError, Result};
use crate::sentinel::Sentinel;
use crate::state::translator;
use crate::unwind::unwind_protect;

/// Binds `expr` and `env` in the translator scope; resets both to `NULL`
/// when dropped.
struct Bindings<'a> {
    interp: &'a Interpreter,
    scope: Sexp,
}

impl<'a> Bindings<'a> {
    fn bind(interp: &'a Interpreter, scope: Sexp, expr: Sexp, env: Sexp) -> Self {
        interp.define_var("expr", expr, scope);
        interp.define_var("env", env, scope);
        Self { interp, scope }
    }
}

impl Drop for Bindings<'_> {
    fn drop(&mut self) {
        self.interp.define_var("expr", Sexp::NULL, self.scope);
        self.interp.define_var("env", Sexp::NULL, self.scope);
    }
}

/// Render a condition's message with the interpreter's `conditionMessage`
fn condition_message(interp: &Interpreter, condition: Sexp) -> Result<String> {
    unwind_protect(interp, |interp| {
        let function = interp.mk_symbol("conditionMessage");
        let call = interp.mk_lang(function, vec![Arg::positional(condition)]);
        let _call = Shield::new(interp, call);
        let message = interp.eval(call, interp.base_env());
        interp.string_elt(message, 0)
    })
}

/// Evaluate `expr` in `scope`.
///
/// Interpreter errors come back as `BridgeError::Eval` carrying the
/// condition message, interrupts as `BridgeError::Interrupted`. Other
/// non-local exits leave as `BridgeError::Longjump`.
pub fn evaluate(interp: &Interpreter, expr: Sexp, scope: Sexp) -> Result<Sexp> {
    // The template's own handlers are not established until its first step
    if interp.take_interrupt() {
        debug!("interrupt pending before evaluation");
        return Err(BridgeError::Interrupted);
    }

    let translator = translator(interp)?;
    let _expr = Shield::new(interp, expr);
    let _scope = Shield::new(interp, scope);

    let sentinel = {
        let _bindings = Bindings::bind(interp, translator.scope, expr, scope);
        unwind_protect(interp, |interp| {
            let result = interp.eval(translator.template, translator.scope);
            Sentinel::classify(interp, result)
        })?
    };

    match sentinel {
        Sentinel::Value(value) => Ok(value),
        Sentinel::Error(condition) => {
            let _condition = Shield::new(interp, condition);
            let message = condition_message(interp, condition)?;
            debug!(message, "evaluation signalled an error");
            Err(BridgeError::Eval { message })
        }
        Sentinel::Interrupt => {
            debug!("evaluation interrupted");
            Err(BridgeError::Interrupted)
        }
        Sentinel::Malformed(message) => {
            warn!(message, "malformed condition sentinel");
            Err(BridgeError::Internal { message })
        }
    }
}
