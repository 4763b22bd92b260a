//! Bridge state attached to each interpreter, built on first use.

use std::rc::Rc;

use once_cell::unsync::OnceCell;
use tether_interpreter::{Interpreter, Sexp, Shield};
use tracing::debug;

use crate::error::{BridgeError, Result};
use crate::parse::{parse, parse_eval};
use crate::sentinel::HANDLER_SOURCE;

const TEMPLATE_SOURCE: &str = "tryCatch(eval(expr, env), error = handler, interrupt = handler)";

/// Translator scope: a child of the base scope binding `expr`, `env` and the
/// caught-condition handler
fn scope_source() -> String {
    format!(
        "evalq(envir = new.env(parent = baseenv()), {{
            expr <- NULL
            env <- NULL
            handler <- {}
            environment()
        }})",
        HANDLER_SOURCE
    )
}

/// Artifacts of the condition translator
#[derive(Debug, Clone, Copy)]
pub(crate) struct Translator {
    /// `tryCatch(eval(expr, env), ...)`
    pub(crate) template: Sexp,
    /// Scope the template is evaluated in
    pub(crate) scope: Sexp,
    /// The handler closure bound in `scope`
    pub(crate) handler: Sexp,
}

#[derive(Default)]
pub(crate) struct BridgeState {
    translator: OnceCell<Translator>,
    dispatch: OnceCell<Sexp>,
}

fn state(interp: &Interpreter) -> Rc<BridgeState> {
    interp.extension(BridgeState::default)
}

/// The translator artifacts, building and preserving them on first use
pub(crate) fn translator(interp: &Interpreter) -> Result<Translator> {
    let state = state(interp);
    state
        .translator
        .get_or_try_init(|| {
            let template = parse(interp, TEMPLATE_SOURCE)?;
            let _template = Shield::new(interp, template);

            let scope = parse_eval(interp, &scope_source(), interp.base_env())?;
            if !interp.is_environment(scope) {
                return Err(BridgeError::internal("translator scope is not an environment"));
            }
            let handler = interp
                .find_var_in_frame("handler", scope)
                .ok_or_else(|| BridgeError::internal("translator scope has no handler"))?;

            interp.preserve_object(template);
            interp.preserve_object(scope);

            debug!(?template, ?scope, "condition translator initialised");
            Ok(Translator {
                template,
                scope,
                handler,
            })
        })
        .copied()
}

/// Register the host dispatch function once per interpreter
pub(crate) fn ensure_dispatch(
    interp: &Interpreter,
    register: impl FnOnce(&Interpreter) -> Sexp,
) -> Sexp {
    *state(interp).dispatch.get_or_init(|| register(interp))
}
