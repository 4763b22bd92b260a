//! Calling host closures from interpreter code.
//!
//! [`try_catch`] wraps a host callback in an external pointer and evaluates
//! `tryCatch(call_back_externalptr(ptr), error = handler, interrupt = handler)`.
//! The dispatcher runs the callback and converts any failure into an
//! interpreter condition, so host errors and panics never unwind across
//! interpreter frames.

use std::any::Any;
use std::cell::RefCell;
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use std::rc::Rc;

use tether_interpreter::{Arg, Interpreter, Sexp, Shelter, is_jump};
use tracing::{debug, warn};

use crate::error::{BridgeError, Result};
use crate::sentinel::Sentinel;
use crate::state::{ensure_dispatch, translator};
use crate::unwind::{is_host_jump, resume_jump, unwind_protect};

/// Name of the dispatch function registered in the base scope
pub const DISPATCH_SYMBOL: &str = "call_back_externalptr";

type HostCallback = Box<dyn FnOnce(&Interpreter) -> Result<Sexp>>;

/// A callback waiting to be run by the dispatcher
struct PendingCallback {
    callback: RefCell<Option<HostCallback>>,
    failure: RefCell<Option<String>>,
}

impl PendingCallback {
    fn record_failure(&self, message: &str) {
        debug!(message, "host callback failed");
        self.failure.replace(Some(message.to_string()));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("host callback panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("host callback panicked: {}", message)
    } else {
        "host callback panicked".to_string()
    }
}

fn dispatch(interp: &Interpreter, args: &[Sexp]) -> Sexp {
    let [ptr] = args else {
        interp.stop(format!("{} takes exactly one argument", DISPATCH_SYMBOL))
    };
    let pending = match interp
        .external_ptr(*ptr)
        .and_then(|any| any.downcast::<PendingCallback>().ok())
    {
        Some(pending) => pending,
        None => interp.stop("invalid host callback pointer"),
    };
    let Some(callback) = pending.callback.borrow_mut().take() else {
        interp.stop("host callback has already been called")
    };

    match catch_unwind(AssertUnwindSafe(|| callback(interp))) {
        // A cancellation requested by the callback is delivered while the
        // wrapper's handlers are still live
        Ok(Ok(_)) if interp.take_interrupt() => {
            pending.record_failure("interrupted");
            interp.signal_interrupt()
        }
        Ok(Ok(value)) => value,
        Ok(Err(BridgeError::Longjump(token))) => resume_jump(interp, token),
        Ok(Err(BridgeError::Interrupted)) => {
            pending.record_failure("interrupted");
            interp.signal_interrupt()
        }
        Ok(Err(error)) => {
            let message = error.to_string();
            pending.record_failure(&message);
            interp.stop(message)
        }
        // Interpreter exits raised by unguarded calls keep unwinding
        Err(payload) if is_jump(payload.as_ref()) || is_host_jump(payload.as_ref()) => {
            resume_unwind(payload)
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(message, "host callback panicked");
            pending.record_failure(&message);
            interp.stop(message)
        }
    }
}

/// Run `callback` as if interpreter code had called it.
///
/// Returns the callback's value and `false` when it succeeds. When the
/// callback fails, panics, is interrupted or requests an interrupt, or
/// signals an interpreter condition, the failure is caught on the interpreter
/// side and the result is `NULL` with `true`. An interrupt already pending
/// skips the callback with the same result.
pub fn try_catch<F>(interp: &Interpreter, callback: F) -> Result<(Sexp, bool)>
where
    F: FnOnce(&Interpreter) -> Result<Sexp> + 'static,
{
    if interp.take_interrupt() {
        debug!("interrupt pending before host callback; callback skipped");
        return Ok((Sexp::NULL, true));
    }

    let translator = translator(interp)?;
    ensure_dispatch(interp, |interp| interp.define_native(DISPATCH_SYMBOL, dispatch));

    let pending = Rc::new(PendingCallback {
        callback: RefCell::new(Some(Box::new(callback))),
        failure: RefCell::new(None),
    });

    let mut shelter = Shelter::new(interp);
    let ptr = shelter.protect(interp.mk_external_ptr(pending.clone()));
    let dispatch_call = shelter.protect(interp.mk_lang(
        interp.mk_symbol(DISPATCH_SYMBOL),
        vec![Arg::positional(ptr)],
    ));
    let call = shelter.protect(interp.mk_lang(
        interp.mk_symbol("tryCatch"),
        vec![
            Arg::positional(dispatch_call),
            Arg::named("error", translator.handler),
            Arg::named("interrupt", translator.handler),
        ],
    ));

    let sentinel = unwind_protect(interp, |interp| {
        let result = interp.eval(call, interp.base_env());
        Sentinel::classify(interp, result)
    })?;

    let failure = pending.failure.borrow_mut().take();
    match (failure, sentinel) {
        (Some(message), _) => {
            debug!(message, "host callback failure caught");
            Ok((Sexp::NULL, true))
        }
        (None, Sentinel::Value(value)) => Ok((value, false)),
        (None, Sentinel::Malformed(message)) => Err(BridgeError::Internal { message }),
        (None, Sentinel::Error(_) | Sentinel::Interrupt) => {
            debug!("interpreter condition raised inside host callback caught");
            Ok((Sexp::NULL, true))
        }
    }
}
