//! The jump guard.
//!
//! Interpreter errors, interrupts and restarts leave an evaluation by
//! unwinding straight to the interpreter context that handles them. Host code
//! that calls into the interpreter must not be skipped over that way: a host
//! frame between two interpreter frames would lose its `Result` handling and
//! see its caller's invariants broken.
//!
//! [`unwind_protect`] runs a callback under the interpreter's own
//! unwind-protection primitive. When the interpreter reports that the callback
//! is being left by a jump, the clean-up notifier hops back to the guard's
//! armed target, which turns the jump into [`BridgeError::Longjump`]. The
//! interpreter side of the jump stays parked in an [`UnwindToken`] until it is
//! resumed with [`resume_jump`] at the next interpreter boundary or resolved
//! with [`toplevel`].

use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};

use tether_interpreter::{Interpreter, Sexp, Shield};
use tracing::{debug, error, trace};

use crate::error::{BridgeError, Result};

type TargetId = u64;

thread_local! {
    static ARMED: RefCell<Vec<TargetId>> = const { RefCell::new(Vec::new()) };
    static NEXT_TARGET: Cell<TargetId> = const { Cell::new(1) };
}

/// Unwind payload carrying a jump back to the guard that armed `target`
#[derive(Debug)]
pub(crate) struct HostJump {
    target: TargetId,
}

/// A jump target armed for the duration of one guarded call.
///
/// Targets nest with the host stack. Dropping disarms.
struct JumpTarget {
    id: TargetId,
    fired: Cell<bool>,
}

impl JumpTarget {
    fn arm() -> Self {
        let id = NEXT_TARGET.with(|next| {
            let id = next.get();
            next.set(id + 1);
            id
        });
        ARMED.with(|armed| armed.borrow_mut().push(id));
        trace!(id, "armed jump target");
        Self {
            id,
            fired: Cell::new(false),
        }
    }

    fn is_innermost(&self) -> bool {
        ARMED.with(|armed| armed.borrow().last() == Some(&self.id))
    }

    /// Accept a jump addressed to this target; false if it cannot be taken
    fn fire(&self, jump: &HostJump) -> bool {
        jump.target == self.id && self.is_innermost() && !self.fired.replace(true)
    }
}

impl Drop for JumpTarget {
    fn drop(&mut self) {
        ARMED.with(|armed| {
            let mut armed = armed.borrow_mut();
            if let Some(position) = armed.iter().rposition(|id| *id == self.id) {
                armed.remove(position);
            }
        });
        trace!(id = self.id, "disarmed jump target");
    }
}

/// True if an unwind payload belongs to the jump guard
pub(crate) fn is_host_jump(payload: &(dyn std::any::Any + Send)) -> bool {
    payload.is::<HostJump>()
}

/// An interpreter jump parked while its `Longjump` error travels through
/// host frames.
///
/// The continuation is preserved until the token is resumed or dropped.
pub struct UnwindToken {
    interp: Interpreter,
    cont: Sexp,
}

impl UnwindToken {
    fn new(interp: &Interpreter, cont: Sexp) -> Self {
        interp.preserve_object(cont);
        Self {
            interp: interp.clone(),
            cont,
        }
    }

    /// The interpreter continuation holding the pending jump
    pub fn cont(&self) -> Sexp {
        self.cont
    }

    /// Human readable description of the pending jump
    pub fn describe(&self) -> String {
        if !self.interp.is_live(self.cont) {
            return "released continuation".to_string();
        }
        match self.interp.unwind_cont_jump(self.cont) {
            Some(jump) => self.interp.describe_jump(&jump),
            None => "no pending jump".to_string(),
        }
    }
}

impl Drop for UnwindToken {
    fn drop(&mut self) {
        trace!(cont = ?self.cont, "release unwind token");
        self.interp.release_object(self.cont);
    }
}

impl fmt::Debug for UnwindToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnwindToken")
            .field("cont", &self.cont)
            .finish()
    }
}

/// Run `callback` so that a non-local exit out of it comes back as
/// `BridgeError::Longjump` instead of unwinding through the caller.
///
/// Nested calls arm their own target; an exit is always taken by the
/// innermost guard.
pub fn unwind_protect<T>(interp: &Interpreter, callback: impl FnOnce(&Interpreter) -> T) -> Result<T> {
    let cont = interp.make_unwind_cont();
    let _cont = Shield::new(interp, cont);
    let target = JumpTarget::arm();
    let height = interp.protect_height();

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        interp.unwind_protect(
            callback,
            |_, jumped| {
                if jumped {
                    trace!(id = target.id, "jump intercepted; returning to guard");
                    resume_unwind(Box::new(HostJump { target: target.id }));
                }
            },
            cont,
        )
    }));

    match outcome {
        Ok(value) => Ok(value),
        Err(payload) => match payload.downcast::<HostJump>() {
            Ok(jump) if target.fire(&jump) => {
                interp.restore_protect_height(height);
                let token = UnwindToken::new(interp, cont);
                debug!(id = target.id, jump = %token.describe(), "guarded call left by a jump");
                Err(BridgeError::Longjump(token))
            }
            Ok(jump) => {
                interp.restore_protect_height(height);
                error!(id = target.id, stray = jump.target, "spurious jump reached guard");
                Err(BridgeError::internal(format!(
                    "spurious jump to target {} caught by target {}",
                    jump.target, target.id
                )))
            }
            Err(payload) => resume_unwind(payload),
        },
    }
}

/// Hand a parked jump back to the interpreter, continuing its unwind.
///
/// Must be called from code the interpreter called, e.g. a native function.
pub fn resume_jump(interp: &Interpreter, token: UnwindToken) -> ! {
    let cont = token.cont;
    let _cont = Shield::new(interp, cont);
    drop(token);
    debug!(?cont, "resuming interpreter jump");
    interp.continue_unwind(cont)
}

/// Run `f` at the outermost host frame, resolving an escaped
/// `Longjump` into `BridgeError::Aborted`.
pub fn toplevel<T>(interp: &Interpreter, f: impl FnOnce(&Interpreter) -> Result<T>) -> Result<T> {
    match f(interp) {
        Err(BridgeError::Longjump(token)) => {
            let message = token.describe();
            debug!(message, "non-local exit resolved at top level");
            Err(BridgeError::Aborted { message })
        }
        other => other,
    }
}
