//! Evaluation contexts and non-local exits.
//!
//! Conditions, restarts and interrupts leave the current evaluation by
//! unwinding the host stack with a [`Jump`] payload addressed to a context.
//! The unwind is started with [`std::panic::resume_unwind`], so no panic hook
//! runs. Every context that can be the target of a jump catches the unwind,
//! checks whether the jump is addressed to it, and either handles it or lets
//! it continue outwards.
//!
//! Host code interleaved with interpreter frames must therefore never assume
//! that an interpreter call returns: only [`Interpreter::unwind_protect`]
//! and [`Interpreter::toplevel_exec`] give it a chance to observe the exit.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};

use tracing::{debug, trace};

use crate::error::{InterpreterError, Result};
use crate::interpreter::Interpreter;
use crate::sexp::{Object, Sexp};

#[cfg(panic = "abort")]
compile_error!("tether-interpreter delivers conditions by unwinding and requires panic = \"unwind\"");

pub type ContextId = u64;

/// Target of jumps that found no live top-level context
pub const BOTTOM: ContextId = 0;

#[derive(Debug, Clone, PartialEq)]
pub enum JumpKind {
    /// Deliver `condition` to `handler`, established by a try-catch context
    Condition { condition: Sexp, handler: Sexp },
    /// Abandon evaluation back to a top-level context
    Abort { message: Option<String> },
}

/// Payload of an in-flight non-local exit
#[derive(Debug, Clone, PartialEq)]
pub struct Jump {
    pub(crate) target: ContextId,
    pub(crate) kind: JumpKind,
}

impl Jump {
    pub fn target(&self) -> ContextId {
        self.target
    }

    pub fn kind(&self) -> &JumpKind {
        &self.kind
    }

    pub(crate) fn children(&self, out: &mut Vec<Sexp>) {
        if let JumpKind::Condition { condition, handler } = &self.kind {
            out.push(*condition);
            out.push(*handler);
        }
    }
}

/// True if an unwind payload is an interpreter jump
pub fn is_jump(payload: &(dyn Any + Send)) -> bool {
    payload.is::<Jump>()
}

#[derive(Debug, Clone)]
pub(crate) enum ContextKind {
    TopLevel,
    TryCatch { handlers: Vec<(String, Sexp)> },
    UnwindProtect,
}

#[derive(Debug, Clone)]
pub(crate) struct ContextFrame {
    pub(crate) id: ContextId,
    pub(crate) kind: ContextKind,
}

/// Pops its context when dropped, including while unwinding.
pub(crate) struct ContextGuard<'a> {
    interp: &'a Interpreter,
    id: ContextId,
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        let mut contexts = self.interp.state.contexts.borrow_mut();
        if let Some(position) = contexts.iter().rposition(|frame| frame.id == self.id) {
            contexts.truncate(position);
        }
    }
}

impl Interpreter {
    pub(crate) fn begin_context(&self, kind: ContextKind) -> ContextGuard<'_> {
        let id = self.state.next_context_id.get();
        self.state.next_context_id.set(id + 1);
        trace!(id, ?kind, "begin context");
        self.state
            .contexts
            .borrow_mut()
            .push(ContextFrame { id, kind });
        ContextGuard { interp: self, id }
    }

    /// Number of live evaluation contexts
    pub fn context_depth(&self) -> usize {
        self.state.contexts.borrow().len()
    }

    fn context_is_live(&self, id: ContextId) -> bool {
        self.state
            .contexts
            .borrow()
            .iter()
            .any(|frame| frame.id == id)
    }

    fn innermost_toplevel(&self) -> ContextId {
        self.state
            .contexts
            .borrow()
            .iter()
            .rev()
            .find(|frame| matches!(frame.kind, ContextKind::TopLevel))
            .map_or(BOTTOM, |frame| frame.id)
    }

    fn jump(&self, jump: Jump) -> ! {
        trace!(context = jump.target, kind = ?jump.kind, "jump");
        resume_unwind(Box::new(jump))
    }

    /// Take `payload` if it is a jump addressed to `id`
    fn catch_jump(
        &self,
        id: ContextId,
        payload: Box<dyn Any + Send>,
    ) -> std::result::Result<Jump, Box<dyn Any + Send>> {
        match payload.downcast::<Jump>() {
            Ok(jump) if jump.target == id => Ok(*jump),
            Ok(jump) => Err(jump),
            Err(payload) => Err(payload),
        }
    }

    // Conditions

    /// Build a condition object: `list(message, call)` with the given classes
    pub fn make_condition(&self, message: &str, call: Sexp, classes: &[&str]) -> Sexp {
        let message = self.mk_string(message);
        let condition = self.mk_named_list(vec![
            ("message".to_string(), message),
            ("call".to_string(), call),
        ]);
        self.set_class(
            condition,
            Some(classes.iter().map(|class| class.to_string()).collect()),
        );
        condition
    }

    pub fn make_error_condition(&self, message: &str, call: Sexp) -> Sexp {
        self.make_condition(message, call, &["simpleError", "error", "condition"])
    }

    /// Message carried by a condition object
    pub fn condition_message(&self, condition: Sexp) -> Option<String> {
        let message = self.list_elt(condition, "message")?;
        self.with_node(message, |node| match &node.object {
            Object::Str(values) => values.first().cloned(),
            _ => None,
        })
    }

    /// Offer `condition` to the established handlers.
    ///
    /// Jumps to the innermost try-catch context with a handler for one of the
    /// condition's classes; returns if there is none. The search does not look
    /// past a top-level context.
    pub fn signal_condition(&self, condition: Sexp) {
        let classes = self.class(condition);
        let found = {
            let contexts = self.state.contexts.borrow();
            contexts
                .iter()
                .rev()
                .take_while(|frame| !matches!(frame.kind, ContextKind::TopLevel))
                .find_map(|frame| match &frame.kind {
                    ContextKind::TryCatch { handlers } => handlers
                        .iter()
                        .find(|(class, _)| classes.contains(class))
                        .map(|(class, handler)| (frame.id, class.clone(), *handler)),
                    _ => None,
                })
        };

        if let Some((target, class, handler)) = found {
            debug!(context = target, class, "condition caught by try-catch");
            self.jump(Jump {
                target,
                kind: JumpKind::Condition { condition, handler },
            });
        }
    }

    /// Signal `condition`; without a handler, abort to top level.
    pub fn raise(&self, condition: Sexp) -> ! {
        self.signal_condition(condition);

        let message = if self.inherits(condition, "interrupt") {
            "interrupted".to_string()
        } else {
            let text = self.condition_message(condition).unwrap_or_default();
            format!("Error: {}", text)
        };
        debug!(message, "unhandled condition");
        self.abort(Some(message))
    }

    /// Signal an error condition with `message`
    pub fn stop(&self, message: impl Into<String>) -> ! {
        let message = message.into();
        let condition = self.make_error_condition(&message, Sexp::NULL);
        self.raise(condition)
    }

    /// Signal an interrupt condition
    pub fn signal_interrupt(&self) -> ! {
        let condition = self.make_condition("", Sexp::NULL, &["interrupt", "condition"]);
        self.raise(condition)
    }

    /// Ask the running evaluation to stop at its next step
    pub fn request_interrupt(&self) {
        debug!("interrupt requested");
        self.state.interrupt_pending.set(true);
    }

    pub fn interrupt_pending(&self) -> bool {
        self.state.interrupt_pending.get()
    }

    /// Clear a pending interrupt, returning whether one was pending.
    ///
    /// Always false when interrupt checking is disabled.
    pub fn take_interrupt(&self) -> bool {
        self.state.options.check_interrupts && self.state.interrupt_pending.replace(false)
    }

    pub(crate) fn check_interrupt(&self) {
        if self.take_interrupt() {
            self.signal_interrupt();
        }
    }

    /// Jump to the innermost top-level context (`invokeRestart("abort")`)
    pub fn abort(&self, message: Option<String>) -> ! {
        let target = self.innermost_toplevel();
        self.jump(Jump {
            target,
            kind: JumpKind::Abort { message },
        })
    }

    /// Readable summary of a pending jump
    pub fn describe_jump(&self, jump: &Jump) -> String {
        match &jump.kind {
            JumpKind::Abort {
                message: Some(message),
            } => message.clone(),
            JumpKind::Abort { message: None } => "abort".to_string(),
            JumpKind::Condition { condition, .. } => match self.condition_message(*condition) {
                Some(message) => format!("condition: {}", message),
                None => format!("condition of class {:?}", self.class(*condition)),
            },
        }
    }

    // Top-level and try-catch contexts

    /// Run `f` in a fresh top-level context.
    ///
    /// Handlers established outside are invisible to `f`; any abort ends
    /// here and is reported as `InterpreterError::Aborted`.
    pub fn toplevel_exec(&self, f: impl FnOnce(&Interpreter) -> Sexp) -> Result<Sexp> {
        let height = self.protect_height();
        let guard = self.begin_context(ContextKind::TopLevel);
        let id = guard.id;

        let outcome = catch_unwind(AssertUnwindSafe(|| f(self)));
        drop(guard);

        match outcome {
            Ok(value) => Ok(value),
            Err(payload) => match self.catch_jump(id, payload) {
                Ok(jump) => {
                    self.restore_protect_height(height);
                    let message = self.describe_jump(&jump);
                    debug!(message, "top-level context caught abort");
                    Err(InterpreterError::Aborted { message })
                }
                Err(payload) => resume_unwind(payload),
            },
        }
    }

    /// Evaluate `body` with `handlers` (condition class, handler function)
    /// established; a caught condition is passed to its handler after the
    /// context has been left.
    pub fn try_catch_handlers(
        &self,
        handlers: Vec<(String, Sexp)>,
        body: impl FnOnce(&Interpreter) -> Sexp,
    ) -> Sexp {
        if handlers.is_empty() {
            return body(self);
        }

        let height = self.protect_height();
        let guard = self.begin_context(ContextKind::TryCatch { handlers });
        let id = guard.id;

        let outcome = catch_unwind(AssertUnwindSafe(|| body(self)));
        drop(guard);

        match outcome {
            Ok(value) => value,
            Err(payload) => match self.catch_jump(id, payload) {
                Ok(Jump {
                    kind: JumpKind::Condition { condition, handler },
                    ..
                }) => {
                    self.restore_protect_height(height);
                    self.call_function(handler, &[condition])
                }
                Ok(jump) => resume_unwind(Box::new(jump)),
                Err(payload) => resume_unwind(payload),
            },
        }
    }

    // Unwind protection

    /// Allocate an empty continuation for `unwind_protect`
    pub fn make_unwind_cont(&self) -> Sexp {
        self.alloc(Object::UnwindCont(None))
    }

    /// Pending jump stored in a continuation, if any
    pub fn unwind_cont_jump(&self, cont: Sexp) -> Option<Jump> {
        self.with_node(cont, |node| match &node.object {
            Object::UnwindCont(jump) => jump.clone(),
            _ => None,
        })
    }

    fn store_unwind_cont(&self, cont: Sexp, jump: Option<Jump>) -> Option<Jump> {
        let stored = self.with_node_mut(cont, |node| match &mut node.object {
            Object::UnwindCont(slot) => Ok(std::mem::replace(slot, jump)),
            _ => Err(()),
        });
        match stored {
            Ok(previous) => previous,
            Err(()) => self.stop("invalid unwind continuation"),
        }
    }

    /// Run `fun`; `clean` always runs afterwards with `true` if `fun` was
    /// left by a jump.
    ///
    /// On a jump the payload is first stored in `cont`. If `clean` returns,
    /// the jump is resumed with `continue_unwind(cont)`.
    pub fn unwind_protect<R>(
        &self,
        fun: impl FnOnce(&Interpreter) -> R,
        clean: impl FnOnce(&Interpreter, bool),
        cont: Sexp,
    ) -> R {
        let guard = self.begin_context(ContextKind::UnwindProtect);
        let outcome = catch_unwind(AssertUnwindSafe(|| fun(self)));
        drop(guard);

        match outcome {
            Ok(value) => {
                clean(self, false);
                value
            }
            Err(payload) => match payload.downcast::<Jump>() {
                Ok(jump) => {
                    trace!(context = jump.target, ?cont, "unwind_protect intercepted jump");
                    self.store_unwind_cont(cont, Some(*jump));
                    clean(self, true);
                    self.continue_unwind(cont)
                }
                Err(payload) => resume_unwind(payload),
            },
        }
    }

    /// Resume the jump stored in `cont`.
    ///
    /// A jump whose target context has meanwhile been left is redirected to
    /// the innermost top-level context.
    pub fn continue_unwind(&self, cont: Sexp) -> ! {
        let Some(jump) = self.store_unwind_cont(cont, None) else {
            self.stop("no pending jump in unwind continuation")
        };

        if jump.target == BOTTOM || self.context_is_live(jump.target) {
            self.jump(jump)
        }

        let message = self.describe_jump(&jump);
        debug!(stale = jump.target, message, "jump target left; aborting instead");
        self.abort(Some(message))
    }
}
