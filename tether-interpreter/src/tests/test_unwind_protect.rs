use std::cell::{Cell, RefCell};
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};

use pretty_assertions::assert_eq;

use crate::tests::test_utils::{eval_ok, init_test_logging};
use crate::{Interpreter, InterpreterError, JumpKind, Sexp, Shield, format_value};

#[test]
fn test_clean_runs_without_jump() {
    init_test_logging();
    let interp = Interpreter::default();
    let cont = interp.make_unwind_cont();
    let _cont = Shield::new(&interp, cont);

    let cleaned = Cell::new(None);
    let value = interp.unwind_protect(
        |interp| interp.mk_double(3.0),
        |_, jumped| cleaned.set(Some(jumped)),
        cont,
    );

    assert_eq!(format_value(&interp, value), "[1] 3");
    assert_eq!(cleaned.get(), Some(false));
    assert_eq!(interp.unwind_cont_jump(cont), None);
    assert_eq!(interp.context_depth(), 0);
}

#[test]
fn test_clean_sees_jump_and_unwind_continues() {
    let interp = Interpreter::default();
    let cont = interp.make_unwind_cont();
    let _cont = Shield::new(&interp, cont);
    let handler = eval_ok(&interp, "function(e) conditionMessage(e)");

    let cleaned = Cell::new(None);
    let stored_during_clean = Cell::new(false);
    let result = interp.toplevel_exec(|interp| {
        interp.try_catch_handlers(vec![("error".to_string(), handler)], |interp| {
            interp.unwind_protect(
                |interp| -> Sexp { interp.stop("inner failure") },
                |interp, jumped| {
                    cleaned.set(Some(jumped));
                    stored_during_clean.set(interp.unwind_cont_jump(cont).is_some());
                },
                cont,
            )
        })
    });

    let value = result.expect("handler returns a value");
    assert_eq!(format_value(&interp, value), "[1] \"inner failure\"");
    assert_eq!(cleaned.get(), Some(true));
    assert!(stored_during_clean.get());
    // Resuming the jump consumes it
    assert_eq!(interp.unwind_cont_jump(cont), None);
}

#[test]
fn test_nested_cleanups_run_innermost_first() {
    let interp = Interpreter::default();
    let outer_cont = interp.make_unwind_cont();
    let inner_cont = interp.make_unwind_cont();
    let _outer = Shield::new(&interp, outer_cont);
    let _inner = Shield::new(&interp, inner_cont);

    let order = RefCell::new(Vec::new());
    let result = interp.toplevel_exec(|interp| {
        interp.unwind_protect(
            |interp| {
                interp.unwind_protect(
                    |interp| -> Sexp { interp.abort(Some("stop everything".to_string())) },
                    |_, jumped| order.borrow_mut().push(("inner", jumped)),
                    inner_cont,
                )
            },
            |_, jumped| order.borrow_mut().push(("outer", jumped)),
            outer_cont,
        )
    });

    assert_eq!(
        result,
        Err(InterpreterError::Aborted {
            message: "stop everything".to_string()
        })
    );
    assert_eq!(*order.borrow(), vec![("inner", true), ("outer", true)]);
}

#[test]
fn test_stale_jump_target_becomes_abort() {
    let interp = Interpreter::default();
    let cont = interp.make_unwind_cont();
    let _cont = Shield::new(&interp, cont);
    let handler = eval_ok(&interp, "function(e) 'handled'");

    // The cleanup escapes with a host payload, leaving the jump in `cont`
    // after its try-catch target has been torn down.
    let escaped = catch_unwind(AssertUnwindSafe(|| {
        interp.toplevel_exec(|interp| {
            interp.try_catch_handlers(vec![("error".to_string(), handler)], |interp| {
                interp.unwind_protect(
                    |interp| -> Sexp { interp.stop("lost handler") },
                    |_, jumped| {
                        if jumped {
                            resume_unwind(Box::new("host escape"));
                        }
                    },
                    cont,
                )
            })
        })
    }));

    let payload = escaped.expect_err("host payload escapes");
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"host escape"));
    assert_eq!(interp.context_depth(), 0);

    let pending = interp.unwind_cont_jump(cont).expect("jump stored");
    assert!(matches!(pending.kind(), JumpKind::Condition { .. }));

    let result = interp.toplevel_exec(|interp| interp.continue_unwind(cont));
    assert_eq!(
        result,
        Err(InterpreterError::Aborted {
            message: "condition: lost handler".to_string()
        })
    );
}

#[test]
fn test_continue_unwind_without_pending_jump() {
    let interp = Interpreter::default();
    let cont = interp.make_unwind_cont();
    let _cont = Shield::new(&interp, cont);

    let result = interp.toplevel_exec(|interp| interp.continue_unwind(cont));
    assert_eq!(
        result,
        Err(InterpreterError::Aborted {
            message: "Error: no pending jump in unwind continuation".to_string()
        })
    );
}

#[test]
fn test_pending_jump_keeps_its_condition_alive() {
    let interp = Interpreter::default();
    let cont = interp.make_unwind_cont();
    let _cont = Shield::new(&interp, cont);
    let handler = eval_ok(&interp, "function(e) NULL");
    interp.preserve_object(handler);

    let _ = catch_unwind(AssertUnwindSafe(|| {
        interp.toplevel_exec(|interp| {
            interp.try_catch_handlers(vec![("error".to_string(), handler)], |interp| {
                interp.unwind_protect(
                    |interp| -> Sexp { interp.stop("kept alive") },
                    |_, _| resume_unwind(Box::new(())),
                    cont,
                )
            })
        })
    }));

    interp.collect();
    let pending = interp.unwind_cont_jump(cont).expect("jump stored");
    match pending.kind() {
        JumpKind::Condition { condition, .. } => {
            assert!(interp.is_live(*condition));
            assert_eq!(interp.condition_message(*condition).as_deref(), Some("kept alive"));
        }
        other => panic!("unexpected jump {:?}", other),
    }
}
