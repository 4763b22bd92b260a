use std::panic::{AssertUnwindSafe, catch_unwind};

use pretty_assertions::assert_eq;
use tether_interpreter::{Interpreter, Sexp};

use crate::tests::test_utils::{display, init_test_logging};
use crate::{BridgeError, evaluate_source, resume_jump, toplevel, unwind_protect};

#[test]
fn test_normal_return_passes_value_through() {
    init_test_logging();
    let interp = Interpreter::default();

    let value = unwind_protect(&interp, |interp| interp.mk_double(1.5)).expect("no jump");
    assert_eq!(display(&interp, value), "[1] 1.5");

    let count = unwind_protect(&interp, |_| 42_usize).expect("no jump");
    assert_eq!(count, 42);
}

#[test]
fn test_jump_becomes_longjump() {
    let interp = Interpreter::default();

    let result = unwind_protect(&interp, |interp| -> Sexp {
        interp.abort(Some("stop here".to_string()))
    });
    match result {
        Err(BridgeError::Longjump(token)) => assert_eq!(token.describe(), "stop here"),
        other => panic!("expected a longjump, got {:?}", other),
    }
    assert_eq!(interp.context_depth(), 0);
}

#[test]
fn test_unhandled_error_becomes_longjump() {
    let interp = Interpreter::default();

    let result = toplevel(&interp, |interp| {
        unwind_protect(interp, |interp| -> Sexp { interp.stop("unhandled") })
    });
    match result {
        Err(BridgeError::Aborted { message }) => assert_eq!(message, "Error: unhandled"),
        other => panic!("expected an abort, got {:?}", other),
    }
}

#[test]
fn test_inner_jump_is_handled_by_inner_guard() {
    let interp = Interpreter::default();

    let outer = unwind_protect(&interp, |interp| {
        let inner = unwind_protect(interp, |interp| -> Sexp { interp.abort(None) });
        assert!(matches!(inner, Err(BridgeError::Longjump(_))));
        interp.mk_string("outer finished")
    });

    let value = outer.expect("outer guard is not disturbed");
    assert_eq!(display(&interp, value), "[1] \"outer finished\"");

    // Targets are fully disarmed afterwards
    let again = unwind_protect(&interp, |interp| -> Sexp { interp.abort(None) });
    assert!(matches!(again, Err(BridgeError::Longjump(_))));
}

#[test]
fn test_deeply_nested_guards() {
    let interp = Interpreter::default();

    fn nest(interp: &Interpreter, depth: usize) -> crate::Result<Sexp> {
        if depth == 0 {
            return unwind_protect(interp, |interp| -> Sexp { interp.abort(None) });
        }
        unwind_protect(interp, |interp| match nest(interp, depth - 1) {
            Err(BridgeError::Longjump(_)) => interp.mk_integer(depth as i64),
            other => panic!("unexpected inner result {:?}", other),
        })
    }

    let value = nest(&interp, 5).expect("outermost guard returns");
    assert_eq!(display(&interp, value), "[1] 5");
}

#[test]
fn test_leaked_protections_are_dropped() {
    let interp = Interpreter::default();
    let height = interp.protect_height();

    let result = unwind_protect(&interp, |interp| -> Sexp {
        interp.protect(interp.mk_string("a"));
        interp.protect(interp.mk_string("b"));
        interp.abort(None)
    });

    assert!(result.is_err());
    drop(result);
    assert_eq!(interp.protect_height(), height);
}

#[test]
fn test_token_is_preserved_until_dropped() {
    let interp = Interpreter::default();

    let result = unwind_protect(&interp, |interp| -> Sexp { interp.abort(None) });
    let Err(BridgeError::Longjump(token)) = result else {
        panic!("expected a longjump");
    };

    let cont = token.cont();
    interp.collect();
    assert!(interp.is_live(cont));
    assert!(interp.is_preserved(cont));
    assert!(interp.unwind_cont_jump(cont).is_some());

    drop(token);
    assert!(!interp.is_preserved(cont));
    interp.collect();
    assert!(!interp.is_live(cont));
}

#[test]
fn test_resume_jump_reaches_interpreter_handler() {
    let interp = Interpreter::default();

    interp.define_native("guarded_stop", |interp, _| {
        match unwind_protect(interp, |interp| -> Sexp { interp.stop("from host") }) {
            Err(BridgeError::Longjump(token)) => resume_jump(interp, token),
            Ok(value) => value,
            Err(other) => interp.stop(other.to_string()),
        }
    });

    let value = evaluate_source(
        &interp,
        "tryCatch(guarded_stop(), error = function(e) paste('handled', conditionMessage(e)))",
        interp.global_env(),
    )
    .expect("evaluate");
    assert_eq!(display(&interp, value), "[1] \"handled from host\"");

    match evaluate_source(&interp, "guarded_stop()", interp.global_env()) {
        Err(BridgeError::Eval { message }) => assert_eq!(message, "from host"),
        other => panic!("expected an evaluation error, got {:?}", other),
    }
}

#[test]
fn test_resumed_jump_runs_interpreter_finally() {
    let interp = Interpreter::default();

    interp.define_native("guarded_abort", |interp, _| {
        match unwind_protect(interp, |interp| -> Sexp { interp.abort(None) }) {
            Err(BridgeError::Longjump(token)) => resume_jump(interp, token),
            Ok(value) => value,
            Err(other) => interp.stop(other.to_string()),
        }
    });

    evaluate_source(&interp, "cleaned <- FALSE", interp.global_env()).expect("evaluate");
    let result = toplevel(&interp, |interp| {
        evaluate_source(
            interp,
            "tryCatch(guarded_abort(), finally = cleaned <- TRUE)",
            interp.global_env(),
        )
    });
    assert!(matches!(result, Err(BridgeError::Aborted { .. })), "{:?}", result);

    let cleaned = evaluate_source(&interp, "cleaned", interp.global_env()).expect("evaluate");
    assert_eq!(display(&interp, cleaned), "[1] TRUE");
}

#[test]
fn test_host_panics_pass_through() {
    let interp = Interpreter::default();

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        unwind_protect(&interp, |_| -> Sexp { panic!("host bug") })
    }));

    let payload = outcome.expect_err("panic propagates");
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"host bug"));
    assert_eq!(interp.context_depth(), 0);

    // Guards still work afterwards
    assert!(unwind_protect(&interp, |interp| interp.mk_integer(1)).is_ok());
}

#[test]
fn test_longjump_display() {
    let interp = Interpreter::default();

    let error = unwind_protect(&interp, |interp| -> Sexp {
        interp.abort(Some("gone".to_string()))
    })
    .expect_err("jump");
    assert_eq!(error.to_string(), "Non-local exit from interpreter: gone");
}
