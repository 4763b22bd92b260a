use pretty_assertions::assert_eq;

use crate::tests::test_utils::{eval_display, eval_ok};
use crate::{Interpreter, InterpreterError, Sexp, Shelter, Shield, format_value};

#[test]
fn test_collect_frees_unreachable_objects() {
    let interp = Interpreter::default();

    let kept = interp.mk_string("kept");
    let _kept = Shield::new(&interp, kept);
    let dropped = interp.mk_string("dropped");

    let freed = interp.collect();
    assert!(freed >= 1);
    assert!(interp.is_live(kept));
    assert!(!interp.is_live(dropped));
    assert_eq!(interp.stats().collections, 1);
}

#[test]
fn test_globals_are_roots() {
    let interp = Interpreter::default();

    eval_ok(&interp, "numbers <- c(1, 2, 3)");
    interp.collect();
    assert_eq!(eval_display(&interp, "numbers"), "[1] 1 2 3");
}

#[test]
fn test_children_of_protected_values_survive() {
    let interp = Interpreter::default();

    let element = interp.mk_double(1.5);
    let list = interp.mk_list(vec![element]);
    let _list = Shield::new(&interp, list);

    interp.collect();
    assert!(interp.is_live(element));
    assert_eq!(interp.vector_elt(list, 0), element);
}

#[test]
fn test_shield_releases_on_drop() {
    let interp = Interpreter::default();

    let value = interp.mk_string("temporary");
    let height = interp.protect_height();
    {
        let shield = Shield::new(&interp, value);
        assert_eq!(shield.get(), value);
        assert_eq!(interp.protect_height(), height + 1);
    }
    assert_eq!(interp.protect_height(), height);

    interp.collect();
    assert!(!interp.is_live(value));
}

#[test]
fn test_shelter_releases_everything() {
    let interp = Interpreter::default();

    let height = interp.protect_height();
    {
        let mut shelter = Shelter::new(&interp);
        assert!(shelter.is_empty());
        let a = shelter.protect(interp.mk_integer(1));
        let b = shelter.protect(interp.mk_integer(2));
        assert_eq!(shelter.len(), 2);

        interp.collect();
        assert!(interp.is_live(a));
        assert!(interp.is_live(b));
    }
    assert_eq!(interp.protect_height(), height);
}

#[test]
fn test_unprotect_ptr_tolerates_missing_entries() {
    let interp = Interpreter::default();

    let height = interp.protect_height();
    let a = interp.protect(interp.mk_integer(1));
    let b = interp.protect(interp.mk_integer(2));
    interp.unprotect_ptr(a);
    assert_eq!(interp.protect_height(), height + 1);

    // Already gone: nothing happens
    interp.unprotect_ptr(a);
    assert_eq!(interp.protect_height(), height + 1);

    interp.unprotect_ptr(b);
    assert_eq!(interp.protect_height(), height);
}

#[test]
fn test_preserve_and_release() {
    let interp = Interpreter::default();

    let value = interp.mk_string("preserved");
    interp.preserve_object(value);
    interp.preserve_object(value);
    assert!(interp.is_preserved(value));

    interp.collect();
    assert!(interp.is_live(value));

    // Preservation is counted
    interp.release_object(value);
    interp.collect();
    assert!(interp.is_live(value));

    interp.release_object(value);
    assert!(!interp.is_preserved(value));
    interp.collect();
    assert!(!interp.is_live(value));
}

#[test]
fn test_stale_handle_signals_error() {
    let interp = Interpreter::default();

    let dropped = interp.mk_string("dropped");
    interp.collect();

    let result = interp.toplevel_exec(|interp| {
        interp.length(dropped);
        Sexp::NULL
    });
    match result {
        Err(InterpreterError::Aborted { message }) => {
            assert!(message.contains("has been collected"), "{}", message)
        }
        other => panic!("expected an abort, got {:?}", other),
    }

    // The slot is reused under a new generation
    let reused = interp.mk_string("new value");
    assert_ne!(reused, dropped);
    assert!(!interp.is_live(dropped));
}

#[test]
fn test_collect_is_skipped_during_evaluation() {
    let interp = Interpreter::default();

    let unprotected = interp.mk_string("unprotected");
    let result = interp.toplevel_exec(|interp| {
        let freed = interp.collect();
        interp.mk_integer(freed as i64)
    });

    let freed = result.expect("evaluation succeeds");
    assert_eq!(format_value(&interp, freed), "[1] 0");
    assert!(interp.is_live(unprotected));
}

#[test]
fn test_stats() {
    let interp = Interpreter::default();

    let before = interp.stats();
    let _value = Shield::new(&interp, interp.mk_string("x"));
    interp.preserve_object(Sexp::NULL);

    let after = interp.stats();
    assert_eq!(after.live_objects, before.live_objects + 1);
    assert_eq!(after.protect_height, before.protect_height + 1);
    assert_eq!(after.preserved_objects, before.preserved_objects + 1);
    assert_eq!(after.context_depth, 0);
}
