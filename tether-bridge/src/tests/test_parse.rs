use pretty_assertions::assert_eq;
use tether_interpreter::{Interpreter, deparse, identical};

use crate::tests::test_utils::display;
use crate::{BridgeError, evaluate, parse, parse_eval, toplevel};

#[test]
fn test_parse_single_expression() {
    let interp = Interpreter::default();

    let expr = parse(&interp, "f(x, n = 1) + 2").expect("parse");
    assert_eq!(interp.type_name(expr), "language");
    assert_eq!(deparse(&interp, expr), "f(x, n = 1) + 2");
}

#[test]
fn test_parse_rejects_malformed_input() {
    let interp = Interpreter::default();

    for text in ["", "1; 2", "1 +", "1 )", "f(,"] {
        let result = parse(&interp, text);
        assert!(
            matches!(result, Err(BridgeError::Internal { .. })),
            "{:?}: {:?}",
            text,
            result
        );
    }
}

#[test]
fn test_parse_error_mentions_source() {
    let interp = Interpreter::default();

    let error = parse(&interp, "1; 2").expect_err("two expressions");
    assert_eq!(
        error.to_string(),
        "Internal bridge error: expected a single expression in \"1; 2\", found 2"
    );
}

#[test]
fn test_parse_eval() {
    let interp = Interpreter::default();

    let value = parse_eval(&interp, "1 + 1", interp.global_env()).expect("parse_eval");
    assert_eq!(display(&interp, value), "[1] 2");

    let scope = interp.new_env(interp.global_env());
    let _scope = tether_interpreter::Shield::new(&interp, scope);
    parse_eval(&interp, "x <- 5", scope).expect("parse_eval");
    assert!(interp.find_var_in_frame("x", scope).is_some());
    assert!(interp.find_var_in_frame("x", interp.global_env()).is_none());
}

#[test]
fn test_parse_eval_matches_evaluate_of_parse() {
    let interp = Interpreter::default();

    for text in [
        "1 + 1",
        "paste0('a', 'b')",
        "list(1, list(2))",
        "function(x) x",
        "quote(f(y))",
    ] {
        let direct = parse_eval(&interp, text, interp.global_env()).expect("parse_eval");
        let expr = parse(&interp, text).expect("parse");
        let translated = evaluate(&interp, expr, interp.global_env()).expect("evaluate");
        assert!(identical(&interp, direct, translated), "{}", text);
    }
}

#[test]
fn test_parse_eval_does_not_translate_errors() {
    let interp = Interpreter::default();

    let result = parse_eval(&interp, "stop('raw')", interp.global_env());
    assert!(matches!(result, Err(BridgeError::Longjump(_))), "{:?}", result);

    let resolved = toplevel(&interp, |interp| {
        parse_eval(interp, "stop('raw')", interp.global_env())
    });
    match resolved {
        Err(BridgeError::Aborted { message }) => assert_eq!(message, "Error: raw"),
        other => panic!("expected an abort, got {:?}", other),
    }
}
