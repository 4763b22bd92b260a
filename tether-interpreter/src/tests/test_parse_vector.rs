use pretty_assertions::assert_eq;

use crate::{Interpreter, ParseStatus, Sexp, deparse, evaluate_from_string};

#[test]
fn test_parse_ok() {
    let interp = Interpreter::default();

    let (status, exprs) = interp.parse_vector("a <- 1; a + 1");
    assert_eq!(status, ParseStatus::Ok);
    assert_eq!(interp.type_name(exprs), "expression");
    assert_eq!(interp.length(exprs), 2);
    assert_eq!(interp.last_parse_error(), None);
}

#[test]
fn test_parse_incomplete() {
    let interp = Interpreter::default();

    let (status, exprs) = interp.parse_vector("f(1,");
    assert_eq!(status, ParseStatus::Incomplete);
    assert_eq!(exprs, Sexp::NULL);
    assert!(interp.last_parse_error().is_some_and(|e| e.is_incomplete()));
}

#[test]
fn test_parse_error() {
    let interp = Interpreter::default();

    let (status, exprs) = interp.parse_vector("1 )");
    assert_eq!(status, ParseStatus::Error);
    assert_eq!(exprs, Sexp::NULL);
    assert!(interp.last_parse_error().is_some_and(|e| !e.is_incomplete()));

    // A later successful parse clears the diagnostic
    interp.parse_vector("1");
    assert_eq!(interp.last_parse_error(), None);
}

#[test]
fn test_parse_failure_surfaces_from_evaluate() {
    let interp = Interpreter::default();

    let result = evaluate_from_string(&interp, "1 +");
    assert!(matches!(result, Err(crate::InterpreterError::Parse(_))));
}

#[test]
fn test_language_objects_deparse() {
    let interp = Interpreter::default();

    let cases = [
        ("f(x, n = 1)", "f(x, n = 1)"),
        ("a + b * c", "a + b * c"),
        ("-x ^ 2", "-x^2"),
        ("function(x, y = 2) x + y", "function(x, y = 2) x + y"),
        ("if (a) b else c", "if (a) b else c"),
        ("while (i < 3) { i <- i + 1 }", "while (i < 3) { i <- i + 1 }"),
        ("(a)", "(a)"),
        ("'text'", "\"text\""),
        ("10L", "10L"),
        ("NULL", "NULL"),
    ];

    for (source, expected) in cases {
        let (status, exprs) = interp.parse_vector(source);
        assert_eq!(status, ParseStatus::Ok, "parse of {}", source);
        let expr = interp.vector_elt(exprs, 0);
        assert_eq!(deparse(&interp, expr), expected, "deparse of {}", source);
    }
}

#[test]
fn test_operators_become_calls() {
    let interp = Interpreter::default();

    let (_, exprs) = interp.parse_vector("1 + 2");
    let call = interp.vector_elt(exprs, 0);
    assert_eq!(interp.type_name(call), "language");
    assert_eq!(interp.length(call), 3);
}
