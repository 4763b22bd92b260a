use pretty_assertions::assert_eq;

use crate::Interpreter;
use crate::format_double;
use crate::tests::test_utils::eval_display;

#[test]
fn test_format_double() {
    assert_eq!(format_double(2.0), "2");
    assert_eq!(format_double(2.5), "2.5");
    assert_eq!(format_double(-0.5), "-0.5");
    assert_eq!(format_double(0.1 + 0.2), "0.3");
    assert_eq!(format_double(1.0 / 3.0), "0.3333333");
    assert_eq!(format_double(1e20), "1e20");
    assert_eq!(format_double(f64::INFINITY), "Inf");
    assert_eq!(format_double(f64::NEG_INFINITY), "-Inf");
    assert_eq!(format_double(f64::NAN), "NaN");
}

#[test]
fn test_format_vectors() {
    let interp = Interpreter::default();

    assert_eq!(eval_display(&interp, "NULL"), "NULL");
    assert_eq!(eval_display(&interp, "c(1.5, 2)"), "[1] 1.5 2");
    assert_eq!(eval_display(&interp, "'quote \" inside'"), "[1] \"quote \\\" inside\"");
    assert_eq!(eval_display(&interp, "c(TRUE, FALSE) == TRUE"), "[1] TRUE FALSE");
}

#[test]
fn test_format_lists() {
    let interp = Interpreter::default();

    assert_eq!(eval_display(&interp, "list()"), "list()");
    assert_eq!(
        eval_display(&interp, "list(1, 'a')"),
        "[[1]]\n[1] 1\n\n[[2]]\n[1] \"a\""
    );
    assert_eq!(
        eval_display(&interp, "list(a = 1, b = 'x')"),
        "$a\n[1] 1\n\n$b\n[1] \"x\""
    );
    assert_eq!(
        eval_display(&interp, "list(outer = list(1))"),
        "$outer\n$outer[[1]]\n[1] 1"
    );
}

#[test]
fn test_format_class_attribute() {
    let interp = Interpreter::default();

    assert_eq!(
        eval_display(&interp, "structure(list(1), class = 'thing')"),
        "[[1]]\n[1] 1\n\nattr(,\"class\")\n[1] \"thing\""
    );
}

#[test]
fn test_format_functions() {
    let interp = Interpreter::default();

    assert_eq!(
        eval_display(&interp, "function(x, y = 1) x + y"),
        "function(x, y = 1) x + y"
    );
    assert_eq!(eval_display(&interp, "quote(f(1))"), "f(1)");
    assert_eq!(
        eval_display(&interp, "paste"),
        "function (...) .Primitive(\"paste\")"
    );
}
