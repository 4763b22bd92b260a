use tether_parser::{parse_expression, Call, ExpressionKind};

fn call(input: &str) -> Call {
    match parse_expression(input)
        .unwrap_or_else(|e| panic!("Failed to parse {:?}: {:?}", input, e))
        .kind
    {
        ExpressionKind::Call(call) => call,
        other => panic!("Expected call, got {:?}", other),
    }
}

#[test]
fn test_call_without_arguments() {
    let call = call("globalenv()");

    assert_eq!(
        call.function.kind,
        ExpressionKind::Identifier("globalenv".to_string())
    );
    assert!(call.arguments.is_empty());
}

#[test]
fn test_named_and_positional_arguments() {
    let call = call("tryCatch(eval(expr, env), error = handler, interrupt = handler)");

    assert_eq!(call.arguments.len(), 3);
    assert!(call.arguments[0].name.is_none());
    assert_eq!(call.arguments[1].name.as_deref(), Some("error"));
    assert_eq!(call.arguments[2].name.as_deref(), Some("interrupt"));
}

#[test]
fn test_string_argument_name() {
    let call = call(r#"list("a b" = 1)"#);
    assert_eq!(call.arguments[0].name.as_deref(), Some("a b"));
}

#[test]
fn test_equality_is_not_a_named_argument() {
    let call = call("f(x == 1)");

    assert!(call.arguments[0].name.is_none());
    assert!(matches!(
        call.arguments[0].value.kind,
        ExpressionKind::BinaryOp(_)
    ));
}

#[test]
fn test_chained_calls() {
    let outer = call("make()(1)");

    assert_eq!(outer.arguments.len(), 1);
    assert!(matches!(outer.function.kind, ExpressionKind::Call(_)));
}

#[test]
fn test_arguments_across_lines() {
    let call = call("paste(\n  'a',\n  'b'\n)");
    assert_eq!(call.arguments.len(), 2);
}
