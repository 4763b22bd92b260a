use pretty_assertions::assert_eq;
use tether_parser::{parse_expression, ExpressionKind};

fn literal(input: &str) -> ExpressionKind {
    parse_expression(input)
        .unwrap_or_else(|e| panic!("Failed to parse {:?}: {:?}", input, e))
        .kind
}

#[test]
fn test_numbers() {
    assert_eq!(literal("42"), ExpressionKind::Number(42.0));
    assert_eq!(literal("2.5"), ExpressionKind::Number(2.5));
    assert_eq!(literal(".5"), ExpressionKind::Number(0.5));
    assert_eq!(literal("1e-3"), ExpressionKind::Number(0.001));
}

#[test]
fn test_integers() {
    assert_eq!(literal("10L"), ExpressionKind::Integer(10));
    assert_eq!(literal("0L"), ExpressionKind::Integer(0));
}

#[test]
fn test_strings_and_escapes() {
    assert_eq!(literal(r#""hello""#), ExpressionKind::String("hello".to_string()));
    assert_eq!(literal("'single'"), ExpressionKind::String("single".to_string()));
    assert_eq!(
        literal(r#""tab\there\n""#),
        ExpressionKind::String("tab\there\n".to_string())
    );
    assert_eq!(literal(r#"'it\'s'"#), ExpressionKind::String("it's".to_string()));
    assert_eq!(literal(r#""""#), ExpressionKind::String(String::new()));
}

#[test]
fn test_constants() {
    assert_eq!(literal("TRUE"), ExpressionKind::Boolean(true));
    assert_eq!(literal("FALSE"), ExpressionKind::Boolean(false));
    assert_eq!(literal("NULL"), ExpressionKind::Null);
}

#[test]
fn test_identifiers() {
    assert_eq!(literal("x"), ExpressionKind::Identifier("x".to_string()));
    assert_eq!(
        literal("conditionMessage"),
        ExpressionKind::Identifier("conditionMessage".to_string())
    );
    assert_eq!(literal("is.null"), ExpressionKind::Identifier("is.null".to_string()));
    assert_eq!(literal(".hidden"), ExpressionKind::Identifier(".hidden".to_string()));
    assert_eq!(literal("TRUEish"), ExpressionKind::Identifier("TRUEish".to_string()));
    assert_eq!(literal("`{`"), ExpressionKind::Identifier("{".to_string()));
}
