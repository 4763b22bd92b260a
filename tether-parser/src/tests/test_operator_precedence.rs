// Operator precedence and associativity

use crate::*;

fn binary(expr: &Expression) -> &BinaryOperation {
    match &expr.kind {
        ExpressionKind::BinaryOp(op) => op,
        other => panic!("Expected binary operation, got {:?}", other),
    }
}

fn unary(expr: &Expression) -> &UnaryOperation {
    match &expr.kind {
        ExpressionKind::UnaryOp(op) => op,
        other => panic!("Expected unary operation, got {:?}", other),
    }
}

#[test]
fn test_assignment_is_right_associative() {
    let expr = parse_expression("x <- y <- 1").unwrap();
    let outer = binary(&expr);

    assert_eq!(outer.operator, BinaryOperator::Assign);
    assert_eq!(outer.left.kind, ExpressionKind::Identifier("x".to_string()));
    assert_eq!(binary(&outer.right).operator, BinaryOperator::Assign);
}

#[test]
fn test_exponent_is_right_associative() {
    let expr = parse_expression("2 ^ 3 ^ 2").unwrap();
    let outer = binary(&expr);

    assert_eq!(outer.operator, BinaryOperator::Exponent);
    assert_eq!(outer.left.kind, ExpressionKind::Number(2.0));
    assert_eq!(binary(&outer.right).operator, BinaryOperator::Exponent);
}

#[test]
fn test_unary_minus_binds_looser_than_exponent() {
    let expr = parse_expression("-2 ^ 2").unwrap();
    let negation = unary(&expr);

    assert_eq!(negation.operator, UnaryOperator::Minus);
    assert_eq!(binary(&negation.operand).operator, BinaryOperator::Exponent);
}

#[test]
fn test_not_binds_looser_than_comparison() {
    let expr = parse_expression("!a == b").unwrap();
    let not = unary(&expr);

    assert_eq!(not.operator, UnaryOperator::Not);
    assert_eq!(binary(&not.operand).operator, BinaryOperator::Equal);
}

#[test]
fn test_and_binds_tighter_than_or() {
    let expr = parse_expression("a || b && c").unwrap();
    let or = binary(&expr);

    assert_eq!(or.operator, BinaryOperator::LogicalOr);
    assert_eq!(binary(&or.right).operator, BinaryOperator::LogicalAnd);
}

#[test]
fn test_comparison_below_arithmetic() {
    let expr = parse_expression("a + 1 >= b * 2").unwrap();
    let cmp = binary(&expr);

    assert_eq!(cmp.operator, BinaryOperator::GreaterEqual);
    assert_eq!(binary(&cmp.left).operator, BinaryOperator::Add);
    assert_eq!(binary(&cmp.right).operator, BinaryOperator::Multiply);
}

#[test]
fn test_subtraction_is_left_associative() {
    let expr = parse_expression("10 - 4 - 3").unwrap();
    let outer = binary(&expr);

    assert_eq!(outer.operator, BinaryOperator::Subtract);
    assert_eq!(binary(&outer.left).operator, BinaryOperator::Subtract);
    assert_eq!(outer.right.kind, ExpressionKind::Number(3.0));
}

#[test]
fn test_operator_continues_after_newline() {
    let expr = parse_expression("1 +\n  2").unwrap();
    assert_eq!(binary(&expr).operator, BinaryOperator::Add);
}
