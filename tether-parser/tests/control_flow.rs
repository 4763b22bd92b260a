use tether_parser::{parse_expression, parse_program, Expression, ExpressionKind};

fn parse(input: &str) -> Expression {
    parse_expression(input).unwrap_or_else(|e| panic!("Failed to parse {:?}: {:?}", input, e))
}

#[test]
fn test_if_else() {
    let expr = parse("if (x > 1) 'big' else 'small'");

    match expr.kind {
        ExpressionKind::If(if_expr) => {
            assert!(matches!(if_expr.condition.kind, ExpressionKind::BinaryOp(_)));
            assert_eq!(
                if_expr.then_branch.kind,
                ExpressionKind::String("big".to_string())
            );
            let else_branch = if_expr.else_branch.expect("Expected else branch");
            assert_eq!(else_branch.kind, ExpressionKind::String("small".to_string()));
        }
        other => panic!("Expected if expression, got {:?}", other),
    }
}

#[test]
fn test_if_without_else() {
    match parse("if (TRUE) 1").kind {
        ExpressionKind::If(if_expr) => assert!(if_expr.else_branch.is_none()),
        other => panic!("Expected if expression, got {:?}", other),
    }
}

#[test]
fn test_while_loop() {
    match parse("while (i < 10) i <- i + 1").kind {
        ExpressionKind::While(while_loop) => {
            assert!(matches!(while_loop.body.kind, ExpressionKind::BinaryOp(_)));
        }
        other => panic!("Expected while loop, got {:?}", other),
    }
}

#[test]
fn test_block_with_mixed_separators() {
    let input = "{\n  x <- 1; y <- 2\n  # comment\n  x + y\n}";

    match parse(input).kind {
        ExpressionKind::Block(block) => assert_eq!(block.expressions.len(), 3),
        other => panic!("Expected block, got {:?}", other),
    }
}

#[test]
fn test_empty_block() {
    match parse("{}").kind {
        ExpressionKind::Block(block) => assert!(block.expressions.is_empty()),
        other => panic!("Expected block, got {:?}", other),
    }
}

#[test]
fn test_function_definition_with_defaults() {
    match parse("function(cnd, n = 1) structure(list(cnd), class = 'x')").kind {
        ExpressionKind::Function(def) => {
            assert_eq!(def.parameters.len(), 2);
            assert_eq!(def.parameters[0].name, "cnd");
            assert!(def.parameters[0].default.is_none());
            assert_eq!(def.parameters[1].name, "n");
            assert!(def.parameters[1].default.is_some());
            assert!(matches!(def.body.kind, ExpressionKind::Call(_)));
        }
        other => panic!("Expected function definition, got {:?}", other),
    }
}

#[test]
fn test_program_spanning_lines() {
    let program = parse_program("f <- function(x) {\n  x * 2\n}\nf(21)\n").unwrap();
    assert_eq!(program.expressions.len(), 2);
}
