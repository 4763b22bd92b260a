// S-expression formatter for the Tether AST
// Prints parsed programs as Lisp-like trees for `tether parse`

use tether_parser::*;

pub fn format_program_as_sexpr(program: &Program) -> String {
    format_program_with_indent(program, 0)
}

fn format_program_with_indent(program: &Program, indent: usize) -> String {
    let items: Vec<String> = program
        .expressions
        .iter()
        .map(|expr| format_expression_with_indent(expr, indent + 2))
        .collect();

    if items.is_empty() {
        "(program)".to_string()
    } else if items.len() == 1 {
        format!("(program {})", items[0])
    } else {
        format!(
            "(program\n{}{}\n{})",
            " ".repeat(indent + 2),
            items.join(&format!("\n{}", " ".repeat(indent + 2))),
            " ".repeat(indent)
        )
    }
}

fn format_expression_with_indent(expr: &Expression, indent: usize) -> String {
    match &expr.kind {
        ExpressionKind::Null => "(null)".to_string(),
        ExpressionKind::Boolean(value) => format!("(boolean {})", value),
        ExpressionKind::Number(value) => format!("(number {})", value),
        ExpressionKind::Integer(value) => format!("(integer {})", value),
        ExpressionKind::String(value) => format!("\"{}\"", value.escape_default()),
        ExpressionKind::Identifier(name) => name.clone(),
        ExpressionKind::Call(call) => format_call_with_indent(call, indent),
        ExpressionKind::BinaryOp(op) => format_nested(
            op.operator.symbol(),
            &[
                format_expression_with_indent(&op.left, indent + 2),
                format_expression_with_indent(&op.right, indent + 2),
            ],
            indent,
        ),
        ExpressionKind::UnaryOp(op) => format_nested(
            op.operator.symbol(),
            &[format_expression_with_indent(&op.operand, indent + 2)],
            indent,
        ),
        ExpressionKind::Function(def) => format_function_with_indent(def, indent),
        ExpressionKind::If(if_expr) => {
            let mut parts = vec![
                format_expression_with_indent(&if_expr.condition, indent + 2),
                format_expression_with_indent(&if_expr.then_branch, indent + 2),
            ];
            if let Some(else_branch) = &if_expr.else_branch {
                parts.push(format_expression_with_indent(else_branch, indent + 2));
            }
            format_nested("if", &parts, indent)
        }
        ExpressionKind::While(while_loop) => format_nested(
            "while",
            &[
                format_expression_with_indent(&while_loop.condition, indent + 2),
                format_expression_with_indent(&while_loop.body, indent + 2),
            ],
            indent,
        ),
        ExpressionKind::Block(block) => {
            let parts: Vec<String> = block
                .expressions
                .iter()
                .map(|expr| format_expression_with_indent(expr, indent + 2))
                .collect();
            format_nested("block", &parts, indent)
        }
        ExpressionKind::Parenthesized(inner) => format_expression_with_indent(inner, indent),
    }
}

fn format_call_with_indent(call: &Call, indent: usize) -> String {
    let function = format_expression_with_indent(&call.function, indent + 2);
    let mut parts = vec![function];
    parts.extend(call.arguments.iter().map(|arg| {
        let value = format_expression_with_indent(&arg.value, indent + 2);
        match &arg.name {
            Some(name) => format!(":{} {}", name, value),
            None => value,
        }
    }));
    format_nested("call", &parts, indent)
}

fn format_function_with_indent(def: &FunctionDefinition, indent: usize) -> String {
    let params: Vec<String> = def
        .parameters
        .iter()
        .map(|param| match &param.default {
            Some(default) => format!(
                "({} {})",
                param.name,
                format_expression_with_indent(default, indent + 4)
            ),
            None => param.name.clone(),
        })
        .collect();
    let params = format!("({})", params.join(" "));
    let body = format_expression_with_indent(&def.body, indent + 2);
    format_nested("function", &[params, body], indent)
}

/// `(head part...)` on one line when short, otherwise one part per line
fn format_nested(head: &str, parts: &[String], indent: usize) -> String {
    if parts.is_empty() {
        return format!("({})", head);
    }

    let width: usize = parts.iter().map(String::len).sum::<usize>() + head.len();
    if width < 50 && parts.iter().all(|part| !part.contains('\n')) {
        format!("({} {})", head, parts.join(" "))
    } else {
        let separator = format!("\n{}", " ".repeat(indent + 2));
        format!("({}{}{})", head, separator, parts.join(&separator))
    }
}
