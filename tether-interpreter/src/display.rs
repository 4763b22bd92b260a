//! Printing and deparsing of interpreter values.

use crate::interpreter::Interpreter;
use crate::sexp::{Arg, Object, Sexp};

/// Format a double the way the REPL shows it: at most seven significant
/// digits, integral values without a fraction.
pub fn format_double(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Inf" } else { "-Inf" }.to_string();
    }
    if value == value.trunc() && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }

    // Round to seven significant digits, then print the shortest form
    let rounded: f64 = format!("{:.6e}", value).parse().unwrap_or(value);
    if rounded.abs() >= 1e15 || rounded.abs() < 1e-4 {
        format!("{:e}", rounded)
    } else {
        format!("{}", rounded)
    }
}

fn quote_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for ch in value.chars() {
        match ch {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            '\r' => quoted.push_str("\\r"),
            '\0' => quoted.push_str("\\0"),
            other => quoted.push(other),
        }
    }
    quoted.push('"');
    quoted
}

/// Elements of an atomic vector as printed strings, or `None` for other types
fn atomic_elements(object: &Object) -> Option<Vec<String>> {
    match object {
        Object::Logical(v) => Some(
            v.iter()
                .map(|b| if *b { "TRUE" } else { "FALSE" }.to_string())
                .collect(),
        ),
        Object::Integer(v) => Some(v.iter().map(|i| i.to_string()).collect()),
        Object::Double(v) => Some(v.iter().map(|d| format_double(*d)).collect()),
        Object::Str(v) => Some(v.iter().map(|s| quote_string(s)).collect()),
        _ => None,
    }
}

fn empty_vector(object: &Object) -> &'static str {
    match object {
        Object::Logical(_) => "logical(0)",
        Object::Integer(_) => "integer(0)",
        Object::Double(_) => "numeric(0)",
        _ => "character(0)",
    }
}

const BINARY_OPERATORS: &[&str] = &[
    "<-", "||", "&&", "==", "!=", "<", "<=", ">", ">=", "+", "-", "*", "/", "^",
];

fn deparse_args(interp: &Interpreter, args: &[Arg]) -> String {
    args.iter()
        .map(|arg| match &arg.name {
            Some(name) => format!("{} = {}", name, deparse(interp, arg.value)),
            None => deparse(interp, arg.value),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn deparse_formals(interp: &Interpreter, names: &[String], defaults: &[Sexp]) -> String {
    names
        .iter()
        .zip(defaults)
        .map(|(name, default)| {
            if *default == Sexp::MISSING_ARG {
                name.clone()
            } else {
                format!("{} = {}", name, deparse(interp, *default))
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Source-like text for a value or unevaluated expression
pub fn deparse(interp: &Interpreter, sexp: Sexp) -> String {
    let node = interp.with_node(sexp, |node| node.clone());

    match node.object {
        Object::Null => "NULL".to_string(),
        Object::MissingArg => String::new(),
        ref atomic @ (Object::Logical(_)
        | Object::Integer(_)
        | Object::Double(_)
        | Object::Str(_)) => {
            let mut elements = atomic_elements(atomic).unwrap_or_default();
            if let Object::Integer(_) = atomic {
                elements.iter_mut().for_each(|e| e.push('L'));
            }
            match elements.len() {
                0 => empty_vector(atomic).to_string(),
                1 => elements.remove(0),
                _ => format!("c({})", elements.join(", ")),
            }
        }
        Object::Symbol(name) => name,
        Object::Language(call) => {
            let function = interp.symbol_name(call.function);
            let args = &call.args;
            match (function.as_deref(), args.len()) {
                (Some("{"), _) => {
                    let body: Vec<String> = args.iter().map(|a| deparse(interp, a.value)).collect();
                    if body.is_empty() {
                        "{ }".to_string()
                    } else {
                        format!("{{ {} }}", body.join("; "))
                    }
                }
                (Some("("), 1) => format!("({})", deparse(interp, args[0].value)),
                (Some("if"), 2 | 3) => {
                    let mut text = format!(
                        "if ({}) {}",
                        deparse(interp, args[0].value),
                        deparse(interp, args[1].value)
                    );
                    if let Some(alternative) = args.get(2) {
                        text.push_str(&format!(" else {}", deparse(interp, alternative.value)));
                    }
                    text
                }
                (Some("while"), 2) => format!(
                    "while ({}) {}",
                    deparse(interp, args[0].value),
                    deparse(interp, args[1].value)
                ),
                (Some("function"), 2) => {
                    let names = interp.names(args[0].value).unwrap_or_default();
                    let defaults = match interp.object(args[0].value) {
                        Object::List(defaults) => defaults,
                        _ => Vec::new(),
                    };
                    format!(
                        "function({}) {}",
                        deparse_formals(interp, &names, &defaults),
                        deparse(interp, args[1].value)
                    )
                }
                (Some(op), 1) if matches!(op, "-" | "+" | "!") => {
                    format!("{}{}", op, deparse(interp, args[0].value))
                }
                (Some(op), 2) if BINARY_OPERATORS.contains(&op) && args.iter().all(|a| a.name.is_none()) => {
                    let separator = if op == "^" { "" } else { " " };
                    format!(
                        "{}{sep}{}{sep}{}",
                        deparse(interp, args[0].value),
                        op,
                        deparse(interp, args[1].value),
                        sep = separator
                    )
                }
                (Some(name), _) => format!("{}({})", name, deparse_args(interp, args)),
                (None, _) => format!(
                    "({})({})",
                    deparse(interp, call.function),
                    deparse_args(interp, args)
                ),
            }
        }
        Object::Closure(closure) => {
            let names: Vec<String> = closure.params.iter().map(|p| p.name.clone()).collect();
            let defaults: Vec<Sexp> = closure.params.iter().map(|p| p.default).collect();
            format!(
                "function({}) {}",
                deparse_formals(interp, &names, &defaults),
                deparse(interp, closure.body)
            )
        }
        Object::List(items) => {
            let names = node.attributes.names.clone().unwrap_or_default();
            let elements: Vec<String> = items
                .iter()
                .enumerate()
                .map(|(i, item)| match names.get(i).filter(|n| !n.is_empty()) {
                    Some(name) => format!("{} = {}", name, deparse(interp, *item)),
                    None => deparse(interp, *item),
                })
                .collect();
            format!("list({})", elements.join(", "))
        }
        Object::Expression(items) => {
            let elements: Vec<String> = items.iter().map(|e| deparse(interp, *e)).collect();
            format!("expression({})", elements.join(", "))
        }
        Object::Builtin(builtin) => format!(".Primitive(\"{}\")", builtin.name),
        Object::Native(_) => "<native function>".to_string(),
        Object::Environment(_) => environment_label(interp, sexp),
        Object::ExternalPtr(_) => "<pointer>".to_string(),
        Object::UnwindCont(_) => "<unwind continuation>".to_string(),
    }
}

fn environment_label(interp: &Interpreter, env: Sexp) -> String {
    if env == interp.global_env() {
        "<environment: R_GlobalEnv>".to_string()
    } else if env == interp.base_env() {
        "<environment: base>".to_string()
    } else {
        format!("<environment: {:?}>", env)
    }
}

fn class_footer(class: &Option<Vec<String>>) -> Option<String> {
    let class = class.as_ref()?;
    let quoted: Vec<String> = class.iter().map(|c| quote_string(c)).collect();
    Some(format!("attr(,\"class\")\n[1] {}", quoted.join(" ")))
}

fn format_into(interp: &Interpreter, sexp: Sexp, prefix: &str, lines: &mut Vec<String>) {
    let node = interp.with_node(sexp, |node| node.clone());

    match &node.object {
        Object::Null => lines.push("NULL".to_string()),
        Object::List(items) if items.is_empty() => lines.push("list()".to_string()),
        Object::List(items) => {
            let names = node.attributes.names.clone().unwrap_or_default();
            for (i, item) in items.iter().enumerate() {
                let header = match names.get(i).filter(|n| !n.is_empty()) {
                    Some(name) => format!("{}${}", prefix, name),
                    None => format!("{}[[{}]]", prefix, i + 1),
                };
                lines.push(header.clone());
                format_into(interp, *item, &header, lines);
                lines.push(String::new());
            }
        }
        Object::Environment(_) => lines.push(environment_label(interp, sexp)),
        Object::Builtin(builtin) => {
            lines.push(format!("function (...) .Primitive(\"{}\")", builtin.name))
        }
        object => match atomic_elements(object) {
            Some(elements) if elements.is_empty() => {
                lines.push(empty_vector(object).to_string())
            }
            Some(elements) => lines.push(format!("[1] {}", elements.join(" "))),
            None => lines.push(deparse(interp, sexp)),
        },
    }

    if let Some(footer) = class_footer(&node.attributes.class) {
        lines.extend(footer.lines().map(str::to_string));
    }
}

/// Render a value for display, as `print` shows it
pub fn format_value(interp: &Interpreter, sexp: Sexp) -> String {
    let mut lines = Vec::new();
    format_into(interp, sexp, "", &mut lines);
    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}
