//! Built-in functions installed in the base scope.

use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use std::rc::Rc;

use indexmap::IndexMap;
use lazy_static::lazy_static;

use crate::display::{deparse, format_double, format_value};
use crate::eval::match_args;
use crate::interpreter::Interpreter;
use crate::sexp::{Arg, Builtin, BuiltinFn, BuiltinKind, Closure, Object, Param, Sexp};

fn special(name: &'static str, func: BuiltinFn) -> Builtin {
    Builtin {
        name,
        kind: BuiltinKind::Special,
        func,
    }
}

fn builtin(name: &'static str, func: BuiltinFn) -> Builtin {
    Builtin {
        name,
        kind: BuiltinKind::Builtin,
        func,
    }
}

lazy_static! {
    static ref BUILTINS: IndexMap<&'static str, Builtin> = {
        let table = vec![
            // Language
            special("quote", do_quote),
            special("{", do_begin),
            builtin("(", do_paren),
            special("<-", do_assign),
            special("if", do_if),
            special("while", do_while),
            special("function", do_function),
            special("&&", do_and),
            special("||", do_or),
            // Conditions and evaluation
            special("tryCatch", do_try_catch),
            special("evalq", do_evalq),
            builtin("eval", do_eval),
            builtin("stop", do_stop),
            builtin("simpleError", do_simple_error),
            builtin("simpleCondition", do_simple_condition),
            builtin("signalCondition", do_signal_condition),
            builtin("conditionMessage", do_condition_message),
            builtin("interrupt", do_interrupt),
            builtin("invokeRestart", do_invoke_restart),
            // Arithmetic and comparison
            builtin("+", do_add),
            builtin("-", do_subtract),
            builtin("*", do_multiply),
            builtin("/", do_divide),
            builtin("^", do_power),
            builtin("==", do_equal),
            builtin("!=", do_not_equal),
            builtin("<", do_less),
            builtin("<=", do_less_equal),
            builtin(">", do_greater),
            builtin(">=", do_greater_equal),
            builtin("!", do_not),
            // Vectors and attributes
            builtin("c", do_c),
            builtin("list", do_list),
            builtin("length", do_length),
            builtin("structure", do_structure),
            builtin("class", do_class),
            builtin("inherits", do_inherits),
            builtin("identical", do_identical),
            builtin("is.null", do_is_null),
            // Environments
            builtin("new.env", do_new_env),
            builtin("baseenv", do_baseenv),
            builtin("globalenv", do_globalenv),
            builtin("environment", do_environment),
            // Strings and output
            builtin("paste", do_paste),
            builtin("paste0", do_paste0),
            builtin("nchar", do_nchar),
            builtin("print", do_print),
        ];
        table.into_iter().map(|b| (b.name, b)).collect()
    };
}

/// Bind every built-in in the base scope
pub(crate) fn install(interp: &Interpreter) {
    for builtin in BUILTINS.values() {
        let sexp = interp.alloc(Object::Builtin(*builtin));
        interp.define_var(builtin.name, sexp, interp.base_env());
    }
}

/// Names of all built-in functions, in installation order
pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    BUILTINS.keys().copied()
}

// Argument helpers

fn check_arity(interp: &Interpreter, name: &str, args: &[Arg], expected: usize) {
    if args.len() != expected {
        interp.stop(format!(
            "{} argument{} passed to '{}' which requires {}",
            args.len(),
            if args.len() == 1 { "" } else { "s" },
            name,
            expected
        ));
    }
}

fn matched(interp: &Interpreter, formals: &[&str], args: &[Arg]) -> Vec<Option<Sexp>> {
    match match_args(formals, args) {
        Ok(matched) => matched,
        Err(message) => interp.stop(message),
    }
}

fn required(interp: &Interpreter, value: Option<Sexp>, name: &str) -> Sexp {
    match value {
        Some(value) => value,
        None => interp.stop(format!("argument \"{}\" is missing, with no default", name)),
    }
}

/// Coerce to a character vector
pub(crate) fn as_character(interp: &Interpreter, value: Sexp) -> Vec<String> {
    match interp.object(value) {
        Object::Null => Vec::new(),
        Object::Str(values) => values,
        Object::Double(values) => values.into_iter().map(format_double).collect(),
        Object::Integer(values) => values.into_iter().map(|v| v.to_string()).collect(),
        Object::Logical(values) => values
            .into_iter()
            .map(|v| if v { "TRUE" } else { "FALSE" }.to_string())
            .collect(),
        Object::Symbol(name) => vec![name],
        Object::List(items) => items
            .into_iter()
            .map(|item| match as_character(interp, item).as_slice() {
                [single] => single.clone(),
                _ => deparse(interp, item),
            })
            .collect(),
        Object::Language(_) => vec![deparse(interp, value)],
        other => interp.stop(format!(
            "cannot coerce type '{}' to vector of type 'character'",
            other.type_name()
        )),
    }
}

fn first_string(interp: &Interpreter, value: Sexp, what: &str) -> String {
    match as_character(interp, value).into_iter().next() {
        Some(first) => first,
        None => interp.stop(format!("invalid '{}' argument", what)),
    }
}

/// Interpret a value as a single condition flag
fn as_flag(interp: &Interpreter, value: Sexp) -> bool {
    let flag = interp.with_node(value, |node| match &node.object {
        Object::Logical(v) => v.first().copied().ok_or("argument is of length zero"),
        Object::Integer(v) => v
            .first()
            .map(|i| *i != 0)
            .ok_or("argument is of length zero"),
        Object::Double(v) => match v.first() {
            Some(d) if d.is_nan() => Err("missing value where TRUE/FALSE needed"),
            Some(d) => Ok(*d != 0.0),
            None => Err("argument is of length zero"),
        },
        Object::Str(v) => match v.first().map(String::as_str) {
            Some("TRUE" | "true" | "T" | "True") => Ok(true),
            Some("FALSE" | "false" | "F" | "False") => Ok(false),
            Some(_) => Err("argument is not interpretable as logical"),
            None => Err("argument is of length zero"),
        },
        Object::Null => Err("argument is of length zero"),
        _ => Err("argument is not interpretable as logical"),
    });
    match flag {
        Ok(flag) => flag,
        Err(message) => interp.stop(message),
    }
}

// Language

fn do_quote(interp: &Interpreter, args: &[Arg], _env: Sexp) -> Sexp {
    check_arity(interp, "quote", args, 1);
    args[0].value
}

fn do_begin(interp: &Interpreter, args: &[Arg], env: Sexp) -> Sexp {
    args.iter()
        .fold(Sexp::NULL, |_, arg| interp.eval(arg.value, env))
}

fn do_paren(interp: &Interpreter, args: &[Arg], _env: Sexp) -> Sexp {
    check_arity(interp, "(", args, 1);
    args[0].value
}

fn do_assign(interp: &Interpreter, args: &[Arg], env: Sexp) -> Sexp {
    check_arity(interp, "<-", args, 2);
    let name = match interp.object(args[0].value) {
        Object::Symbol(name) => name,
        Object::Str(values) if values.len() == 1 => values[0].clone(),
        _ => interp.stop("invalid (do_set) left-hand side to assignment"),
    };
    let value = interp.eval(args[1].value, env);
    interp.define_var(&name, value, env);
    value
}

fn do_if(interp: &Interpreter, args: &[Arg], env: Sexp) -> Sexp {
    if !(2..=3).contains(&args.len()) {
        interp.stop("malformed if expression");
    }
    let condition = interp.eval(args[0].value, env);
    if as_flag(interp, condition) {
        interp.eval(args[1].value, env)
    } else if let Some(alternative) = args.get(2) {
        interp.eval(alternative.value, env)
    } else {
        Sexp::NULL
    }
}

fn do_while(interp: &Interpreter, args: &[Arg], env: Sexp) -> Sexp {
    check_arity(interp, "while", args, 2);
    loop {
        let condition = interp.eval(args[0].value, env);
        if !as_flag(interp, condition) {
            break;
        }
        interp.eval(args[1].value, env);
    }
    Sexp::NULL
}

fn do_function(interp: &Interpreter, args: &[Arg], env: Sexp) -> Sexp {
    check_arity(interp, "function", args, 2);
    let formals = args[0].value;
    let defaults = match interp.object(formals) {
        Object::List(defaults) => defaults,
        Object::Null => Vec::new(),
        _ => interp.stop("invalid formal argument list for \"function\""),
    };
    let names = interp.names(formals).unwrap_or_default();
    if names.len() != defaults.len() {
        interp.stop("invalid formal argument list for \"function\"");
    }

    let params = names
        .into_iter()
        .zip(defaults)
        .map(|(name, default)| Param { name, default })
        .collect();
    interp.alloc(Object::Closure(Closure {
        params,
        body: args[1].value,
        env,
    }))
}

fn do_and(interp: &Interpreter, args: &[Arg], env: Sexp) -> Sexp {
    check_arity(interp, "&&", args, 2);
    let left = interp.eval(args[0].value, env);
    if !as_flag(interp, left) {
        return interp.mk_logical(false);
    }
    let right = interp.eval(args[1].value, env);
    interp.mk_logical(as_flag(interp, right))
}

fn do_or(interp: &Interpreter, args: &[Arg], env: Sexp) -> Sexp {
    check_arity(interp, "||", args, 2);
    let left = interp.eval(args[0].value, env);
    if as_flag(interp, left) {
        return interp.mk_logical(true);
    }
    let right = interp.eval(args[1].value, env);
    interp.mk_logical(as_flag(interp, right))
}

// Conditions and evaluation

fn do_try_catch(interp: &Interpreter, args: &[Arg], env: Sexp) -> Sexp {
    let mut expr = None;
    let mut finally = None;
    let mut handlers = Vec::new();

    for arg in args {
        match arg.name.as_deref() {
            Some("expr") => expr = Some(arg.value),
            Some("finally") => finally = Some(arg.value),
            Some(class) => handlers.push((class.to_string(), arg.value)),
            None if expr.is_none() => expr = Some(arg.value),
            None => interp.stop("tryCatch handlers must be named"),
        }
    }

    // Handlers are evaluated when they are established
    let handlers: Vec<(String, Sexp)> = handlers
        .into_iter()
        .map(|(class, handler)| {
            let function = interp.eval(handler, env);
            if !interp.is_function(function) {
                interp.stop(format!("handler for '{}' is not a function", class));
            }
            (class, function)
        })
        .collect();

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        interp.try_catch_handlers(handlers, |interp| match expr {
            Some(expr) => interp.eval(expr, env),
            None => Sexp::NULL,
        })
    }));

    if let Some(finally) = finally {
        interp.eval(finally, env);
    }

    match outcome {
        Ok(value) => value,
        Err(payload) => resume_unwind(payload),
    }
}

fn evaluation_env(interp: &Interpreter, envir: Option<Sexp>, env: Sexp) -> Sexp {
    match envir {
        Some(envir) if interp.is_environment(envir) => envir,
        Some(_) => interp.stop("invalid 'envir' argument"),
        None => env,
    }
}

fn do_evalq(interp: &Interpreter, args: &[Arg], env: Sexp) -> Sexp {
    let matched = matched(interp, &["expr", "envir"], args);
    let expr = required(interp, matched[0], "expr");
    let envir = matched[1].map(|envir| interp.eval(envir, env));
    let target = evaluation_env(interp, envir, env);
    interp.eval(expr, target)
}

fn do_eval(interp: &Interpreter, args: &[Arg], env: Sexp) -> Sexp {
    let matched = matched(interp, &["expr", "envir"], args);
    let expr = required(interp, matched[0], "expr");
    let target = evaluation_env(interp, matched[1], env);
    interp.eval(expr, target)
}

fn do_stop(interp: &Interpreter, args: &[Arg], _env: Sexp) -> Sexp {
    let parts: Vec<&Arg> = args
        .iter()
        .filter(|arg| arg.name.as_deref() != Some("call."))
        .collect();

    if let [single] = parts.as_slice() {
        if interp.inherits(single.value, "condition") {
            interp.raise(single.value);
        }
    }

    let message: String = parts
        .iter()
        .flat_map(|arg| as_character(interp, arg.value))
        .collect();
    interp.stop(message)
}

fn do_simple_error(interp: &Interpreter, args: &[Arg], _env: Sexp) -> Sexp {
    let matched = matched(interp, &["message", "call"], args);
    let message = first_string(interp, required(interp, matched[0], "message"), "message");
    interp.make_error_condition(&message, matched[1].unwrap_or(Sexp::NULL))
}

fn do_simple_condition(interp: &Interpreter, args: &[Arg], _env: Sexp) -> Sexp {
    let matched = matched(interp, &["message", "call"], args);
    let message = first_string(interp, required(interp, matched[0], "message"), "message");
    interp.make_condition(
        &message,
        matched[1].unwrap_or(Sexp::NULL),
        &["simpleCondition", "condition"],
    )
}

fn do_signal_condition(interp: &Interpreter, args: &[Arg], _env: Sexp) -> Sexp {
    check_arity(interp, "signalCondition", args, 1);
    interp.signal_condition(args[0].value);
    Sexp::NULL
}

fn do_condition_message(interp: &Interpreter, args: &[Arg], _env: Sexp) -> Sexp {
    check_arity(interp, "conditionMessage", args, 1);
    match interp.condition_message(args[0].value) {
        Some(message) => interp.mk_string(message),
        None => interp.stop(format!(
            "no applicable method for 'conditionMessage' applied to an object of class \"{}\"",
            interp.class(args[0].value).join("\", \"")
        )),
    }
}

fn do_interrupt(interp: &Interpreter, args: &[Arg], _env: Sexp) -> Sexp {
    check_arity(interp, "interrupt", args, 0);
    interp.signal_interrupt()
}

fn do_invoke_restart(interp: &Interpreter, args: &[Arg], _env: Sexp) -> Sexp {
    check_arity(interp, "invokeRestart", args, 1);
    match first_string(interp, args[0].value, "r").as_str() {
        "abort" => interp.abort(None),
        other => interp.stop(format!("no 'restart' '{}' found", other)),
    }
}

// Arithmetic

enum Numeric {
    Integer(Vec<i64>),
    Double(Vec<f64>),
}

impl Numeric {
    fn len(&self) -> usize {
        match self {
            Numeric::Integer(v) => v.len(),
            Numeric::Double(v) => v.len(),
        }
    }

    fn into_doubles(self) -> Vec<f64> {
        match self {
            Numeric::Integer(v) => v.into_iter().map(|i| i as f64).collect(),
            Numeric::Double(v) => v,
        }
    }
}

fn as_numeric(interp: &Interpreter, value: Sexp, operator: &str) -> Numeric {
    match interp.object(value) {
        Object::Null => Numeric::Double(Vec::new()),
        Object::Logical(v) => Numeric::Integer(v.into_iter().map(i64::from).collect()),
        Object::Integer(v) => Numeric::Integer(v),
        Object::Double(v) => Numeric::Double(v),
        other => interp.stop(format!(
            "non-numeric argument to '{}' (found {})",
            operator,
            other.type_name()
        )),
    }
}

/// Length of the result of an element-wise operation with recycling
fn recycled_len(left: usize, right: usize) -> usize {
    if left == 0 || right == 0 {
        0
    } else {
        left.max(right)
    }
}

#[derive(Clone, Copy)]
enum Arith {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
}

impl Arith {
    fn symbol(self) -> &'static str {
        match self {
            Arith::Add => "+",
            Arith::Subtract => "-",
            Arith::Multiply => "*",
            Arith::Divide => "/",
            Arith::Power => "^",
        }
    }

    fn integer(self, x: i64, y: i64) -> Option<i64> {
        match self {
            Arith::Add => x.checked_add(y),
            Arith::Subtract => x.checked_sub(y),
            Arith::Multiply => x.checked_mul(y),
            Arith::Divide | Arith::Power => None,
        }
    }

    fn double(self, x: f64, y: f64) -> f64 {
        match self {
            Arith::Add => x + y,
            Arith::Subtract => x - y,
            Arith::Multiply => x * y,
            Arith::Divide => x / y,
            Arith::Power => x.powf(y),
        }
    }
}

fn arithmetic(interp: &Interpreter, op: Arith, args: &[Arg]) -> Sexp {
    match args {
        [operand] => match op {
            Arith::Add => match as_numeric(interp, operand.value, op.symbol()) {
                Numeric::Integer(v) => interp.alloc(Object::Integer(v)),
                Numeric::Double(v) => interp.alloc(Object::Double(v)),
            },
            Arith::Subtract => match as_numeric(interp, operand.value, op.symbol()) {
                Numeric::Integer(v) => interp.alloc(Object::Integer(v.iter().map(|i| -i).collect())),
                Numeric::Double(v) => interp.alloc(Object::Double(v.iter().map(|d| -d).collect())),
            },
            _ => interp.stop(format!("invalid unary operator '{}'", op.symbol())),
        },
        [left, right] => {
            let left = as_numeric(interp, left.value, op.symbol());
            let right = as_numeric(interp, right.value, op.symbol());
            let n = recycled_len(left.len(), right.len());

            if let (Numeric::Integer(x), Numeric::Integer(y)) = (&left, &right) {
                let integers: Option<Vec<i64>> = (0..n)
                    .map(|i| op.integer(x[i % x.len()], y[i % y.len()]))
                    .collect();
                if let Some(integers) = integers {
                    return interp.alloc(Object::Integer(integers));
                }
            }

            let x = left.into_doubles();
            let y = right.into_doubles();
            let doubles = (0..n)
                .map(|i| op.double(x[i % x.len()], y[i % y.len()]))
                .collect();
            interp.alloc(Object::Double(doubles))
        }
        _ => interp.stop(format!(
            "operator '{}' needs one or two arguments",
            op.symbol()
        )),
    }
}

fn do_add(interp: &Interpreter, args: &[Arg], _env: Sexp) -> Sexp {
    arithmetic(interp, Arith::Add, args)
}

fn do_subtract(interp: &Interpreter, args: &[Arg], _env: Sexp) -> Sexp {
    arithmetic(interp, Arith::Subtract, args)
}

fn do_multiply(interp: &Interpreter, args: &[Arg], _env: Sexp) -> Sexp {
    arithmetic(interp, Arith::Multiply, args)
}

fn do_divide(interp: &Interpreter, args: &[Arg], _env: Sexp) -> Sexp {
    arithmetic(interp, Arith::Divide, args)
}

fn do_power(interp: &Interpreter, args: &[Arg], _env: Sexp) -> Sexp {
    arithmetic(interp, Arith::Power, args)
}

// Comparison

#[derive(Clone, Copy)]
enum Comparison {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl Comparison {
    fn holds(self, ordering: Option<std::cmp::Ordering>) -> bool {
        use std::cmp::Ordering::*;
        match (self, ordering) {
            (_, None) => false,
            (Comparison::Equal, Some(o)) => o == Equal,
            (Comparison::NotEqual, Some(o)) => o != Equal,
            (Comparison::Less, Some(o)) => o == Less,
            (Comparison::LessEqual, Some(o)) => o != Greater,
            (Comparison::Greater, Some(o)) => o == Greater,
            (Comparison::GreaterEqual, Some(o)) => o != Less,
        }
    }
}

fn compare(interp: &Interpreter, comparison: Comparison, args: &[Arg]) -> Sexp {
    check_arity(interp, "comparison", args, 2);
    let (left, right) = (args[0].value, args[1].value);
    let is_string = |value| interp.with_node(value, |node| matches!(node.object, Object::Str(_)));

    let results: Vec<bool> = if is_string(left) || is_string(right) {
        let x = as_character(interp, left);
        let y = as_character(interp, right);
        (0..recycled_len(x.len(), y.len()))
            .map(|i| comparison.holds(Some(x[i % x.len()].cmp(&y[i % y.len()]))))
            .collect()
    } else {
        let x = as_numeric(interp, left, "comparison").into_doubles();
        let y = as_numeric(interp, right, "comparison").into_doubles();
        (0..recycled_len(x.len(), y.len()))
            .map(|i| comparison.holds(x[i % x.len()].partial_cmp(&y[i % y.len()])))
            .collect()
    };
    interp.alloc(Object::Logical(results))
}

fn do_equal(interp: &Interpreter, args: &[Arg], _env: Sexp) -> Sexp {
    compare(interp, Comparison::Equal, args)
}

fn do_not_equal(interp: &Interpreter, args: &[Arg], _env: Sexp) -> Sexp {
    compare(interp, Comparison::NotEqual, args)
}

fn do_less(interp: &Interpreter, args: &[Arg], _env: Sexp) -> Sexp {
    compare(interp, Comparison::Less, args)
}

fn do_less_equal(interp: &Interpreter, args: &[Arg], _env: Sexp) -> Sexp {
    compare(interp, Comparison::LessEqual, args)
}

fn do_greater(interp: &Interpreter, args: &[Arg], _env: Sexp) -> Sexp {
    compare(interp, Comparison::Greater, args)
}

fn do_greater_equal(interp: &Interpreter, args: &[Arg], _env: Sexp) -> Sexp {
    compare(interp, Comparison::GreaterEqual, args)
}

fn do_not(interp: &Interpreter, args: &[Arg], _env: Sexp) -> Sexp {
    check_arity(interp, "!", args, 1);
    let negated: Vec<bool> = match interp.object(args[0].value) {
        Object::Logical(v) => v.into_iter().map(|b| !b).collect(),
        Object::Integer(v) => v.into_iter().map(|i| i == 0).collect(),
        Object::Double(v) => v.into_iter().map(|d| d == 0.0).collect(),
        _ => interp.stop("invalid argument type"),
    };
    interp.alloc(Object::Logical(negated))
}

// Vectors and attributes

/// Position in the logical < integer < double < character hierarchy
fn atomic_rank(object: &Object) -> Option<u8> {
    match object {
        Object::Logical(_) => Some(0),
        Object::Integer(_) => Some(1),
        Object::Double(_) => Some(2),
        Object::Str(_) => Some(3),
        _ => None,
    }
}

/// One length-one vector per element of an atomic vector
fn split_atomic(interp: &Interpreter, object: Object, sexp: Sexp) -> Vec<Sexp> {
    match object {
        Object::Logical(v) => v.into_iter().map(|b| interp.mk_logical(b)).collect(),
        Object::Integer(v) => v.into_iter().map(|i| interp.mk_integer(i)).collect(),
        Object::Double(v) => v.into_iter().map(|d| interp.mk_double(d)).collect(),
        Object::Str(v) => v.into_iter().map(|s| interp.mk_string(s)).collect(),
        Object::List(items) => items,
        _ => vec![sexp],
    }
}

fn do_c(interp: &Interpreter, args: &[Arg], _env: Sexp) -> Sexp {
    let items: Vec<(Sexp, Object)> = args
        .iter()
        .map(|arg| (arg.value, interp.object(arg.value)))
        .filter(|(_, object)| !matches!(object, Object::Null))
        .collect();
    if items.is_empty() {
        return Sexp::NULL;
    }

    let rank = items
        .iter()
        .try_fold(0, |rank, (_, object)| atomic_rank(object).map(|r| r.max(rank)));

    match rank {
        Some(0) => {
            let values = items
                .into_iter()
                .flat_map(|(_, object)| match object {
                    Object::Logical(v) => v,
                    _ => Vec::new(),
                })
                .collect();
            interp.alloc(Object::Logical(values))
        }
        Some(1) => {
            let values = items
                .into_iter()
                .flat_map(|(sexp, _)| match as_numeric(interp, sexp, "c") {
                    Numeric::Integer(v) => v,
                    Numeric::Double(_) => Vec::new(),
                })
                .collect();
            interp.alloc(Object::Integer(values))
        }
        Some(2) => {
            let values = items
                .into_iter()
                .flat_map(|(sexp, _)| as_numeric(interp, sexp, "c").into_doubles())
                .collect();
            interp.alloc(Object::Double(values))
        }
        Some(_) => {
            let values = items
                .into_iter()
                .flat_map(|(sexp, _)| as_character(interp, sexp))
                .collect();
            interp.alloc(Object::Str(values))
        }
        None => {
            let values = items
                .into_iter()
                .flat_map(|(sexp, object)| split_atomic(interp, object, sexp))
                .collect();
            interp.alloc(Object::List(values))
        }
    }
}

fn do_list(interp: &Interpreter, args: &[Arg], _env: Sexp) -> Sexp {
    let list = interp.mk_list(args.iter().map(|arg| arg.value).collect());
    if args.iter().any(|arg| arg.name.is_some()) {
        let names = args
            .iter()
            .map(|arg| arg.name.clone().unwrap_or_default())
            .collect();
        interp.set_names(list, Some(names));
    }
    list
}

fn do_length(interp: &Interpreter, args: &[Arg], _env: Sexp) -> Sexp {
    check_arity(interp, "length", args, 1);
    interp.mk_integer(interp.length(args[0].value) as i64)
}

fn do_structure(interp: &Interpreter, args: &[Arg], _env: Sexp) -> Sexp {
    let mut data = None;
    let mut attributes = Vec::new();

    for arg in args {
        match arg.name.as_deref() {
            None | Some(".Data") if data.is_none() => data = Some(arg.value),
            Some(name) => attributes.push((name, arg.value)),
            None => interp.stop("attributes must be named"),
        }
    }

    let data = required(interp, data, ".Data");
    let result = interp.duplicate(data);
    for (name, value) in attributes {
        let strings = if value.is_null() {
            None
        } else {
            Some(as_character(interp, value))
        };
        match name {
            "class" => interp.set_class(result, strings),
            "names" => interp.set_names(result, strings),
            other => interp.stop(format!("unsupported attribute '{}'", other)),
        }
    }
    result
}

fn do_class(interp: &Interpreter, args: &[Arg], _env: Sexp) -> Sexp {
    check_arity(interp, "class", args, 1);
    interp.mk_strings(interp.class(args[0].value))
}

fn do_inherits(interp: &Interpreter, args: &[Arg], _env: Sexp) -> Sexp {
    let matched = matched(interp, &["x", "what"], args);
    let x = required(interp, matched[0], "x");
    let what = as_character(interp, required(interp, matched[1], "what"));
    let class = interp.class(x);
    interp.mk_logical(what.iter().any(|w| class.contains(w)))
}

/// Structural equality of two values
pub fn identical(interp: &Interpreter, a: Sexp, b: Sexp) -> bool {
    if a == b {
        return true;
    }
    let left = interp.with_node(a, |node| node.clone());
    let right = interp.with_node(b, |node| node.clone());
    if left.attributes != right.attributes {
        return false;
    }

    let all_identical = |x: &[Sexp], y: &[Sexp]| {
        x.len() == y.len() && x.iter().zip(y).all(|(x, y)| identical(interp, *x, *y))
    };

    match (left.object, right.object) {
        (Object::Null, Object::Null) | (Object::MissingArg, Object::MissingArg) => true,
        (Object::Logical(x), Object::Logical(y)) => x == y,
        (Object::Integer(x), Object::Integer(y)) => x == y,
        (Object::Double(x), Object::Double(y)) => x == y,
        (Object::Str(x), Object::Str(y)) => x == y,
        (Object::Symbol(x), Object::Symbol(y)) => x == y,
        (Object::List(x), Object::List(y)) | (Object::Expression(x), Object::Expression(y)) => {
            all_identical(&x, &y)
        }
        (Object::Language(x), Object::Language(y)) => {
            let names_match = x
                .args
                .iter()
                .map(|arg| &arg.name)
                .eq(y.args.iter().map(|arg| &arg.name));
            let x_values: Vec<Sexp> = x.args.iter().map(|arg| arg.value).collect();
            let y_values: Vec<Sexp> = y.args.iter().map(|arg| arg.value).collect();
            names_match
                && identical(interp, x.function, y.function)
                && all_identical(&x_values, &y_values)
        }
        (Object::Closure(x), Object::Closure(y)) => {
            let x_defaults: Vec<Sexp> = x.params.iter().map(|p| p.default).collect();
            let y_defaults: Vec<Sexp> = y.params.iter().map(|p| p.default).collect();
            x.env == y.env
                && x.params
                    .iter()
                    .map(|p| &p.name)
                    .eq(y.params.iter().map(|p| &p.name))
                && all_identical(&x_defaults, &y_defaults)
                && identical(interp, x.body, y.body)
        }
        (Object::Builtin(x), Object::Builtin(y)) => x.name == y.name,
        (Object::Native(x), Object::Native(y)) => Rc::ptr_eq(&x, &y),
        (Object::ExternalPtr(x), Object::ExternalPtr(y)) => Rc::ptr_eq(&x, &y),
        _ => false,
    }
}

fn do_identical(interp: &Interpreter, args: &[Arg], _env: Sexp) -> Sexp {
    check_arity(interp, "identical", args, 2);
    interp.mk_logical(identical(interp, args[0].value, args[1].value))
}

fn do_is_null(interp: &Interpreter, args: &[Arg], _env: Sexp) -> Sexp {
    check_arity(interp, "is.null", args, 1);
    interp.mk_logical(args[0].value.is_null())
}

// Environments

fn do_new_env(interp: &Interpreter, args: &[Arg], env: Sexp) -> Sexp {
    let matched = matched(interp, &["parent"], args);
    let parent = matched[0].unwrap_or(env);
    if !interp.is_environment(parent) {
        interp.stop("'enclos' must be an environment");
    }
    interp.new_env(parent)
}

fn do_baseenv(interp: &Interpreter, args: &[Arg], _env: Sexp) -> Sexp {
    check_arity(interp, "baseenv", args, 0);
    interp.base_env()
}

fn do_globalenv(interp: &Interpreter, args: &[Arg], _env: Sexp) -> Sexp {
    check_arity(interp, "globalenv", args, 0);
    interp.global_env()
}

fn do_environment(interp: &Interpreter, args: &[Arg], env: Sexp) -> Sexp {
    let matched = matched(interp, &["fun"], args);
    match matched[0] {
        None => env,
        Some(fun) if fun.is_null() => env,
        Some(fun) => match interp.object(fun) {
            Object::Closure(closure) => closure.env,
            _ => Sexp::NULL,
        },
    }
}

// Strings and output

fn paste(interp: &Interpreter, args: &[Arg], default_sep: &str) -> Sexp {
    let mut sep = default_sep.to_string();
    let mut collapse = None;
    let mut vectors = Vec::new();

    for arg in args {
        match arg.name.as_deref() {
            Some("sep") => sep = first_string(interp, arg.value, "sep"),
            Some("collapse") if arg.value.is_null() => collapse = None,
            Some("collapse") => collapse = Some(first_string(interp, arg.value, "collapse")),
            _ => vectors.push(as_character(interp, arg.value)),
        }
    }
    vectors.retain(|v| !v.is_empty());

    let n = vectors.iter().map(Vec::len).max().unwrap_or(0);
    let pieces: Vec<String> = (0..n)
        .map(|i| {
            vectors
                .iter()
                .map(|v| v[i % v.len()].as_str())
                .collect::<Vec<_>>()
                .join(sep.as_str())
        })
        .collect();

    match collapse {
        Some(collapse) => interp.mk_string(pieces.join(collapse.as_str())),
        None => interp.mk_strings(pieces),
    }
}

fn do_paste(interp: &Interpreter, args: &[Arg], _env: Sexp) -> Sexp {
    paste(interp, args, " ")
}

fn do_paste0(interp: &Interpreter, args: &[Arg], _env: Sexp) -> Sexp {
    paste(interp, args, "")
}

fn do_nchar(interp: &Interpreter, args: &[Arg], _env: Sexp) -> Sexp {
    check_arity(interp, "nchar", args, 1);
    let counts = as_character(interp, args[0].value)
        .iter()
        .map(|s| s.chars().count() as i64)
        .collect();
    interp.alloc(Object::Integer(counts))
}

fn do_print(interp: &Interpreter, args: &[Arg], _env: Sexp) -> Sexp {
    check_arity(interp, "print", args, 1);
    let text = format_value(interp, args[0].value);
    interp.write_output(text);
    args[0].value
}
