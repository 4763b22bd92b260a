//! Parsing source text into language objects.

use tether_parser::{Expression, ExpressionKind, ParseError, parse_program};
use tracing::debug;

use crate::interpreter::Interpreter;
use crate::protect::Shelter;
use crate::sexp::{Arg, Object, Sexp};

/// Outcome of `parse_vector`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    Ok,
    /// The text ended in the middle of an expression
    Incomplete,
    Error,
}

impl Interpreter {
    /// Parse `code` into an expression vector.
    ///
    /// On failure the vector is `NULL` and the parser's diagnostic is kept
    /// for `last_parse_error`.
    pub fn parse_vector(&self, code: &str) -> (ParseStatus, Sexp) {
        match parse_program(code) {
            Ok(program) => {
                self.state.last_parse_error.replace(None);
                let mut shelter = Shelter::new(self);
                let exprs: Vec<Sexp> = program
                    .expressions
                    .iter()
                    .map(|expr| shelter.protect(self.lang_from_ast(expr)))
                    .collect();
                (ParseStatus::Ok, self.alloc(Object::Expression(exprs)))
            }
            Err(error) => {
                let status = if error.is_incomplete() {
                    ParseStatus::Incomplete
                } else {
                    ParseStatus::Error
                };
                debug!(?status, %error, "parse failed");
                self.state.last_parse_error.replace(Some(error));
                (status, Sexp::NULL)
            }
        }
    }

    /// Diagnostic of the most recent failed `parse_vector`
    pub fn last_parse_error(&self) -> Option<ParseError> {
        self.state.last_parse_error.borrow().clone()
    }

    /// Convert a parsed expression into the language object it denotes.
    ///
    /// Operators and control flow become calls, as in R: `a + b` is
    /// `` `+`(a, b) `` and `if (c) x` is `` `if`(c, x) ``.
    pub fn lang_from_ast(&self, expr: &Expression) -> Sexp {
        match &expr.kind {
            ExpressionKind::Null => Sexp::NULL,
            ExpressionKind::Boolean(value) => self.mk_logical(*value),
            ExpressionKind::Number(value) => self.mk_double(*value),
            ExpressionKind::Integer(value) => self.mk_integer(*value),
            ExpressionKind::String(value) => self.mk_string(value.clone()),
            ExpressionKind::Identifier(name) => self.mk_symbol(name.clone()),
            ExpressionKind::Call(call) => {
                let function = self.lang_from_ast(&call.function);
                let args = call
                    .arguments
                    .iter()
                    .map(|arg| Arg {
                        name: arg.name.clone(),
                        value: self.lang_from_ast(&arg.value),
                    })
                    .collect();
                self.mk_lang(function, args)
            }
            ExpressionKind::BinaryOp(op) => {
                let left = self.lang_from_ast(&op.left);
                let right = self.lang_from_ast(&op.right);
                self.call_symbol(
                    op.operator.symbol(),
                    vec![Arg::positional(left), Arg::positional(right)],
                )
            }
            ExpressionKind::UnaryOp(op) => {
                let operand = self.lang_from_ast(&op.operand);
                self.call_symbol(op.operator.symbol(), vec![Arg::positional(operand)])
            }
            ExpressionKind::Function(def) => {
                let formals = def
                    .parameters
                    .iter()
                    .map(|param| {
                        let default = match &param.default {
                            Some(default) => self.lang_from_ast(default),
                            None => Sexp::MISSING_ARG,
                        };
                        (param.name.clone(), default)
                    })
                    .collect();
                let formals = self.mk_named_list(formals);
                let body = self.lang_from_ast(&def.body);
                self.call_symbol(
                    "function",
                    vec![Arg::positional(formals), Arg::positional(body)],
                )
            }
            ExpressionKind::If(if_expr) => {
                let mut args = vec![
                    Arg::positional(self.lang_from_ast(&if_expr.condition)),
                    Arg::positional(self.lang_from_ast(&if_expr.then_branch)),
                ];
                if let Some(else_branch) = &if_expr.else_branch {
                    args.push(Arg::positional(self.lang_from_ast(else_branch)));
                }
                self.call_symbol("if", args)
            }
            ExpressionKind::While(while_loop) => {
                let condition = self.lang_from_ast(&while_loop.condition);
                let body = self.lang_from_ast(&while_loop.body);
                self.call_symbol(
                    "while",
                    vec![Arg::positional(condition), Arg::positional(body)],
                )
            }
            ExpressionKind::Block(block) => {
                let args = block
                    .expressions
                    .iter()
                    .map(|expr| Arg::positional(self.lang_from_ast(expr)))
                    .collect();
                self.call_symbol("{", args)
            }
            ExpressionKind::Parenthesized(inner) => {
                let inner = self.lang_from_ast(inner);
                self.call_symbol("(", vec![Arg::positional(inner)])
            }
        }
    }

    fn call_symbol(&self, name: &str, args: Vec<Arg>) -> Sexp {
        let function = self.mk_symbol(name);
        self.mk_lang(function, args)
    }
}
