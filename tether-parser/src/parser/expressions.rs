// Expression parsing module
// Handles operator precedence, calls, and compound expressions

use pest::iterators::Pair;
use pest::pratt_parser::{Assoc, Op, PrattParser};

use crate::ast::*;
use crate::error::*;
use crate::parser::{Rule, TetherParser};

impl TetherParser {
    /// Binary operator precedence parser
    /// Precedence levels from lowest to highest (following R)
    pub(crate) fn pratt_parser() -> PrattParser<Rule> {
        PrattParser::new()
            // Level 1: Assignment (right associative)
            .op(Op::infix(Rule::op_assign, Assoc::Right))
            // Level 2: Logical OR
            .op(Op::infix(Rule::op_logical_or, Assoc::Left))
            // Level 3: Logical AND
            .op(Op::infix(Rule::op_logical_and, Assoc::Left))
            // Level 4: Negation binds looser than comparison: `!a == b` is `!(a == b)`
            .op(Op::prefix(Rule::op_not))
            // Level 5: Comparison
            .op(Op::infix(Rule::op_equal, Assoc::Left)
                | Op::infix(Rule::op_not_equal, Assoc::Left)
                | Op::infix(Rule::op_less, Assoc::Left)
                | Op::infix(Rule::op_less_equal, Assoc::Left)
                | Op::infix(Rule::op_greater, Assoc::Left)
                | Op::infix(Rule::op_greater_equal, Assoc::Left))
            // Level 6: Additive
            .op(Op::infix(Rule::op_add, Assoc::Left) | Op::infix(Rule::op_subtract, Assoc::Left))
            // Level 7: Multiplicative
            .op(Op::infix(Rule::op_multiply, Assoc::Left)
                | Op::infix(Rule::op_divide, Assoc::Left))
            // Level 8: Unary sign
            .op(Op::prefix(Rule::op_unary_minus) | Op::prefix(Rule::op_unary_plus))
            // Level 9: Exponentiation (highest precedence, right associative)
            .op(Op::infix(Rule::op_exponent, Assoc::Right))
    }

    /// Parse an `expression` pair using precedence climbing
    pub(crate) fn parse_expression_from_pair(
        pair: Pair<Rule>,
        src: &str,
    ) -> ParseResult<Expression> {
        Self::pratt_parser()
            .map_primary(|primary| Self::parse_postfix_expr(primary, src))
            .map_prefix(|op, operand: ParseResult<Expression>| {
                let operand = operand?;
                let operator = match op.as_rule() {
                    Rule::op_not => UnaryOperator::Not,
                    Rule::op_unary_minus => UnaryOperator::Minus,
                    Rule::op_unary_plus => UnaryOperator::Plus,
                    _ => unreachable!("Unexpected prefix operator: {:?}", op.as_rule()),
                };
                let span = Self::extract_span(&op).merge(operand.span);

                Ok(Expression {
                    kind: ExpressionKind::UnaryOp(UnaryOperation {
                        operator,
                        operand: Box::new(operand),
                    }),
                    span,
                })
            })
            .map_infix(
                |left: ParseResult<Expression>, op: Pair<Rule>, right: ParseResult<Expression>| {
                    let left = left?;
                    let right = right?;

                    let operator = match op.as_rule() {
                        Rule::op_assign => BinaryOperator::Assign,
                        Rule::op_logical_or => BinaryOperator::LogicalOr,
                        Rule::op_logical_and => BinaryOperator::LogicalAnd,
                        Rule::op_equal => BinaryOperator::Equal,
                        Rule::op_not_equal => BinaryOperator::NotEqual,
                        Rule::op_less => BinaryOperator::Less,
                        Rule::op_less_equal => BinaryOperator::LessEqual,
                        Rule::op_greater => BinaryOperator::Greater,
                        Rule::op_greater_equal => BinaryOperator::GreaterEqual,
                        Rule::op_add => BinaryOperator::Add,
                        Rule::op_subtract => BinaryOperator::Subtract,
                        Rule::op_multiply => BinaryOperator::Multiply,
                        Rule::op_divide => BinaryOperator::Divide,
                        Rule::op_exponent => BinaryOperator::Exponent,
                        _ => unreachable!("Unexpected binary operator: {:?}", op.as_rule()),
                    };

                    let span = left.span.merge(right.span);
                    Ok(Expression {
                        kind: ExpressionKind::BinaryOp(BinaryOperation {
                            left: Box::new(left),
                            operator,
                            right: Box::new(right),
                        }),
                        span,
                    })
                },
            )
            .parse(pair.into_inner())
    }

    /// Parse a primary expression followed by any number of call suffixes
    fn parse_postfix_expr(pair: Pair<Rule>, src: &str) -> ParseResult<Expression> {
        let mut inner_pairs = pair.into_inner();
        let primary_pair = inner_pairs.next().unwrap();
        let mut expression = Self::parse_primary_expr(primary_pair, src)?;

        for suffix in inner_pairs {
            let suffix_span = Self::extract_span(&suffix);
            let arguments = match suffix.into_inner().next() {
                Some(list) => Self::parse_argument_list(list, src)?,
                None => Vec::new(),
            };
            let span = expression.span.merge(suffix_span);
            expression = Expression {
                kind: ExpressionKind::Call(Call {
                    function: Box::new(expression),
                    arguments,
                }),
                span,
            };
        }

        Ok(expression)
    }

    fn parse_primary_expr(pair: Pair<Rule>, src: &str) -> ParseResult<Expression> {
        let span = Self::extract_span(&pair);

        let kind = match pair.as_rule() {
            Rule::integer => ExpressionKind::Integer(Self::parse_integer(pair, src)?),
            Rule::number => ExpressionKind::Number(Self::parse_number(pair, src)?),
            Rule::string => ExpressionKind::String(Self::parse_string(pair, src)?),
            Rule::identifier => ExpressionKind::Identifier(Self::parse_identifier(pair)),
            Rule::constant => match pair.into_inner().next().unwrap().as_rule() {
                Rule::keyword_true => ExpressionKind::Boolean(true),
                Rule::keyword_false => ExpressionKind::Boolean(false),
                _ => ExpressionKind::Null,
            },
            Rule::braced_expr => {
                let inner = pair.into_inner().next().unwrap();
                ExpressionKind::Parenthesized(Box::new(Self::parse_expression_from_pair(
                    inner, src,
                )?))
            }
            Rule::block => {
                let expressions = pair
                    .into_inner()
                    .map(|expr| Self::parse_expression_from_pair(expr, src))
                    .collect::<ParseResult<Vec<_>>>()?;
                ExpressionKind::Block(Block { expressions })
            }
            Rule::function_definition => {
                ExpressionKind::Function(Self::parse_function_definition(pair, src)?)
            }
            Rule::if_expression => ExpressionKind::If(Self::parse_if_expression(pair, src)?),
            Rule::while_loop => {
                let mut inner_pairs = pair.into_inner();
                let condition = Self::parse_expression_from_pair(inner_pairs.next().unwrap(), src)?;
                let body = Self::parse_expression_from_pair(inner_pairs.next().unwrap(), src)?;
                ExpressionKind::While(WhileLoop {
                    condition: Box::new(condition),
                    body: Box::new(body),
                })
            }
            rule => unreachable!("Unexpected primary expression rule: {:?}", rule),
        };

        Ok(Expression { kind, span })
    }

    fn parse_argument_list(pair: Pair<Rule>, src: &str) -> ParseResult<Vec<Argument>> {
        pair.into_inner()
            .map(|argument| {
                let span = Self::extract_span(&argument);
                let inner = argument.into_inner().next().unwrap();

                match inner.as_rule() {
                    Rule::named_argument => {
                        let mut inner_pairs = inner.into_inner();
                        let name_pair = inner_pairs.next().unwrap().into_inner().next().unwrap();
                        let name = match name_pair.as_rule() {
                            Rule::string => Self::parse_string(name_pair, src)?,
                            _ => Self::parse_identifier(name_pair),
                        };
                        let value =
                            Self::parse_expression_from_pair(inner_pairs.next().unwrap(), src)?;
                        Ok(Argument {
                            name: Some(name),
                            value,
                            span,
                        })
                    }
                    _ => Ok(Argument {
                        name: None,
                        value: Self::parse_expression_from_pair(inner, src)?,
                        span,
                    }),
                }
            })
            .collect()
    }

    fn parse_function_definition(pair: Pair<Rule>, src: &str) -> ParseResult<FunctionDefinition> {
        let mut parameters = Vec::new();
        let mut body = None;

        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::parameter_list => {
                    for parameter in inner.into_inner() {
                        let span = Self::extract_span(&parameter);
                        let mut parts = parameter.into_inner();
                        let name = Self::parse_identifier(parts.next().unwrap());
                        let default = parts
                            .next()
                            .map(|default| Self::parse_expression_from_pair(default, src))
                            .transpose()?;
                        parameters.push(Parameter {
                            name,
                            default,
                            span,
                        });
                    }
                }
                _ => body = Some(Self::parse_expression_from_pair(inner, src)?),
            }
        }

        Ok(FunctionDefinition {
            parameters,
            body: Box::new(body.unwrap()),
        })
    }

    fn parse_if_expression(pair: Pair<Rule>, src: &str) -> ParseResult<IfExpression> {
        let mut inner_pairs = pair.into_inner();

        let condition = Self::parse_expression_from_pair(inner_pairs.next().unwrap(), src)?;
        let then_branch = Self::parse_expression_from_pair(inner_pairs.next().unwrap(), src)?;

        let else_branch = match inner_pairs.next() {
            Some(else_clause) => {
                let else_pair = else_clause.into_inner().next().unwrap();
                Some(Box::new(Self::parse_expression_from_pair(else_pair, src)?))
            }
            None => None,
        };

        Ok(IfExpression {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch,
        })
    }
}
