// Tether Parser
// Pest-driven parser producing the AST in `crate::ast`

use pest::Parser;
use pest_derive::Parser;

use crate::ast::*;
use crate::error::*;

mod expressions;
mod literals;

#[derive(Parser)]
#[grammar = "grammar.pest"]
pub struct TetherParser;

impl TetherParser {
    /// Parse a whole source text into a program of top-level expressions
    pub fn parse_program(input: &str) -> ParseResult<Program> {
        let mut pairs = Self::parse(Rule::program, input)
            .map_err(|e| ParseError::from_pest_error(e, input))?;
        let program_pair = pairs.next().unwrap();
        let span = Self::extract_span(&program_pair);

        let mut expressions = Vec::new();
        for pair in program_pair.into_inner() {
            if pair.as_rule() == Rule::expression {
                expressions.push(Self::parse_expression_from_pair(pair, input)?);
            }
        }

        Ok(Program { expressions, span })
    }

    /// Parse input that must consist of exactly one expression
    pub fn parse_expression(input: &str) -> ParseResult<Expression> {
        let mut pairs = Self::parse(Rule::single_expression, input)
            .map_err(|e| ParseError::from_pest_error(e, input))?;
        let single = pairs.next().unwrap();
        let expression_pair = single
            .into_inner()
            .find(|pair| pair.as_rule() == Rule::expression)
            .unwrap();

        Self::parse_expression_from_pair(expression_pair, input)
    }

    pub(crate) fn extract_span(pair: &pest::iterators::Pair<Rule>) -> Span {
        let span = pair.as_span();
        Span::new(span.start(), span.end())
    }
}
