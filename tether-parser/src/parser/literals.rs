// Literal parsing module
// Numbers, strings, identifiers

use miette::SourceSpan;
use pest::iterators::Pair;

use crate::error::*;
use crate::parser::{Rule, TetherParser};

impl TetherParser {
    /// Parse an integer literal such as `10L`
    pub(crate) fn parse_integer(pair: Pair<Rule>, src: &str) -> ParseResult<i64> {
        let text = pair.as_str();
        let digits = text.trim_end_matches('L');

        digits.parse::<i64>().map_err(|_| {
            ParseError::invalid_number(
                src.to_string(),
                Self::extract_span(&pair).into(),
                text.to_string(),
            )
        })
    }

    /// Parse a double literal such as `2.5` or `1e-3`
    pub(crate) fn parse_number(pair: Pair<Rule>, src: &str) -> ParseResult<f64> {
        let text = pair.as_str();

        text.parse::<f64>().map_err(|_| {
            ParseError::invalid_number(
                src.to_string(),
                Self::extract_span(&pair).into(),
                text.to_string(),
            )
        })
    }

    /// Parse a quoted string literal, processing escape sequences
    pub(crate) fn parse_string(pair: Pair<Rule>, src: &str) -> ParseResult<String> {
        let content = pair.into_inner().next().unwrap();
        let base = content.as_span().start();
        let raw = content.as_str();

        let mut result = String::with_capacity(raw.len());
        let mut chars = raw.char_indices();

        while let Some((offset, ch)) = chars.next() {
            if ch != '\\' {
                result.push(ch);
                continue;
            }

            let escaped = chars.next().map(|(_, c)| c);
            match escaped {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('r') => result.push('\r'),
                Some('0') => result.push('\0'),
                Some('\\') => result.push('\\'),
                Some('"') => result.push('"'),
                Some('\'') => result.push('\''),
                other => {
                    let found = match other {
                        Some(c) => format!("\\{}", c),
                        None => "\\".to_string(),
                    };
                    let span = SourceSpan::new((base + offset).into(), found.len());
                    return Err(ParseError::invalid_string_escape(
                        src.to_string(),
                        span,
                        found,
                    ));
                }
            }
        }

        Ok(result)
    }

    /// Parse an identifier, unwrapping backtick quoting
    pub(crate) fn parse_identifier(pair: Pair<Rule>) -> String {
        let inner = pair.into_inner().next().unwrap();

        match inner.as_rule() {
            Rule::quoted_identifier => inner.into_inner().next().unwrap().as_str().to_string(),
            _ => inner.as_str().to_string(),
        }
    }
}
