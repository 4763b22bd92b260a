// Tether Parser Error Handling
// Error reporting with miette integration

use crate::parser::Rule;
use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

/// Main parse error type with miette integration
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Parse error: {message}")]
    #[diagnostic(
        code(tether::parse::syntax_error),
        help("Check the syntax near the highlighted location")
    )]
    Syntax {
        #[source_code]
        src: String,
        #[label("error occurred here")]
        span: SourceSpan,
        message: String,
        /// The input ended before the expression was complete
        incomplete: bool,
    },

    #[error("Invalid number literal")]
    #[diagnostic(
        code(tether::parse::invalid_number),
        help("Numbers look like 42, 2.5, 1e-3 or 10L")
    )]
    InvalidNumber {
        #[source_code]
        src: String,
        #[label("invalid number")]
        span: SourceSpan,
        found: String,
    },

    #[error("Invalid string escape sequence")]
    #[diagnostic(
        code(tether::parse::invalid_string_escape),
        help("Valid escape sequences: \\n, \\t, \\r, \\0, \\\\, \\\", \\'")
    )]
    InvalidStringEscape {
        #[source_code]
        src: String,
        #[label("invalid escape sequence")]
        span: SourceSpan,
        found: String,
    },

    #[error("Expected a single expression, found {found}")]
    #[diagnostic(
        code(tether::parse::not_single_expression),
        help("Separate statements belong in a `{{ ... }}` block")
    )]
    NotSingleExpression {
        #[source_code]
        src: String,
        found: usize,
    },
}

impl ParseError {
    /// Create a parse error from a Pest parsing error
    pub fn from_pest_error(error: pest::error::Error<Rule>, src: &str) -> Self {
        let (span, offset) = match error.location {
            pest::error::InputLocation::Pos(pos) => (SourceSpan::new(pos.into(), 0), pos),
            pest::error::InputLocation::Span((start, end)) => {
                (SourceSpan::new(start.into(), end - start), end)
            }
        };

        let message = match &error.variant {
            pest::error::ErrorVariant::ParsingError { positives, .. } if !positives.is_empty() => {
                let expected: Vec<&str> = positives.iter().map(rule_description).collect();
                format!("expected {}", expected.join(" or "))
            }
            pest::error::ErrorVariant::ParsingError { .. } => "unexpected input".to_string(),
            pest::error::ErrorVariant::CustomError { message } => message.clone(),
        };

        // Unterminated input fails at its (trimmed) end
        let incomplete = offset >= src.trim_end().len();

        ParseError::Syntax {
            src: src.to_string(),
            span,
            message,
            incomplete,
        }
    }

    /// Create an invalid number error
    pub fn invalid_number(src: String, span: SourceSpan, found: String) -> Self {
        ParseError::InvalidNumber { src, span, found }
    }

    /// Create an invalid string escape error
    pub fn invalid_string_escape(src: String, span: SourceSpan, found: String) -> Self {
        ParseError::InvalidStringEscape { src, span, found }
    }

    /// True when more input could turn this failure into a successful parse.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, ParseError::Syntax { incomplete: true, .. })
    }
}

/// Result type for parsing operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Convert a parser rule to a user-friendly description
fn rule_description(rule: &Rule) -> &'static str {
    match rule {
        Rule::expression => "an expression",
        Rule::postfix_expr => "an expression",
        Rule::call_suffix => "an argument list",
        Rule::argument_list | Rule::argument | Rule::named_argument => "an argument",
        Rule::argument_name => "an argument name",
        Rule::braced_expr => "a parenthesized expression",
        Rule::block => "a block ({ ... })",
        Rule::function_definition => "a function definition",
        Rule::parameter_list | Rule::parameter => "a parameter",
        Rule::if_expression => "an if expression",
        Rule::else_clause => "an else branch",
        Rule::while_loop => "a while loop",
        Rule::constant => "TRUE, FALSE or NULL",
        Rule::identifier | Rule::plain_identifier | Rule::quoted_identifier => "an identifier",
        Rule::integer => "an integer (like 10L)",
        Rule::number => "a number",
        Rule::string => "a string",
        Rule::op_assign => "`<-`",
        Rule::op_logical_or => "`||`",
        Rule::op_logical_and => "`&&`",
        Rule::op_equal => "`==`",
        Rule::op_not_equal => "`!=`",
        Rule::op_less_equal => "`<=`",
        Rule::op_greater_equal => "`>=`",
        Rule::op_less => "`<`",
        Rule::op_greater => "`>`",
        Rule::op_add | Rule::op_unary_plus => "`+`",
        Rule::op_subtract | Rule::op_unary_minus => "`-`",
        Rule::op_multiply => "`*`",
        Rule::op_divide => "`/`",
        Rule::op_exponent => "`^`",
        Rule::op_not => "`!`",
        Rule::EOI => "end of input",
        _ => "valid syntax",
    }
}
