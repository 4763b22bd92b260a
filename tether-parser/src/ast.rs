// Tether AST Definitions
// Abstract Syntax Tree nodes with source spans

use std::fmt;

/// Source position information for AST nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both `self` and `other`
    pub fn merge(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Span> for miette::SourceSpan {
    fn from(span: Span) -> Self {
        miette::SourceSpan::new(span.start.into(), span.len())
    }
}

/// A parsed source text: a sequence of top-level expressions
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub expressions: Vec<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    Null,
    Boolean(bool),
    Number(f64),
    Integer(i64),
    String(String),
    Identifier(String),
    Call(Call),
    BinaryOp(BinaryOperation),
    UnaryOp(UnaryOperation),
    Function(FunctionDefinition),
    If(IfExpression),
    While(WhileLoop),
    Block(Block),
    Parenthesized(Box<Expression>),
}

/// Function application: `callee(arg, name = arg)`
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub function: Box<Expression>,
    pub arguments: Vec<Argument>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: Option<String>,
    pub value: Expression,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryOperation {
    pub left: Box<Expression>,
    pub operator: BinaryOperator,
    pub right: Box<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Assign,
    LogicalOr,
    LogicalAnd,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Exponent,
}

impl BinaryOperator {
    /// The function name the operator is applied as
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Assign => "<-",
            BinaryOperator::LogicalOr => "||",
            BinaryOperator::LogicalAnd => "&&",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Exponent => "^",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryOperation {
    pub operator: UnaryOperator,
    pub operand: Box<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Minus,
    Plus,
}

impl UnaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOperator::Not => "!",
            UnaryOperator::Minus => "-",
            UnaryOperator::Plus => "+",
        }
    }
}

/// `function(a, b = 1) body`
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefinition {
    pub parameters: Vec<Parameter>,
    pub body: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub default: Option<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfExpression {
    pub condition: Box<Expression>,
    pub then_branch: Box<Expression>,
    pub else_branch: Option<Box<Expression>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileLoop {
    pub condition: Box<Expression>,
    pub body: Box<Expression>,
}

/// `{ expr; expr }`
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub expressions: Vec<Expression>,
}

// Source-like rendering, used for diagnostics and the CLI's `parse` output.

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExpressionKind::Null => write!(f, "NULL"),
            ExpressionKind::Boolean(true) => write!(f, "TRUE"),
            ExpressionKind::Boolean(false) => write!(f, "FALSE"),
            ExpressionKind::Number(n) => write!(f, "{}", n),
            ExpressionKind::Integer(n) => write!(f, "{}L", n),
            ExpressionKind::String(s) => write!(f, "{:?}", s),
            ExpressionKind::Identifier(name) => write!(f, "{}", name),
            ExpressionKind::Call(call) => {
                write!(f, "{}(", call.function)?;
                for (i, arg) in call.arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    if let Some(name) = &arg.name {
                        write!(f, "{} = ", name)?;
                    }
                    write!(f, "{}", arg.value)?;
                }
                write!(f, ")")
            }
            ExpressionKind::BinaryOp(op) => {
                write!(f, "{} {} {}", op.left, op.operator.symbol(), op.right)
            }
            ExpressionKind::UnaryOp(op) => write!(f, "{}{}", op.operator.symbol(), op.operand),
            ExpressionKind::Function(def) => {
                write!(f, "function(")?;
                for (i, param) in def.parameters.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", param.name)?;
                    if let Some(default) = &param.default {
                        write!(f, " = {}", default)?;
                    }
                }
                write!(f, ") {}", def.body)
            }
            ExpressionKind::If(if_expr) => {
                write!(f, "if ({}) {}", if_expr.condition, if_expr.then_branch)?;
                if let Some(else_branch) = &if_expr.else_branch {
                    write!(f, " else {}", else_branch)?;
                }
                Ok(())
            }
            ExpressionKind::While(while_loop) => {
                write!(f, "while ({}) {}", while_loop.condition, while_loop.body)
            }
            ExpressionKind::Block(block) => {
                write!(f, "{{")?;
                for (i, expr) in block.expressions.iter().enumerate() {
                    if i > 0 {
                        write!(f, ";")?;
                    }
                    write!(f, " {}", expr)?;
                }
                write!(f, " }}")
            }
            ExpressionKind::Parenthesized(inner) => write!(f, "({})", inner),
        }
    }
}
