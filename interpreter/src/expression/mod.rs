//! The expression language used for expression values.
//!
//! Expression text is opaque to the document parser. It is handed to an
//! [`ExpressionEvaluator`] each time a compiled value runs, so syntax errors
//! surface as runtime errors at that point.

mod evaluator;
mod parser;

use mixdown::{Context, RuntimeError, RuntimeValue};

pub use evaluator::evaluate;
pub use parser::parse;

/// Evaluates expression code against a runtime context.
pub trait ExpressionEvaluator: Send + Sync {
    fn evaluate(&self, code: &str, context: &Context) -> Result<RuntimeValue, RuntimeError>;
}

impl<F> ExpressionEvaluator for F
where
    F: Fn(&str, &Context) -> Result<RuntimeValue, RuntimeError> + Send + Sync,
{
    fn evaluate(&self, code: &str, context: &Context) -> Result<RuntimeValue, RuntimeError> {
        self(code, context)
    }
}

/// The built-in evaluator: a JavaScript-flavoured expression subset.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator;

impl ExpressionEvaluator for Evaluator {
    fn evaluate(&self, code: &str, context: &Context) -> Result<RuntimeValue, RuntimeError> {
        let expr = parse(code)?;
        evaluate(&expr, context, 0)
    }
}

// ---------------------------------------------------------------------------
// AST
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    Identifier(String),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    /// `object.property`
    Member { object: Box<Expr>, property: String },
    /// `object[index]`
    Index { object: Box<Expr>, index: Box<Expr> },
    Call { callee: Box<Expr>, arguments: Vec<Expr> },
    Unary { operator: UnaryOperator, operand: Box<Expr> },
    Binary { operator: BinaryOperator, left: Box<Expr>, right: Box<Expr> },
    Conditional { condition: Box<Expr>, then: Box<Expr>, otherwise: Box<Expr> },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOperator {
    Negation,
    LogicalNot,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOperator {
    Addition,
    Subtraction,
    Multiplication,
    Division,
    Modulo,
    Equality,
    Inequality,
    StrictEquality,
    StrictInequality,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    LogicalAnd,
    LogicalOr,
}
