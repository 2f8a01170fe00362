//! The condition expression language.
//!
//! A minimal, safe boolean/arithmetic evaluator for conditional nodes:
//! literals, `${...}` references, unary `!`/`-`, arithmetic, comparisons,
//! and short-circuiting boolean connectives. No tool calls, no variable
//! mutation, no general scripting.

use serde_json::Value;
use thiserror::Error;

use crate::value::{EnvelopeMap, ResolveError, VariableResolver};

mod eval;
mod lexer;
mod parser;

pub use eval::is_truthy;

/// Errors raised while evaluating a condition expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    /// The expression does not lex or parse.
    #[error("syntax error at offset {position}: {message}")]
    Syntax {
        /// Byte offset of the defect.
        position: usize,
        /// What was wrong.
        message: String,
    },

    /// The expression ended mid-construct.
    #[error("unexpected end of expression")]
    UnexpectedEnd,

    /// An operator was applied to operands it cannot handle.
    #[error("type error: {0}")]
    Type(String),

    /// Division or remainder by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// A `${...}` reference could not be dereferenced.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Literal(Value),
    Reference(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// Evaluates an expression against the envelope map.
pub fn evaluate(expression: &str, envelopes: &EnvelopeMap) -> Result<Value, ExprError> {
    let tokens = lexer::lex(expression)?;
    let expr = parser::parse(&tokens)?;
    let resolver = VariableResolver::new(envelopes);
    eval::evaluate(&expr, &resolver)
}

/// Evaluates an expression and coerces the result to a boolean.
///
/// Non-boolean results follow the data model's truthiness: `false`,
/// `null`, `0`, and `""` are falsy, everything else is truthy.
pub fn evaluate_condition(expression: &str, envelopes: &EnvelopeMap) -> Result<bool, ExprError> {
    Ok(is_truthy(&evaluate(expression, envelopes)?))
}
