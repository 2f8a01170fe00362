//! Expression evaluation.

use serde_json::Value;

use super::parser::number_value;
use super::{BinaryOp, Expr, ExprError, UnaryOp};
use crate::value::VariableResolver;

/// Truthiness of a value: `false`, `null`, `0`, and `""` are falsy,
/// everything else (including empty containers) is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Evaluates an expression tree against resolved envelopes.
pub(crate) fn evaluate(expr: &Expr, resolver: &VariableResolver<'_>) -> Result<Value, ExprError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Reference(path) => Ok(resolver.resolve_path(path)?),
        Expr::Unary { op, operand } => {
            let value = evaluate(operand, resolver)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!is_truthy(&value))),
                UnaryOp::Neg => {
                    let n = as_number(&value).ok_or_else(|| {
                        ExprError::Type(format!("cannot negate {}", type_name(&value)))
                    })?;
                    Ok(number_value(-n))
                }
            }
        }
        Expr::Binary { op, left, right } => match op {
            // Boolean connectives short-circuit: the right side is not
            // evaluated (and its references not resolved) when the left
            // side already decides.
            BinaryOp::And => {
                let lhs = evaluate(left, resolver)?;
                if !is_truthy(&lhs) {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(is_truthy(&evaluate(right, resolver)?)))
            }
            BinaryOp::Or => {
                let lhs = evaluate(left, resolver)?;
                if is_truthy(&lhs) {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(is_truthy(&evaluate(right, resolver)?)))
            }
            _ => {
                let lhs = evaluate(left, resolver)?;
                let rhs = evaluate(right, resolver)?;
                apply_binary(*op, &lhs, &rhs)
            }
        },
    }
}

fn apply_binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, ExprError> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(values_equal(lhs, rhs))),
        BinaryOp::Ne => Ok(Value::Bool(!values_equal(lhs, rhs))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare(lhs, rhs, op)?;
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            }))
        }
        BinaryOp::Add => match (lhs, rhs) {
            (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{a}{b}"))),
            _ => arithmetic(op, lhs, rhs),
        },
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => arithmetic(op, lhs, rhs),
        BinaryOp::And | BinaryOp::Or => unreachable!("short-circuited in evaluate"),
    }
}

fn arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, ExprError> {
    let (a, b) = match (as_number(lhs), as_number(rhs)) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            return Err(ExprError::Type(format!(
                "arithmetic needs numbers, got {} and {}",
                type_name(lhs),
                type_name(rhs)
            )));
        }
    };
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if b == 0.0 {
                return Err(ExprError::DivisionByZero);
            }
            a / b
        }
        BinaryOp::Rem => {
            if b == 0.0 {
                return Err(ExprError::DivisionByZero);
            }
            a % b
        }
        _ => unreachable!("non-arithmetic op routed to arithmetic"),
    };
    Ok(number_value(result))
}

fn compare(lhs: &Value, rhs: &Value, op: BinaryOp) -> Result<std::cmp::Ordering, ExprError> {
    match (lhs, rhs) {
        (Value::Number(_), Value::Number(_)) => {
            let (a, b) = (as_number(lhs), as_number(rhs));
            match (a, b) {
                (Some(a), Some(b)) => a.partial_cmp(&b).ok_or_else(|| {
                    ExprError::Type("numbers are not comparable".into())
                }),
                _ => Err(ExprError::Type("numbers are not comparable".into())),
            }
        }
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        _ => Err(ExprError::Type(format!(
            "{:?} cannot compare {} and {}",
            op,
            type_name(lhs),
            type_name(rhs)
        ))),
    }
}

/// Equality with numeric normalization so `1 == 1.0` holds.
fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (as_number(lhs), as_number(rhs)) {
        (Some(a), Some(b)) => a == b,
        _ => lhs == rhs,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    value.as_f64()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
