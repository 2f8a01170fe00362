//! Expression parser.
//!
//! Precedence climbing over the token stream. Binding strength, loosest
//! first: `||`, `&&`, equality, comparison, additive, multiplicative,
//! unary, primary.

use serde_json::Value;

use super::lexer::Token;
use super::{BinaryOp, Expr, ExprError, UnaryOp};

/// Parses a token stream into an expression tree.
pub(crate) fn parse(tokens: &[Token]) -> Result<Expr, ExprError> {
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expression(0)?;
    if parser.pos < tokens.len() {
        return Err(ExprError::Syntax {
            position: parser.pos,
            message: format!("unexpected trailing token {:?}", tokens[parser.pos]),
        });
    }
    Ok(expr)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl Parser<'_> {
    fn expression(&mut self, min_binding: u8) -> Result<Expr, ExprError> {
        let mut left = self.unary()?;

        while let Some(op) = self.peek().and_then(binary_op) {
            let binding = binding_power(op);
            if binding < min_binding {
                break;
            }
            self.pos += 1;
            // All operators are left-associative: parse the right side at
            // one level tighter.
            let right = self.expression(binding + 1)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        match self.peek() {
            Some(Token::Bang) => {
                self.pos += 1;
                Ok(Expr::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(self.unary()?),
                })
            }
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(self.unary()?),
                })
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        let token = self.peek().ok_or(ExprError::UnexpectedEnd)?.clone();
        self.pos += 1;
        match token {
            Token::Number(n) => Ok(Expr::Literal(number_value(n))),
            Token::String(s) => Ok(Expr::Literal(Value::String(s))),
            Token::True => Ok(Expr::Literal(Value::Bool(true))),
            Token::False => Ok(Expr::Literal(Value::Bool(false))),
            Token::Null => Ok(Expr::Literal(Value::Null)),
            Token::Reference(path) => Ok(Expr::Reference(path)),
            Token::LParen => {
                let inner = self.expression(0)?;
                match self.peek() {
                    Some(Token::RParen) => {
                        self.pos += 1;
                        Ok(inner)
                    }
                    Some(_) => Err(ExprError::Syntax {
                        position: self.pos,
                        message: "expected `)`".into(),
                    }),
                    None => Err(ExprError::UnexpectedEnd),
                }
            }
            other => Err(ExprError::Syntax {
                position: self.pos - 1,
                message: format!("unexpected token {other:?}"),
            }),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }
}

fn binary_op(token: &Token) -> Option<BinaryOp> {
    Some(match token {
        Token::OrOr => BinaryOp::Or,
        Token::AndAnd => BinaryOp::And,
        Token::EqEq => BinaryOp::Eq,
        Token::NotEq => BinaryOp::Ne,
        Token::Lt => BinaryOp::Lt,
        Token::Le => BinaryOp::Le,
        Token::Gt => BinaryOp::Gt,
        Token::Ge => BinaryOp::Ge,
        Token::Plus => BinaryOp::Add,
        Token::Minus => BinaryOp::Sub,
        Token::Star => BinaryOp::Mul,
        Token::Slash => BinaryOp::Div,
        Token::Percent => BinaryOp::Rem,
        _ => return None,
    })
}

fn binding_power(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Or => 1,
        BinaryOp::And => 2,
        BinaryOp::Eq | BinaryOp::Ne => 3,
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 4,
        BinaryOp::Add | BinaryOp::Sub => 5,
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 6,
    }
}

/// Converts a lexed number into a JSON value, preferring integers when
/// the value is whole so `2 + 3` stays `5` rather than `5.0`.
pub(crate) fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < (1i64 << 53) as f64 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}
