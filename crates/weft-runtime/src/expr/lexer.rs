//! Expression tokenizer.

use super::ExprError;

/// One lexed token.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Number(f64),
    String(String),
    True,
    False,
    Null,
    /// Inner path of a `${...}` reference.
    Reference(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Bang,
    LParen,
    RParen,
}

/// Lexes an expression into tokens.
pub(crate) fn lex(input: &str) -> Result<Vec<Token>, ExprError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos] as char;
        match c {
            ' ' | '\t' | '\r' | '\n' => pos += 1,
            '(' => {
                tokens.push(Token::LParen);
                pos += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                pos += 1;
            }
            '+' => {
                tokens.push(Token::Plus);
                pos += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                pos += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                pos += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                pos += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                pos += 1;
            }
            '=' => {
                if bytes.get(pos + 1) == Some(&b'=') {
                    tokens.push(Token::EqEq);
                    pos += 2;
                } else {
                    return Err(syntax(pos, "assignment is not supported, use `==`"));
                }
            }
            '!' => {
                if bytes.get(pos + 1) == Some(&b'=') {
                    tokens.push(Token::NotEq);
                    pos += 2;
                } else {
                    tokens.push(Token::Bang);
                    pos += 1;
                }
            }
            '<' => {
                if bytes.get(pos + 1) == Some(&b'=') {
                    tokens.push(Token::Le);
                    pos += 2;
                } else {
                    tokens.push(Token::Lt);
                    pos += 1;
                }
            }
            '>' => {
                if bytes.get(pos + 1) == Some(&b'=') {
                    tokens.push(Token::Ge);
                    pos += 2;
                } else {
                    tokens.push(Token::Gt);
                    pos += 1;
                }
            }
            '&' => {
                if bytes.get(pos + 1) == Some(&b'&') {
                    tokens.push(Token::AndAnd);
                    pos += 2;
                } else {
                    return Err(syntax(pos, "expected `&&`"));
                }
            }
            '|' => {
                if bytes.get(pos + 1) == Some(&b'|') {
                    tokens.push(Token::OrOr);
                    pos += 2;
                } else {
                    return Err(syntax(pos, "expected `||`"));
                }
            }
            '$' => {
                if bytes.get(pos + 1) != Some(&b'{') {
                    return Err(syntax(pos, "expected `${` to open a reference"));
                }
                let start = pos + 2;
                let end = input[start..]
                    .find('}')
                    .ok_or_else(|| syntax(pos, "unterminated reference"))?;
                tokens.push(Token::Reference(input[start..start + end].to_owned()));
                pos = start + end + 1;
            }
            '\'' | '"' => {
                let (string, next) = lex_string(input, pos, c)?;
                tokens.push(Token::String(string));
                pos = next;
            }
            c if c.is_ascii_digit() => {
                let (number, next) = lex_number(input, pos)?;
                tokens.push(Token::Number(number));
                pos = next;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = pos;
                while pos < bytes.len()
                    && ((bytes[pos] as char).is_ascii_alphanumeric() || bytes[pos] == b'_')
                {
                    pos += 1;
                }
                match &input[start..pos] {
                    "true" => tokens.push(Token::True),
                    "false" => tokens.push(Token::False),
                    "null" => tokens.push(Token::Null),
                    word => {
                        return Err(syntax(
                            start,
                            format!("unexpected identifier `{word}`; references use `${{...}}`"),
                        ));
                    }
                }
            }
            other => {
                return Err(syntax(pos, format!("unexpected character `{other}`")));
            }
        }
    }

    Ok(tokens)
}

fn lex_string(input: &str, open: usize, quote: char) -> Result<(String, usize), ExprError> {
    let mut out = String::new();
    let mut chars = input[open + 1..].char_indices();

    while let Some((offset, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, escaped)) => out.push(escaped),
                None => return Err(ExprError::UnexpectedEnd),
            },
            c if c == quote => return Ok((out, open + 1 + offset + c.len_utf8())),
            c => out.push(c),
        }
    }

    Err(syntax(open, "unterminated string literal"))
}

fn lex_number(input: &str, start: usize) -> Result<(f64, usize), ExprError> {
    let bytes = input.as_bytes();
    let mut pos = start;
    let mut seen_dot = false;

    while pos < bytes.len() {
        match bytes[pos] {
            b'0'..=b'9' => pos += 1,
            // A dot is part of the number only when digits follow; this
            // keeps `1.` from swallowing path-like typos.
            b'.' if !seen_dot && bytes.get(pos + 1).is_some_and(u8::is_ascii_digit) => {
                seen_dot = true;
                pos += 1;
            }
            _ => break,
        }
    }

    input[start..pos]
        .parse::<f64>()
        .map(|n| (n, pos))
        .map_err(|e| syntax(start, e.to_string()))
}

fn syntax(position: usize, message: impl Into<String>) -> ExprError {
    ExprError::Syntax {
        position,
        message: message.into(),
    }
}
