//! Tokenizer for the expression language.

use crate::error::ExpressionError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Ident(String),
    Str(String),
    Number(String),
    Dot,
    Comma,
    LParen,
    RParen,
    Eq,
    NotEq,
    Gt,
    Lt,
    GtEq,
    LtEq,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

impl Token {
    /// True when the token is the given keyword (case-insensitive).
    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(&self.kind, TokenKind::Ident(name) if name.eq_ignore_ascii_case(keyword))
    }

    pub fn describe(&self) -> String {
        match &self.kind {
            TokenKind::Ident(name) => name.clone(),
            TokenKind::Str(value) => format!("'{value}'"),
            TokenKind::Number(value) => value.clone(),
            TokenKind::Dot => ".".to_string(),
            TokenKind::Comma => ",".to_string(),
            TokenKind::LParen => "(".to_string(),
            TokenKind::RParen => ")".to_string(),
            TokenKind::Eq => "=".to_string(),
            TokenKind::NotEq => "<>".to_string(),
            TokenKind::Gt => ">".to_string(),
            TokenKind::Lt => "<".to_string(),
            TokenKind::GtEq => ">=".to_string(),
            TokenKind::LtEq => "<=".to_string(),
        }
    }
}

pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, ExpressionError> {
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut tokens = Vec::new();
    let mut idx = 0;

    while idx < chars.len() {
        let (position, ch) = chars[idx];
        if ch.is_whitespace() {
            idx += 1;
            continue;
        }

        let single = match ch {
            '.' => Some(TokenKind::Dot),
            ',' => Some(TokenKind::Comma),
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            '=' => Some(TokenKind::Eq),
            _ => None,
        };
        if let Some(kind) = single {
            tokens.push(Token { kind, position });
            idx += 1;
            continue;
        }

        let next = chars.get(idx + 1).map(|(_, c)| *c);
        match ch {
            '<' | '>' | '!' => {
                let (kind, width) = match (ch, next) {
                    ('<', Some('>')) | ('!', Some('=')) => (TokenKind::NotEq, 2),
                    ('<', Some('=')) => (TokenKind::LtEq, 2),
                    ('>', Some('=')) => (TokenKind::GtEq, 2),
                    ('<', _) => (TokenKind::Lt, 1),
                    ('>', _) => (TokenKind::Gt, 1),
                    _ => return Err(ExpressionError::UnexpectedChar { found: ch, position }),
                };
                tokens.push(Token { kind, position });
                idx += width;
            }
            '\'' | '"' => {
                let quote = ch;
                let mut value = String::new();
                let mut cursor = idx + 1;
                let mut closed = false;
                while cursor < chars.len() {
                    let c = chars[cursor].1;
                    if c == quote {
                        // doubled quote is an escaped quote
                        if chars.get(cursor + 1).map(|(_, n)| *n) == Some(quote) {
                            value.push(quote);
                            cursor += 2;
                            continue;
                        }
                        closed = true;
                        cursor += 1;
                        break;
                    }
                    value.push(c);
                    cursor += 1;
                }
                if !closed {
                    return Err(ExpressionError::UnterminatedString { position });
                }
                tokens.push(Token {
                    kind: TokenKind::Str(value),
                    position,
                });
                idx = cursor;
            }
            c if c.is_ascii_digit()
                || (c == '-' && next.is_some_and(|n| n.is_ascii_digit()) && !follows_value(&tokens)) =>
            {
                let mut value = String::new();
                value.push(c);
                let mut cursor = idx + 1;
                let mut seen_dot = false;
                while cursor < chars.len() {
                    let d = chars[cursor].1;
                    if d.is_ascii_digit() {
                        value.push(d);
                    } else if d == '.'
                        && !seen_dot
                        && chars.get(cursor + 1).is_some_and(|(_, n)| n.is_ascii_digit())
                    {
                        seen_dot = true;
                        value.push(d);
                    } else {
                        break;
                    }
                    cursor += 1;
                }
                tokens.push(Token {
                    kind: TokenKind::Number(value),
                    position,
                });
                idx = cursor;
            }
            c if c.is_alphabetic() || c == '_' || c == '@' => {
                let mut value = String::new();
                let mut cursor = idx;
                while cursor < chars.len() {
                    let d = chars[cursor].1;
                    if d.is_alphanumeric() || d == '_' || d == '@' || d == '-' {
                        value.push(d);
                        cursor += 1;
                    } else {
                        break;
                    }
                }
                tokens.push(Token {
                    kind: TokenKind::Ident(value),
                    position,
                });
                idx = cursor;
            }
            _ => return Err(ExpressionError::UnexpectedChar { found: ch, position }),
        }
    }

    Ok(tokens)
}

/// A '-' right after a value-like token is not the start of a negative number.
fn follows_value(tokens: &[Token]) -> bool {
    matches!(
        tokens.last().map(|t| &t.kind),
        Some(TokenKind::Ident(_) | TokenKind::Number(_) | TokenKind::Str(_) | TokenKind::RParen)
    )
}
