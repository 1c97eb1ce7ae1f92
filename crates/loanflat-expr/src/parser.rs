//! Recursive-descent parser for contract expressions.
//!
//! # Grammar
//!
//! ```text
//! expr       := [CASE] clause+ [ELSE literal] [END]
//! clause     := WHEN cond THEN literal
//! cond       := and_cond (OR and_cond)*
//! and_cond   := atom (AND atom)*
//! atom       := '(' cond ')' | comparison
//! comparison := operand op (literal | operand)
//!             | operand [NOT] LIKE string
//!             | operand IS [NOT] (EMPTY | NULL)
//! operand    := ident ['.' ident]
//! literal    := string | number | NULL
//! ```
//!
//! AND binds tighter than OR. Members of an AND/OR chain are kept in source
//! order and evaluated left to right. `IN` lists are rejected.

use crate::ast::{
    CompareOp, Comparison, Condition, Expression, LikePattern, Literal, Operand, Value, WhenClause,
};
use crate::error::ExpressionError;
use crate::token::{Token, TokenKind, tokenize};

/// Parse expression text into an [`Expression`].
pub fn parse_expression(source: &str) -> Result<Expression, ExpressionError> {
    if source.trim().is_empty() {
        return Err(ExpressionError::Empty);
    }
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens, cursor: 0 };
    let expression = parser.expression()?;
    if let Some(token) = parser.peek() {
        return Err(unexpected("end of expression", token));
    }
    Ok(expression)
}

struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor)
    }

    fn next(&mut self, expected: &'static str) -> Result<Token, ExpressionError> {
        let token = self
            .tokens
            .get(self.cursor)
            .cloned()
            .ok_or(ExpressionError::UnexpectedEnd { expected })?;
        self.cursor += 1;
        Ok(token)
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(keyword))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.at_keyword(keyword) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &'static str) -> Result<(), ExpressionError> {
        let token = self.next(keyword)?;
        if token.is_keyword(keyword) {
            Ok(())
        } else {
            Err(unexpected(keyword, &token))
        }
    }

    fn expression(&mut self) -> Result<Expression, ExpressionError> {
        self.eat_keyword("CASE");

        let mut clauses = Vec::new();
        while self.eat_keyword("WHEN") {
            let condition = self.condition()?;
            self.expect_keyword("THEN")?;
            let result = self.literal("THEN value")?;
            clauses.push(WhenClause { condition, result });
        }
        if clauses.is_empty() {
            return Err(ExpressionError::MissingWhen);
        }

        let else_value = if self.eat_keyword("ELSE") {
            Some(self.literal("ELSE value")?)
        } else {
            None
        };
        self.eat_keyword("END");

        Ok(Expression {
            clauses,
            else_value,
        })
    }

    fn condition(&mut self) -> Result<Condition, ExpressionError> {
        let mut members = vec![self.and_condition()?];
        while self.eat_keyword("OR") {
            members.push(self.and_condition()?);
        }
        Ok(collapse(members, Condition::Any))
    }

    fn and_condition(&mut self) -> Result<Condition, ExpressionError> {
        let mut members = vec![self.atom()?];
        while self.eat_keyword("AND") {
            members.push(self.atom()?);
        }
        Ok(collapse(members, Condition::All))
    }

    fn atom(&mut self) -> Result<Condition, ExpressionError> {
        if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::LParen)) {
            self.cursor += 1;
            let inner = self.condition()?;
            let close = self.next("')'")?;
            if close.kind != TokenKind::RParen {
                return Err(unexpected("')'", &close));
            }
            return Ok(inner);
        }
        self.comparison().map(Condition::Compare)
    }

    fn comparison(&mut self) -> Result<Comparison, ExpressionError> {
        let operand = self.operand()?;
        let token = self.next("comparison operator")?;

        if token.is_keyword("IN") {
            return Err(ExpressionError::MembershipList {
                position: token.position,
            });
        }
        if token.is_keyword("NOT") {
            let after = self.next("IN or LIKE")?;
            if after.is_keyword("IN") {
                return Err(ExpressionError::MembershipList {
                    position: after.position,
                });
            }
            if after.is_keyword("LIKE") {
                let pattern = self.like_pattern()?;
                return Ok(Comparison::Like {
                    operand,
                    pattern,
                    negated: true,
                });
            }
            return Err(unexpected("IN or LIKE", &after));
        }
        if token.is_keyword("LIKE") {
            let pattern = self.like_pattern()?;
            return Ok(Comparison::Like {
                operand,
                pattern,
                negated: false,
            });
        }
        if token.is_keyword("IS") {
            let negated = self.eat_keyword("NOT");
            let what = self.next("EMPTY or NULL")?;
            if what.is_keyword("EMPTY") || what.is_keyword("NULL") {
                return Ok(Comparison::IsEmpty { operand, negated });
            }
            return Err(unexpected("EMPTY or NULL", &what));
        }

        let op = match token.kind {
            TokenKind::Eq => CompareOp::Eq,
            TokenKind::NotEq => CompareOp::NotEq,
            TokenKind::Gt => CompareOp::Gt,
            TokenKind::Lt => CompareOp::Lt,
            TokenKind::GtEq => CompareOp::GtEq,
            TokenKind::LtEq => CompareOp::LtEq,
            _ => return Err(unexpected("comparison operator", &token)),
        };

        let (rhs_is_operand, rhs_is_list, rhs_position) = match self.peek() {
            Some(next) => (
                matches!(&next.kind, TokenKind::Ident(_)) && !next.is_keyword("NULL"),
                next.kind == TokenKind::LParen,
                next.position,
            ),
            None => (false, false, 0),
        };
        if rhs_is_list {
            // `= ('A', 'B')` is a list in disguise
            return Err(ExpressionError::MembershipList {
                position: rhs_position,
            });
        }
        let right = if rhs_is_operand {
            Value::Operand(self.operand()?)
        } else {
            Value::Literal(self.literal("comparison value")?)
        };

        Ok(Comparison::Binary {
            left: operand,
            op,
            right,
        })
    }

    fn operand(&mut self) -> Result<Operand, ExpressionError> {
        let first = self.next("attribute reference")?;
        let TokenKind::Ident(first_name) = &first.kind else {
            return Err(unexpected("attribute reference", &first));
        };
        if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Dot)) {
            self.cursor += 1;
            let second = self.next("attribute name")?;
            let TokenKind::Ident(attribute) = &second.kind else {
                return Err(unexpected("attribute name", &second));
            };
            return Ok(Operand {
                scope: Some(first_name.clone()),
                attribute: attribute.clone(),
            });
        }
        Ok(Operand {
            scope: None,
            attribute: first_name.clone(),
        })
    }

    fn literal(&mut self, expected: &'static str) -> Result<Literal, ExpressionError> {
        let token = self.next(expected)?;
        match &token.kind {
            TokenKind::Str(value) => Ok(Literal::Text(value.clone())),
            TokenKind::Number(value) => Ok(Literal::Number(value.clone())),
            TokenKind::Ident(_) if token.is_keyword("NULL") => Ok(Literal::Null),
            _ => Err(unexpected(expected, &token)),
        }
    }

    fn like_pattern(&mut self) -> Result<LikePattern, ExpressionError> {
        let token = self.next("LIKE pattern")?;
        let TokenKind::Str(raw) = &token.kind else {
            return Err(unexpected("LIKE pattern", &token));
        };
        parse_like(raw)
    }
}

fn parse_like(raw: &str) -> Result<LikePattern, ExpressionError> {
    let leading = raw.starts_with('%');
    let trailing = raw.len() > 1 && raw.ends_with('%');
    let start = usize::from(leading);
    let end = raw.len() - usize::from(trailing);
    let needle = if start <= end { &raw[start..end] } else { "" };
    if needle.contains('%') {
        return Err(ExpressionError::InvalidLikePattern {
            pattern: raw.to_string(),
        });
    }
    let needle = needle.to_string();
    Ok(match (leading, trailing) {
        (true, true) => LikePattern::Contains(needle),
        (true, false) => LikePattern::EndsWith(needle),
        (false, true) => LikePattern::StartsWith(needle),
        (false, false) => LikePattern::Exact(needle),
    })
}

fn collapse(mut members: Vec<Condition>, wrap: fn(Vec<Condition>) -> Condition) -> Condition {
    if members.len() == 1 {
        members.remove(0)
    } else {
        wrap(members)
    }
}

fn unexpected(expected: &'static str, token: &Token) -> ExpressionError {
    ExpressionError::UnexpectedToken {
        expected,
        found: token.describe(),
        position: token.position,
    }
}
