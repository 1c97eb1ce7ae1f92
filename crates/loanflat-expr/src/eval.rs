//! Expression evaluation against a cross-referenced attribute context.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::ast::{CompareOp, Comparison, Condition, Expression, Literal, Operand, Value};

/// Attribute scopes visible to an expression.
///
/// A scope is a named attribute map (an element's attributes). Bare operands
/// resolve against the own scope, which is the evaluating field's element.
#[derive(Debug, Clone, Default)]
pub struct ExprContext<'a> {
    scopes: BTreeMap<&'a str, &'a BTreeMap<String, String>>,
    own: Option<&'a BTreeMap<String, String>>,
}

impl<'a> ExprContext<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named scope. A later scope with the same name replaces the earlier one.
    pub fn with_scope(mut self, name: &'a str, attributes: &'a BTreeMap<String, String>) -> Self {
        self.scopes.insert(name, attributes);
        self
    }

    pub fn insert_scope(&mut self, name: &'a str, attributes: &'a BTreeMap<String, String>) {
        self.scopes.insert(name, attributes);
    }

    /// Set the scope used by unqualified attribute references.
    pub fn with_own(mut self, attributes: &'a BTreeMap<String, String>) -> Self {
        self.own = Some(attributes);
        self
    }

    /// Resolve an operand; missing scopes and attributes read as `None`.
    pub fn resolve(&self, operand: &Operand) -> Option<&'a str> {
        let attributes = match &operand.scope {
            Some(scope) => *self.scopes.get(scope.as_str())?,
            None => self.own?,
        };
        attributes.get(&operand.attribute).map(String::as_str)
    }
}

/// Result of a matching THEN/ELSE branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprValue {
    Text(String),
    Number(String),
}

impl ExprValue {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(value) | Self::Number(value) => value,
        }
    }
}

impl Expression {
    /// Evaluate clauses top to bottom.
    ///
    /// Returns the first matching THEN literal, else the ELSE literal, else
    /// `None`. A `NULL` literal also yields `None`.
    pub fn evaluate(&self, ctx: &ExprContext<'_>) -> Option<ExprValue> {
        let chosen = self
            .clauses
            .iter()
            .find(|clause| clause.condition.holds(ctx))
            .map(|clause| &clause.result)
            .or(self.else_value.as_ref())?;
        match chosen {
            Literal::Text(value) => Some(ExprValue::Text(value.clone())),
            Literal::Number(value) => Some(ExprValue::Number(value.clone())),
            Literal::Null => None,
        }
    }
}

impl Condition {
    pub fn holds(&self, ctx: &ExprContext<'_>) -> bool {
        match self {
            Self::Any(members) => members.iter().any(|member| member.holds(ctx)),
            Self::All(members) => members.iter().all(|member| member.holds(ctx)),
            Self::Compare(comparison) => comparison.holds(ctx),
        }
    }
}

impl Comparison {
    pub fn holds(&self, ctx: &ExprContext<'_>) -> bool {
        match self {
            Self::Binary { left, op, right } => {
                let lhs = ctx.resolve(left).unwrap_or("").trim();
                let rhs = match right {
                    Value::Literal(literal) => literal.as_str().trim(),
                    Value::Operand(operand) => ctx.resolve(operand).unwrap_or("").trim(),
                };
                compare(lhs, *op, rhs)
            }
            Self::Like {
                operand,
                pattern,
                negated,
            } => {
                let value = ctx.resolve(operand).unwrap_or("").trim();
                pattern.matches(value) != *negated
            }
            Self::IsEmpty { operand, negated } => {
                let empty = ctx.resolve(operand).is_none_or(|v| v.trim().is_empty());
                empty != *negated
            }
        }
    }
}

fn compare(lhs: &str, op: CompareOp, rhs: &str) -> bool {
    match op {
        CompareOp::Eq => lhs == rhs,
        CompareOp::NotEq => lhs != rhs,
        CompareOp::Gt | CompareOp::Lt | CompareOp::GtEq | CompareOp::LtEq => {
            if lhs.is_empty() || rhs.is_empty() {
                return false;
            }
            let ordering = match (lhs.parse::<f64>(), rhs.parse::<f64>()) {
                (Ok(a), Ok(b)) => a.partial_cmp(&b),
                _ => Some(lhs.cmp(rhs)),
            };
            let Some(ordering) = ordering else {
                return false;
            };
            match op {
                CompareOp::Gt => ordering == Ordering::Greater,
                CompareOp::Lt => ordering == Ordering::Less,
                CompareOp::GtEq => ordering != Ordering::Less,
                CompareOp::LtEq => ordering != Ordering::Greater,
                CompareOp::Eq | CompareOp::NotEq => false,
            }
        }
    }
}
