//! Expression syntax tree.

use std::fmt;

/// A parsed `WHEN ... THEN ...` expression.
///
/// Clauses are evaluated top to bottom; the first clause whose condition holds
/// supplies the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    pub clauses: Vec<WhenClause>,
    pub else_value: Option<Literal>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhenClause {
    pub condition: Condition,
    pub result: Literal,
}

/// Boolean condition tree.
///
/// `Any` is an OR over its members, `All` an AND. The parser never produces a
/// single-member `Any`/`All`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Any(Vec<Condition>),
    All(Vec<Condition>),
    Compare(Comparison),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    /// `operand <op> value`
    Binary {
        left: Operand,
        op: CompareOp,
        right: Value,
    },
    /// `operand [NOT] LIKE 'pattern'`
    Like {
        operand: Operand,
        pattern: LikePattern,
        negated: bool,
    },
    /// `operand IS [NOT] EMPTY` (also spelled `NULL`)
    IsEmpty { operand: Operand, negated: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Gt,
    Lt,
    GtEq,
    LtEq,
}

/// Right-hand side of a binary comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Literal(Literal),
    Operand(Operand),
}

/// Attribute reference: `scope.attribute`, or a bare `attribute` that resolves
/// against the evaluating field's own element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Operand {
    pub scope: Option<String>,
    pub attribute: String,
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            Some(scope) => write!(f, "{scope}.{}", self.attribute),
            None => f.write_str(&self.attribute),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Text(String),
    Number(String),
    Null,
}

impl Literal {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(value) | Self::Number(value) => value,
            Self::Null => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LikePattern {
    Exact(String),
    StartsWith(String),
    EndsWith(String),
    Contains(String),
}

impl LikePattern {
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Exact(needle) => value == needle,
            Self::StartsWith(needle) => value.starts_with(needle.as_str()),
            Self::EndsWith(needle) => value.ends_with(needle.as_str()),
            Self::Contains(needle) => value.contains(needle.as_str()),
        }
    }
}

impl Expression {
    /// Every attribute reference in the expression, in source order.
    pub fn operands(&self) -> Vec<&Operand> {
        let mut out = Vec::new();
        for clause in &self.clauses {
            collect_operands(&clause.condition, &mut out);
        }
        out
    }

    /// Distinct scope names referenced by the expression.
    pub fn scopes(&self) -> Vec<&str> {
        let mut scopes: Vec<&str> = self
            .operands()
            .into_iter()
            .filter_map(|operand| operand.scope.as_deref())
            .collect();
        scopes.sort_unstable();
        scopes.dedup();
        scopes
    }
}

fn collect_operands<'a>(condition: &'a Condition, out: &mut Vec<&'a Operand>) {
    match condition {
        Condition::Any(members) | Condition::All(members) => {
            for member in members {
                collect_operands(member, out);
            }
        }
        Condition::Compare(comparison) => match comparison {
            Comparison::Binary { left, right, .. } => {
                out.push(left);
                if let Value::Operand(operand) = right {
                    out.push(operand);
                }
            }
            Comparison::Like { operand, .. } | Comparison::IsEmpty { operand, .. } => {
                out.push(operand);
            }
        },
    }
}
