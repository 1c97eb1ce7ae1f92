//! Lookup-table translation for enum and bit operators.

use loanflat_model::{Literal, LookupTable};

/// Outcome of translating one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResult<'a> {
    Exact(&'a Literal),
    CaseInsensitive(&'a Literal),
    /// Matched only the table's reserved empty-token default.
    Default(&'a Literal),
    NotFound,
}

impl<'a> LookupResult<'a> {
    pub fn value(&self) -> Option<&'a Literal> {
        match self {
            Self::Exact(value) | Self::CaseInsensitive(value) | Self::Default(value) => Some(value),
            Self::NotFound => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::NotFound)
    }
}

/// Exact match, then case-insensitive match, then the `""` default key.
pub fn enum_lookup<'a>(table: &'a LookupTable, raw: &str) -> LookupResult<'a> {
    let token = raw.trim();
    if let Some(value) = table.get(token) {
        return LookupResult::Exact(value);
    }
    if let Some(value) = table.get_ignore_case(token) {
        return LookupResult::CaseInsensitive(value);
    }
    match table.default_entry() {
        Some(value) => LookupResult::Default(value),
        None => LookupResult::NotFound,
    }
}

/// Translate a flag token; anything unmatched is `false`.
pub fn bit_lookup(table: &LookupTable, raw: &str) -> bool {
    let token = raw.trim();
    if token.is_empty() {
        return false;
    }
    table
        .get(token)
        .or_else(|| table.get_ignore_case(token))
        .is_some_and(literal_truth)
}

fn literal_truth(literal: &Literal) -> bool {
    match literal {
        Literal::Bool(flag) => *flag,
        Literal::Integer(value) => *value != 0,
        Literal::Decimal(value) => value.parse::<f64>().is_ok_and(|n| n != 0.0),
        Literal::Text(value) => matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "y" | "yes"
        ),
    }
}
