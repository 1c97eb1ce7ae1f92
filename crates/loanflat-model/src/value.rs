//! Scalar values: contract literals and typed output cells.

use std::fmt;

use serde::{Serialize, Serializer};

/// A literal declared in the contract (lookup table value or default).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    Text(String),
    Integer(i64),
    /// Canonical decimal text, e.g. `"12.50"`.
    Decimal(String),
    Bool(bool),
}

impl Literal {
    /// Text form used for coercion and comparisons.
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(value) | Self::Decimal(value) => value.clone(),
            Self::Integer(value) => value.to_string(),
            Self::Bool(value) => if *value { "1" } else { "0" }.to_string(),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

/// A typed value written to an output record column.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    /// Decimal rendered with the declared scale.
    Decimal(String),
    Bit(bool),
    /// `YYYY-MM-DD HH:MM:SS`
    DateTime(String),
    /// `YYYY-MM-DD`
    Date(String),
}

impl CellValue {
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(value) | Self::Decimal(value) | Self::DateTime(value) | Self::Date(value) => {
                value.clone()
            }
            Self::Integer(value) => value.to_string(),
            Self::Bit(value) => u8::from(*value).to_string(),
        }
    }

    /// Blank text or a numeric zero: a placeholder rather than data.
    pub fn is_neutral(&self) -> bool {
        match self {
            Self::Text(value) => {
                let trimmed = value.trim();
                trimmed.is_empty() || trimmed.parse::<f64>().is_ok_and(|n| n == 0.0)
            }
            Self::Integer(value) => *value == 0,
            Self::Decimal(value) => value.parse::<f64>().is_ok_and(|n| n == 0.0),
            Self::Bit(value) => !*value,
            Self::DateTime(value) | Self::Date(value) => value.trim().is_empty(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Integer(value) => serializer.serialize_i64(*value),
            Self::Bit(value) => serializer.serialize_u8(u8::from(*value)),
            Self::Text(value) | Self::Decimal(value) | Self::DateTime(value) | Self::Date(value) => {
                serializer.serialize_str(value)
            }
        }
    }
}

/// Where a column value came from; drives record suppression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    /// Produced from source data by the mapping chain.
    Mapped,
    /// A bit-conversion result read from a present source token.
    Flag,
    /// A contract-declared default (or a flag defaulted from an absent token).
    Default,
    /// A key column (document identifier, entity identity, foreign key, slot).
    Key,
}
