//! Field-level transform errors.
//!
//! These never abort a record: the executor falls back to the field's
//! default (or omits the column) and reports the error upward.

use loanflat_model::DataType;

/// Why a value could not be represented as the declared column type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoercionError {
    #[error("not a number")]
    NotANumber,

    #[error("integer out of range")]
    OutOfRange,

    #[error("fractional value for an integer column")]
    Fractional,

    #[error("not a bit value")]
    NotABit,

    #[error("not a recognised date or time")]
    NotADate,

    #[error("text longer than {max_len} characters")]
    TooLong { max_len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldTransformError {
    #[error("{field}: cannot store value as {data_type}: {source}")]
    Coercion {
        field: String,
        data_type: DataType,
        #[source]
        source: CoercionError,
    },

    #[error("{field}: default cannot be stored as {data_type}: {source}")]
    Default {
        field: String,
        data_type: DataType,
        #[source]
        source: CoercionError,
    },
}

impl FieldTransformError {
    pub fn field(&self) -> &str {
        match self {
            Self::Coercion { field, .. } | Self::Default { field, .. } => field,
        }
    }
}
