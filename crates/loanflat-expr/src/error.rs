//! Error types for expression parsing.

use thiserror::Error;

/// Errors raised while turning expression text into an [`Expression`](crate::Expression).
///
/// Every variant is an authoring error: expressions are parsed once when the
/// contract is loaded, never while documents are being processed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpressionError {
    #[error("expression is empty")]
    Empty,

    #[error("unterminated string literal starting at offset {position}")]
    UnterminatedString { position: usize },

    #[error("unexpected character '{found}' at offset {position}")]
    UnexpectedChar { found: char, position: usize },

    #[error("expected {expected} at offset {position}, found '{found}'")]
    UnexpectedToken {
        expected: &'static str,
        found: String,
        position: usize,
    },

    #[error("expected {expected}, found end of expression")]
    UnexpectedEnd { expected: &'static str },

    #[error("expression has no WHEN clause")]
    MissingWhen,

    #[error(
        "membership-list condition at offset {position} is not supported; rewrite IN (...) as an OR chain"
    )]
    MembershipList { position: usize },

    #[error("LIKE pattern '{pattern}' may only use a single leading and/or trailing '%'")]
    InvalidLikePattern { pattern: String },
}
