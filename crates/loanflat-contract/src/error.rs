//! Contract load errors.
//!
//! Every variant is fatal: a contract that fails to load never processes a
//! document.

use std::path::PathBuf;

use loanflat_expr::ExpressionError;
use loanflat_model::ModelError;

#[derive(Debug, thiserror::Error)]
pub enum ContractLoadError {
    #[error("failed to read contract {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse contract JSON: {source}")]
    Json {
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported contract version {version}")]
    UnsupportedVersion { version: String },

    #[error("{field}: unknown mapping operator '{name}'")]
    UnknownOperator { field: String, name: String },

    #[error("{field}: malformed row-group marker '{marker}'")]
    MalformedMarker { field: String, marker: String },

    #[error("{field}: marker '{marker}' names undeclared row group '{kind}'")]
    UnknownRowGroup {
        field: String,
        marker: String,
        kind: String,
    },

    #[error("{field}: invalid expression: {source}")]
    Expression {
        field: String,
        #[source]
        source: ExpressionError,
    },

    #[error("{field}: calculated_field requires an expression")]
    MissingExpression { field: String },

    #[error("{field}: expression references undeclared scope '{scope}'")]
    UnknownScope { field: String, scope: String },

    #[error("{field}: no {kind} table named '{table}'")]
    UnknownLookupTable {
        field: String,
        kind: &'static str,
        table: String,
    },

    #[error("{field}: unsupported operator chain [{chain}]")]
    UnsupportedChain { field: String, chain: String },

    #[error("{field}: {source}")]
    UnknownDataType {
        field: String,
        #[source]
        source: ModelError,
    },

    #[error("{context}: invalid path '{path}'")]
    InvalidPath { context: String, path: String },

    #[error("invalid contract: {message}")]
    Invalid { message: String },
}

impl ContractLoadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for ContractLoadError {
    fn from(source: serde_json::Error) -> Self {
        Self::Json { source }
    }
}
