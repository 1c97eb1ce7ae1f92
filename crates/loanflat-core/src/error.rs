//! Engine error types.

use loanflat_model::DataType;
use loanflat_transform::CoercionError;

/// A document the engine refuses to process at all.
///
/// Upstream pre-flight checks should make these unreachable; they exist so the
/// engine fails fast instead of producing keyless records.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("document identifier missing: no {attribute} attribute at {path}")]
    MissingDocumentId { path: String, attribute: String },

    #[error("no admissible {element} entities in document {document_id}")]
    NoEntities {
        document_id: String,
        element: String,
    },
}

/// A destination table whose projection failed as a whole.
///
/// The table is left out of the document's output; other tables still run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableMappingError {
    #[error("{table}: key {column} cannot be stored as {data_type}: {source}")]
    KeyCoercion {
        table: String,
        column: String,
        data_type: DataType,
        #[source]
        source: CoercionError,
    },

    #[error("{table}: no value available for key {column}")]
    MissingKey { table: String, column: String },
}

impl TableMappingError {
    pub fn table(&self) -> &str {
        match self {
            Self::KeyCoercion { table, .. } | Self::MissingKey { table, .. } => table,
        }
    }
}
