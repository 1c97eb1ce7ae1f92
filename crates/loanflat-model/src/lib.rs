//! Shared data model for loan-application flattening.
//!
//! - **contract**: the normalized, immutable [`MappingContract`]
//! - **document** / **entity**: what the ingest stage hands the engine
//! - **record**: what the engine hands the persistence layer

#![deny(unsafe_code)]

pub mod contract;
pub mod data_type;
pub mod document;
pub mod entity;
pub mod error;
pub mod operator;
pub mod record;
pub mod value;

pub use contract::{
    CurrentAddress, DocumentIdentity, EntityConfig, FieldMapping, ForeignKey, KeySource,
    LookupTable, MappingContract, RelationshipMapping, RequiredPaths, RoleCodes, RowGroup,
    TableLayout, TableShape, is_at_or_below, path_segments,
};
pub use data_type::{DataType, IntWidth};
pub use document::{DocumentIndex, IndexedNode};
pub use entity::{EntityElement, ResolvedEntity};
pub use error::{ModelError, Result};
pub use operator::{ContextSelector, MappingOperator, RowGroupMarker, ValueChain};
pub use record::{OutputRecord, RelationalOutput};
pub use value::{CellValue, Literal, ValueSource};
