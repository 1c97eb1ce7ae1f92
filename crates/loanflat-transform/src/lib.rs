//! Mapping-type chain executor.
//!
//! Turns one field rule plus the per-document inputs into at most one typed
//! column value:
//!
//! - **source**: where the raw value is read from (context selectors, entity
//!   elements, the path index, relationship fallback paths)
//! - **chain**: [`ChainExecutor`] runs the normalized value chain and the
//!   default policy
//! - **lookup** / **numeric** / **coerce**: the individual operators

#![deny(unsafe_code)]

pub mod chain;
pub mod coerce;
pub mod error;
pub mod lookup;
pub mod numeric;
pub mod source;

pub use chain::{ChainExecutor, FieldOutcome, TransformOptions};
pub use coerce::{Coerced, DATE_FORMAT, DATETIME_FORMAT, coerce};
pub use error::{CoercionError, FieldTransformError};
pub use lookup::{LookupResult, bit_lookup, enum_lookup};
pub use numeric::extract_numeric;
pub use source::{ResolvedSource, SourceScope, expression_context, resolve_source};
