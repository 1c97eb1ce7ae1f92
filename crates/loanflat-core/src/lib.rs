//! Record assembly and the per-document mapping engine.
//!
//! [`MappingEngine::process`] runs one document through the pipeline:
//!
//! 1. selective read into a path index (`loanflat-ingest`)
//! 2. entity resolution with last-wins dedup (`loanflat-ingest`)
//! 3. per-table assembly, running every field's chain (`loanflat-transform`)
//! 4. aggregation into one table → records map plus a [`ProcessingReport`]

#![deny(unsafe_code)]

pub mod aggregate;
pub mod assembler;
pub mod clock;
pub mod context;
pub mod engine;
pub mod error;
pub mod report;

pub use aggregate::OutputAggregator;
pub use assembler::{FieldFailure, MissingValue, TableAssembler, TableBatch};
pub use clock::{Clock, FixedClock, SystemClock};
pub use context::{EngineOptions, ProcessingContext};
pub use engine::{DocumentOutput, MappingEngine};
pub use error::{EngineError, TableMappingError};
pub use report::{Diagnostic, DiagnosticLevel, ProcessingReport};
