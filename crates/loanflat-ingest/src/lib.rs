//! Document ingestion.
//!
//! - **document**: XML text → [`Document`] arena
//! - **reader**: [`SelectiveReader`] builds the path index the contract needs
//! - **entity**: [`EntityResolver`] finds repeated entities with last-wins dedup

#![deny(unsafe_code)]

pub mod document;
pub mod entity;
pub mod error;
pub mod reader;

pub use document::{Document, Node, NodeId};
pub use entity::{DropReason, DroppedEntity, EntityResolution, EntityResolver};
pub use error::DocumentError;
pub use reader::{ReadStats, SelectiveReader};
