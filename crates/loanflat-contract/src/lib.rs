//! Mapping contract loading and validation.
//!
//! Contracts are versioned JSON documents. Loading normalizes every field's
//! operator list into a context selector, an optional row-group marker and a
//! value chain, parses every expression, and lays out each destination table.

#![deny(unsafe_code)]

pub mod error;
pub mod hash;
pub mod layout;
pub mod loader;
pub mod operators;
pub mod wire;

pub use error::ContractLoadError;
pub use hash::sha256_hex;
pub use loader::{SUPPORTED_VERSION, load_contract, parse_contract};
