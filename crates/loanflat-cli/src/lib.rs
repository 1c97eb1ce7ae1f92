//! Library components of the `loanflat` command-line harness.

#![deny(unsafe_code)]

pub mod documents;
pub mod logging;
pub mod output;
pub mod shard;
