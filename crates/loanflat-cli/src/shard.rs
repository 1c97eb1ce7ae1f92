//! Deterministic document partitioning.
//!
//! Independent `loanflat` processes each take one shard of the same input set;
//! a document's shard depends only on its file name.

use std::fmt;
use std::str::FromStr;

use loanflat_contract::sha256_hex;

/// Shard `index` of `count`, zero-based: `--shard 0/4` .. `--shard 3/4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shard {
    pub index: u64,
    pub count: u64,
}

impl Shard {
    pub fn new(index: u64, count: u64) -> Result<Self, String> {
        if count == 0 {
            return Err("shard count must be at least 1".to_string());
        }
        if index >= count {
            return Err(format!("shard index {index} is outside 0..{count}"));
        }
        Ok(Self { index, count })
    }

    pub fn contains(&self, name: &str) -> bool {
        shard_key(name) % self.count == self.index
    }
}

/// First 64 bits of the SHA-256 of `name`.
pub fn shard_key(name: &str) -> u64 {
    let digest = sha256_hex(name.as_bytes());
    u64::from_str_radix(&digest[..16], 16).unwrap_or_default()
}

impl FromStr for Shard {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (index, count) = raw
            .split_once('/')
            .ok_or_else(|| format!("expected <index>/<count>, got '{raw}'"))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<u64>()
                .map_err(|_| format!("'{part}' is not a shard number"))
        };
        Self::new(parse(index)?, parse(count)?)
    }
}

impl fmt::Display for Shard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.index, self.count)
    }
}
