//! Input document discovery.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::shard::Shard;

/// Expand files and directories into a sorted list of `.xml` documents,
/// keeping only those in `shard` when one is given.
pub fn discover_documents(inputs: &[PathBuf], shard: Option<Shard>) -> Result<Vec<PathBuf>> {
    let mut documents = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let entries =
                fs::read_dir(input).with_context(|| format!("read {}", input.display()))?;
            for entry in entries {
                let path = entry?.path();
                if path.is_file() && is_xml(&path) {
                    documents.push(path);
                }
            }
        } else if input.is_file() {
            documents.push(input.clone());
        } else {
            bail!("input not found: {}", input.display());
        }
    }
    documents.sort();
    documents.dedup();
    if let Some(shard) = shard {
        documents.retain(|path| shard.contains(&file_name(path)));
    }
    Ok(documents)
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

fn is_xml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
}
