//! Selective document reader.
//!
//! One pre-order traversal that records only the nodes a contract can ask
//! for. A node is materialized when its path is required, its tag is a
//! required element name, or its tag is part of the application-root
//! scaffold. A node that is not materialized is still descended into when a
//! required path lies below it; otherwise its whole subtree is skipped.

use loanflat_model::{DocumentIndex, IndexedNode, RequiredPaths};
use tracing::{debug, warn};

use crate::document::{Document, NodeId};

/// Traversal counters, mostly for logs and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    pub visited: usize,
    pub materialized: usize,
    /// Subtrees skipped without visiting their descendants.
    pub pruned: usize,
    pub malformed: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct SelectiveReader<'a> {
    required: &'a RequiredPaths,
}

impl<'a> SelectiveReader<'a> {
    pub fn new(required: &'a RequiredPaths) -> Self {
        Self { required }
    }

    pub fn read(&self, document: &Document) -> DocumentIndex {
        self.read_with_stats(document).0
    }

    pub fn read_with_stats(&self, document: &Document) -> (DocumentIndex, ReadStats) {
        let mut index = DocumentIndex::new();
        let mut stats = ReadStats::default();
        let mut stack: Vec<(NodeId, String)> = vec![(document.root(), String::new())];

        while let Some((id, parent_path)) = stack.pop() {
            let node = document.node(id);
            let path = format!("{parent_path}/{}", node.tag);
            stats.visited += 1;

            let descend = if self.required.should_materialize(&path, &node.tag) {
                if node.malformed {
                    stats.malformed += 1;
                    index.record_skip();
                } else {
                    stats.materialized += 1;
                    index.insert(
                        path.clone(),
                        IndexedNode {
                            tag: node.tag.clone(),
                            text: node.text.clone(),
                            attributes: node.attributes.clone(),
                            tail: node.tail.clone(),
                            position: id.index(),
                        },
                    );
                }
                true
            } else {
                self.required.has_descendant(&path)
            };

            if descend {
                for child in node.children.iter().rev() {
                    stack.push((*child, path.clone()));
                }
            } else if !node.children.is_empty() {
                stats.pruned += 1;
            }
        }

        if stats.malformed > 0 {
            warn!(skipped = stats.malformed, "skipped malformed document nodes");
        }
        debug!(
            visited = stats.visited,
            materialized = stats.materialized,
            pruned = stats.pruned,
            total = document.len(),
            "document indexed"
        );
        (index, stats)
    }
}
