//! Flattened path → node index produced by the selective reader.

use std::collections::BTreeMap;

/// A materialized element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexedNode {
    pub tag: String,
    /// Trimmed element text.
    pub text: String,
    pub attributes: BTreeMap<String, String>,
    /// Trimmed text following the element's end tag.
    pub tail: String,
    /// Document-order position (0-based element count).
    pub position: usize,
}

impl IndexedNode {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Path → node map.
///
/// A later node at an identical path replaces the earlier one; repeated
/// elements must be read through the entity resolver instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentIndex {
    nodes: BTreeMap<String, IndexedNode>,
    skipped: usize,
}

impl DocumentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, node: IndexedNode) {
        self.nodes.insert(path.into(), node);
    }

    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    /// Malformed nodes left out of the index.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn get(&self, path: &str) -> Option<&IndexedNode> {
        self.nodes.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.nodes.contains_key(path)
    }

    pub fn attribute(&self, path: &str, name: &str) -> Option<&str> {
        self.get(path)?.attribute(name)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_insert_overwrites() {
        let mut index = DocumentIndex::new();
        let mut first = IndexedNode {
            tag: "contact".into(),
            position: 1,
            ..IndexedNode::default()
        };
        first.attributes.insert("con_id".into(), "1".into());
        let mut second = first.clone();
        second.position = 4;
        second.attributes.insert("con_id".into(), "2".into());

        index.insert("/app/contact", first);
        index.insert("/app/contact", second);

        assert_eq!(index.len(), 1);
        assert_eq!(index.attribute("/app/contact", "con_id"), Some("2"));
    }
}
