use std::collections::BTreeMap;

/// An admissible repeated sub-entity after deduplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntity {
    pub identity: String,
    pub role: String,
    /// Document-order position of the element that won deduplication.
    pub position: usize,
    pub attributes: BTreeMap<String, String>,
    /// Nested elements in document order.
    pub elements: Vec<EntityElement>,
}

/// An element nested inside an entity, addressed relative to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityElement {
    /// Path below the entity, e.g. `contact_address` or `a/b`.
    pub relative_path: String,
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub position: usize,
}

impl EntityElement {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

impl ResolvedEntity {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// The last nested element at `relative_path`.
    pub fn last_element(&self, relative_path: &str) -> Option<&EntityElement> {
        self.elements
            .iter()
            .rfind(|element| element.relative_path == relative_path)
    }
}
