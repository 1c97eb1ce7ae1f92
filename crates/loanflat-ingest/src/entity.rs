//! Entity resolver.
//!
//! Repeated entities are read by a dedicated traversal of the whole document
//! because the path index keeps only the last node per path.

use std::collections::BTreeMap;
use std::fmt;

use loanflat_model::{EntityConfig, EntityElement, ResolvedEntity};
use tracing::{debug, warn};

use crate::document::{Document, NodeId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    MissingIdentity,
    MissingRole,
    RoleNotAllowed(String),
    Malformed,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingIdentity => f.write_str("identity attribute missing or blank"),
            Self::MissingRole => f.write_str("role attribute missing or blank"),
            Self::RoleNotAllowed(role) => write!(f, "role '{role}' is not allowed"),
            Self::Malformed => f.write_str("attributes could not be read"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedEntity {
    pub position: usize,
    pub reason: DropReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityResolution {
    /// Survivors in first-insertion order of their `(identity, role)` key.
    pub entities: Vec<ResolvedEntity>,
    pub dropped: Vec<DroppedEntity>,
    /// Earlier duplicates replaced by a later occurrence.
    pub replaced: usize,
}

impl EntityResolution {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EntityResolver<'a> {
    config: &'a EntityConfig,
}

impl<'a> EntityResolver<'a> {
    pub fn new(config: &'a EntityConfig) -> Self {
        Self { config }
    }

    pub fn resolve(&self, document: &Document) -> EntityResolution {
        let mut resolution = EntityResolution::default();
        let mut slots: BTreeMap<(String, String), usize> = BTreeMap::new();

        for (id, node) in document.iter() {
            if node.tag != self.config.element {
                continue;
            }
            let position = id.index();
            let entity = match self.admit(document, id) {
                Ok(entity) => entity,
                Err(reason) => {
                    warn!(
                        element = %self.config.element,
                        position,
                        reason = %reason,
                        "dropping entity"
                    );
                    resolution.dropped.push(DroppedEntity { position, reason });
                    continue;
                }
            };

            let key = (entity.identity.clone(), entity.role.clone());
            match slots.get(&key) {
                Some(&slot) => {
                    debug!(
                        position,
                        replaced_position = resolution.entities[slot].position,
                        "later entity replaces earlier duplicate"
                    );
                    resolution.entities[slot] = entity;
                    resolution.replaced += 1;
                }
                None => {
                    slots.insert(key, resolution.entities.len());
                    resolution.entities.push(entity);
                }
            }
        }

        debug!(
            resolved = resolution.entities.len(),
            dropped = resolution.dropped.len(),
            replaced = resolution.replaced,
            "entities resolved"
        );
        resolution
    }

    fn admit(&self, document: &Document, id: NodeId) -> Result<ResolvedEntity, DropReason> {
        let node = document.node(id);
        if node.malformed {
            return Err(DropReason::Malformed);
        }
        let identity = node
            .attribute(&self.config.identity_attribute)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(DropReason::MissingIdentity)?;
        let role = node
            .attribute(&self.config.role_attribute)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(DropReason::MissingRole)?;
        if !self.config.allowed_roles.contains(role) {
            return Err(DropReason::RoleNotAllowed(role.to_string()));
        }

        Ok(ResolvedEntity {
            identity: identity.to_string(),
            role: role.to_string(),
            position: id.index(),
            attributes: node.attributes.clone(),
            elements: nested_elements(document, id),
        })
    }
}

/// Every element below the entity, with its path relative to the entity.
fn nested_elements(document: &Document, entity: NodeId) -> Vec<EntityElement> {
    let mut elements = Vec::new();
    let mut stack: Vec<(NodeId, String)> = document
        .node(entity)
        .children
        .iter()
        .rev()
        .map(|child| (*child, String::new()))
        .collect();

    while let Some((id, parent)) = stack.pop() {
        let node = document.node(id);
        let relative_path = if parent.is_empty() {
            node.tag.clone()
        } else {
            format!("{parent}/{}", node.tag)
        };
        for child in node.children.iter().rev() {
            stack.push((*child, relative_path.clone()));
        }
        if node.malformed {
            continue;
        }
        elements.push(EntityElement {
            relative_path,
            tag: node.tag.clone(),
            attributes: node.attributes.clone(),
            position: id.index(),
        });
    }
    elements
}
