//! Parsed document tree.
//!
//! Nodes live in an arena in document order, so a node's index doubles as its
//! document-order position.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesStart, Event};

use crate::error::{DocumentError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    /// Text before the first child element.
    pub text: String,
    /// Text after this element's end tag, before the next sibling.
    pub tail: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Attributes could not be read (duplicates or bad escapes).
    pub malformed: bool,
}

impl Node {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&source)
    }

    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut nodes: Vec<Node> = Vec::new();
        let mut open: Vec<NodeId> = Vec::new();

        loop {
            let event = reader.read_event().map_err(|source| DocumentError::Xml {
                position: reader.error_position(),
                source,
            })?;
            match event {
                Event::Start(ref start) => {
                    let id = push_node(&mut nodes, &open, start)?;
                    open.push(id);
                }
                Event::Empty(ref start) => {
                    push_node(&mut nodes, &open, start)?;
                }
                Event::End(_) => {
                    open.pop();
                }
                Event::Text(ref text) => {
                    append_text(&mut nodes, &open, &String::from_utf8_lossy(text));
                }
                Event::CData(ref data) => {
                    append_text(&mut nodes, &open, &String::from_utf8_lossy(data));
                }
                Event::GeneralRef(ref reference) => {
                    let name = String::from_utf8_lossy(reference);
                    if let Some(resolved) = resolve_reference(&name) {
                        append_text(&mut nodes, &open, &resolved);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(id) = open.last() {
            return Err(DocumentError::Unclosed {
                tag: nodes[id.0].tag.clone(),
            });
        }
        if nodes.is_empty() {
            return Err(DocumentError::Empty);
        }
        for node in &mut nodes {
            trim_in_place(&mut node.text);
            trim_in_place(&mut node.tail);
        }
        Ok(Self { nodes })
    }

    /// The root element; a parsed document always has one.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in document order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeId(index), node))
    }

    /// Descendants of `id` in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.node(id).children.clone();
        stack.reverse();
        Descendants {
            document: self,
            stack,
        }
    }

    /// Absolute `/a/b/c` path of a node.
    pub fn path_of(&self, id: NodeId) -> String {
        let mut tags = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node(node_id);
            tags.push(node.tag.as_str());
            current = node.parent;
        }
        tags.reverse();
        let mut path = String::new();
        for tag in tags {
            path.push('/');
            path.push_str(tag);
        }
        path
    }
}

pub struct Descendants<'a> {
    document: &'a Document,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = self.document.node(id);
        self.stack.extend(node.children.iter().rev().copied());
        Some((id, node))
    }
}

fn push_node(nodes: &mut Vec<Node>, open: &[NodeId], start: &BytesStart<'_>) -> Result<NodeId> {
    let tag = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let parent = open.last().copied();
    if parent.is_none() && !nodes.is_empty() {
        return Err(DocumentError::MultipleRoots { tag });
    }

    let mut attributes = BTreeMap::new();
    let mut malformed = false;
    for attribute in start.attributes() {
        let Ok(attribute) = attribute else {
            malformed = true;
            continue;
        };
        let key = String::from_utf8_lossy(attribute.key.local_name().as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attribute.value);
        match unescape(&raw) {
            Ok(value) => {
                attributes.insert(key, value.into_owned());
            }
            Err(_) => malformed = true,
        }
    }

    let id = NodeId(nodes.len());
    nodes.push(Node {
        tag,
        attributes,
        text: String::new(),
        tail: String::new(),
        parent,
        children: Vec::new(),
        malformed,
    });
    if let Some(parent) = parent {
        nodes[parent.0].children.push(id);
    }
    Ok(id)
}

/// Text belongs to the open element until it has a child, then to the last
/// child's tail.
fn append_text(nodes: &mut [Node], open: &[NodeId], text: &str) {
    let Some(current) = open.last() else {
        return;
    };
    let last_child = nodes[current.0].children.last().copied();
    let target = match last_child {
        Some(child) => &mut nodes[child.0].tail,
        None => &mut nodes[current.0].text,
    };
    target.push_str(text);
}

fn resolve_reference(name: &str) -> Option<String> {
    if let Some(code) = name.strip_prefix('#') {
        let value = match code.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => code.parse::<u32>().ok()?,
        };
        return char::from_u32(value).map(String::from);
    }
    resolve_predefined_entity(name).map(str::to_string)
}

fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}
