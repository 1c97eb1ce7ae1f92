//! On-disk JSON shape of a contract (version "1").

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct ContractFile {
    pub version: String,
    #[serde(default)]
    pub name: String,
    pub application_root: String,
    pub document_identity: DocumentIdentityFile,
    pub entity: EntityFile,
    #[serde(default)]
    pub roles: RolesFile,
    #[serde(default)]
    pub current_address: Option<CurrentAddressFile>,
    #[serde(default)]
    pub expression_scopes: BTreeMap<String, String>,
    #[serde(default)]
    pub row_groups: Vec<RowGroupFile>,
    pub fields: Vec<FieldFile>,
    #[serde(default)]
    pub relationships: Vec<RelationshipFile>,
    #[serde(default)]
    pub enum_mappings: BTreeMap<String, BTreeMap<String, Value>>,
    #[serde(default)]
    pub bit_conversions: BTreeMap<String, BTreeMap<String, Value>>,
    #[serde(default)]
    pub default_values: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentIdentityFile {
    pub path: String,
    pub attribute: String,
    pub column: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntityFile {
    pub path: String,
    pub identity_attribute: String,
    pub identity_column: String,
    pub role_attribute: String,
    #[serde(default)]
    pub allowed_roles: Vec<String>,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RolesFile {
    pub primary: Option<String>,
    pub secondary: Option<String>,
    pub auxiliary: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentAddressFile {
    pub element: String,
    pub attribute: String,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RowGroupFile {
    pub kind: String,
    pub slot_column: String,
    #[serde(default)]
    pub zero_is_meaningful: bool,
}

/// `mapping_type` may be a bare name or a list of names.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    /// Operator names in order. Either form may hold comma-separated names;
    /// commas inside a `kind(parameter)` marker do not split it.
    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::One(name) => split_names(name).collect(),
            Self::Many(names) => names.iter().flat_map(|name| split_names(name)).collect(),
        }
    }
}

fn split_names(raw: &str) -> impl Iterator<Item = &str> {
    let mut depth = 0usize;
    raw.split(move |c: char| {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' => return depth == 0,
            _ => {}
        }
        false
    })
    .map(str::trim)
    .filter(|name| !name.is_empty())
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldFile {
    pub source_path: String,
    pub source_attribute: String,
    pub target_table: String,
    pub target_column: String,
    pub data_type: String,
    #[serde(default)]
    pub mapping_type: Option<OneOrMany>,
    #[serde(default)]
    pub enum_name: Option<String>,
    #[serde(default)]
    pub bit_name: Option<String>,
    #[serde(default)]
    pub expression: Option<String>,
    #[serde(default)]
    pub default_value: Option<Value>,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub exclude_default_when_record_empty: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelationshipFile {
    pub parent_table: String,
    pub child_table: String,
    pub foreign_key_column: String,
    pub parent_path: String,
    pub child_path: String,
}
