//! Normalized mapping contract.
//!
//! A [`MappingContract`] is produced once per run by the contract loader and
//! shared read-only by every document processed with it. All name parsing,
//! expression parsing and table layout happens before this type exists.

use std::collections::{BTreeMap, BTreeSet};

use loanflat_expr::Expression;
use serde::Serialize;

use crate::data_type::DataType;
use crate::operator::{ContextSelector, MappingOperator, RowGroupMarker, ValueChain};
use crate::value::Literal;

#[derive(Debug, Clone, PartialEq)]
pub struct MappingContract {
    pub version: String,
    pub name: String,
    /// SHA-256 of the contract bytes.
    pub fingerprint: String,
    pub application_root: String,
    pub document_identity: DocumentIdentity,
    pub entity: EntityConfig,
    pub roles: RoleCodes,
    pub current_address: Option<CurrentAddress>,
    /// Expression scope name → element path.
    pub expression_scopes: BTreeMap<String, String>,
    pub row_groups: Vec<RowGroup>,
    pub fields: Vec<FieldMapping>,
    pub relationships: Vec<RelationshipMapping>,
    pub enum_tables: BTreeMap<String, LookupTable>,
    pub bit_tables: BTreeMap<String, LookupTable>,
    /// Column → contract-wide default.
    pub default_values: BTreeMap<String, Literal>,
    pub tables: Vec<TableLayout>,
    pub paths: RequiredPaths,
}

impl MappingContract {
    pub fn table(&self, name: &str) -> Option<&TableLayout> {
        self.tables.iter().find(|table| table.name == name)
    }

    pub fn row_group(&self, kind: &str) -> Option<&RowGroup> {
        self.row_groups.iter().find(|group| group.kind == kind)
    }

    pub fn table_fields<'a>(
        &'a self,
        table: &'a TableLayout,
    ) -> impl Iterator<Item = &'a FieldMapping> + 'a {
        table
            .field_indices
            .iter()
            .filter_map(|&index| self.fields.get(index))
    }

    /// Whether `path` is the entity path or lies below it.
    pub fn is_entity_path(&self, path: &str) -> bool {
        is_at_or_below(path, &self.entity.path)
    }

    pub fn role_code(&self, selector: ContextSelector) -> Option<&str> {
        match selector {
            ContextSelector::PrimaryRoleContact | ContextSelector::CurrentAddressOnly => {
                self.roles.primary.as_deref()
            }
            ContextSelector::SecondaryRoleContact => self.roles.secondary.as_deref(),
            ContextSelector::AuxiliaryRoleContact => self.roles.auxiliary.as_deref(),
        }
    }
}

/// Where the document's top-level identifier lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentIdentity {
    pub path: String,
    pub attribute: String,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityConfig {
    pub path: String,
    /// Tag name of the entity element (last segment of `path`).
    pub element: String,
    pub identity_attribute: String,
    pub identity_column: String,
    pub role_attribute: String,
    pub allowed_roles: BTreeSet<String>,
    /// Fail the document when no admissible entity exists.
    pub required: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoleCodes {
    pub primary: Option<String>,
    pub secondary: Option<String>,
    pub auxiliary: Option<String>,
}

/// Selects the current address among an entity's nested address elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentAddress {
    pub element: String,
    pub attribute: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowGroup {
    pub kind: String,
    pub slot_column: String,
    /// Treat a group holding only zero placeholders as meaningful.
    pub zero_is_meaningful: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldMapping {
    pub source_path: String,
    pub source_attribute: String,
    pub target_table: String,
    pub target_column: String,
    pub data_type: DataType,
    /// Declared operators in contract order.
    pub operators: Vec<MappingOperator>,
    pub selector: Option<ContextSelector>,
    pub row_group: Option<RowGroupMarker>,
    pub chain: ValueChain,
    pub expression: Option<Expression>,
    pub default_value: Option<Literal>,
    pub nullable: bool,
    pub required: bool,
    pub exclude_default_when_record_empty: bool,
}

impl FieldMapping {
    /// `table.column`, used in logs and diagnostics.
    pub fn target(&self) -> String {
        format!("{}.{}", self.target_table, self.target_column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipMapping {
    pub parent_table: String,
    pub child_table: String,
    pub foreign_key_column: String,
    pub parent_path: String,
    pub child_path: String,
}

/// Token → literal translation table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupTable {
    pub name: String,
    pub entries: BTreeMap<String, Literal>,
}

impl LookupTable {
    /// Reserved key holding the table's default.
    pub const EMPTY_KEY: &'static str = "";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: BTreeMap::new(),
        }
    }

    pub fn with_entry(mut self, key: impl Into<String>, value: Literal) -> Self {
        self.entries.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Literal> {
        self.entries.get(key)
    }

    pub fn get_ignore_case(&self, key: &str) -> Option<&Literal> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(key))
            .map(|(_, value)| value)
    }

    pub fn default_entry(&self) -> Option<&Literal> {
        self.entries.get(Self::EMPTY_KEY)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableShape {
    /// One record per document.
    Singleton,
    /// One record per resolved entity.
    PerEntity,
    /// One candidate record per `(kind, parameter)` marker.
    RowGroup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySource {
    DocumentId,
    EntityIdentity,
}

/// A key column injected into every record of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKey {
    pub column: String,
    pub source: KeySource,
}

/// How one destination table is projected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableLayout {
    pub name: String,
    pub shape: TableShape,
    /// Indices into [`MappingContract::fields`], contract order.
    pub field_indices: Vec<usize>,
    pub key_columns: BTreeSet<String>,
    pub foreign_keys: Vec<ForeignKey>,
    /// Relationship child path used when a field's own path is absent.
    pub fallback_path: Option<String>,
}

impl TableLayout {
    pub fn is_key_column(&self, column: &str) -> bool {
        self.key_columns.contains(column)
    }
}

/// Paths and element names the selective reader must keep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequiredPaths {
    pub paths: BTreeSet<String>,
    pub element_names: BTreeSet<String>,
    pub scaffold_names: BTreeSet<String>,
}

impl RequiredPaths {
    pub fn should_materialize(&self, path: &str, tag: &str) -> bool {
        self.paths.contains(path)
            || self.element_names.contains(tag)
            || self.scaffold_names.contains(tag)
    }

    /// True when some required path lies strictly below `path`.
    pub fn has_descendant(&self, path: &str) -> bool {
        let prefix = format!("{path}/");
        self.paths
            .range(prefix.clone()..)
            .next()
            .is_some_and(|candidate| candidate.starts_with(&prefix))
    }
}

pub fn is_at_or_below(path: &str, ancestor: &str) -> bool {
    path == ancestor
        || path
            .strip_prefix(ancestor)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Split `/a/b/c` into its segments.
pub fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}
