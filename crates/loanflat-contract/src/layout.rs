//! Table layouts and the reader's required-path set.

use std::collections::{BTreeMap, BTreeSet};

use loanflat_model::{
    ContextSelector, DocumentIdentity, EntityConfig, FieldMapping, ForeignKey, KeySource,
    RelationshipMapping, RequiredPaths, RowGroup, TableLayout, TableShape, is_at_or_below,
    path_segments,
};

use crate::error::ContractLoadError;

/// Group fields by destination table and decide each table's shape and keys.
///
/// Tables are returned in order of first appearance in `fields`.
pub fn build_layouts(
    fields: &[FieldMapping],
    relationships: &[RelationshipMapping],
    row_groups: &[RowGroup],
    entity: &EntityConfig,
    identity: &DocumentIdentity,
) -> Result<Vec<TableLayout>, ContractLoadError> {
    let mut order: Vec<&str> = Vec::new();
    let mut members: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (index, field) in fields.iter().enumerate() {
        let table = field.target_table.as_str();
        if !members.contains_key(table) {
            order.push(table);
        }
        members.entry(table).or_default().push(index);
    }

    let shapes: BTreeMap<&str, TableShape> = members
        .iter()
        .map(|(table, indices)| (*table, table_shape(fields, indices, entity)))
        .collect();

    let mut layouts = Vec::with_capacity(order.len());
    for table in order {
        let field_indices = members.get(table).cloned().unwrap_or_default();
        let shape = shapes.get(table).copied().unwrap_or(TableShape::Singleton);

        let mut key_columns = BTreeSet::new();
        key_columns.insert(identity.column.clone());
        let mut foreign_keys = Vec::new();

        if shape == TableShape::PerEntity {
            key_columns.insert(entity.identity_column.clone());
            foreign_keys.push(ForeignKey {
                column: entity.identity_column.clone(),
                source: KeySource::EntityIdentity,
            });
        }

        if shape == TableShape::RowGroup {
            let kinds: BTreeSet<&str> = field_indices
                .iter()
                .filter_map(|&index| fields[index].row_group.as_ref())
                .map(|marker| marker.kind.as_str())
                .collect();
            for group in row_groups.iter().filter(|g| kinds.contains(g.kind.as_str())) {
                key_columns.insert(group.slot_column.clone());
            }
        }

        let mut fallback_path = None;
        for relationship in relationships.iter().filter(|r| r.child_table == table) {
            key_columns.insert(relationship.foreign_key_column.clone());
            fallback_path.get_or_insert_with(|| relationship.child_path.clone());

            let parent_shape = shapes
                .get(relationship.parent_table.as_str())
                .copied()
                .unwrap_or(TableShape::Singleton);
            let source = match parent_shape {
                TableShape::Singleton => KeySource::DocumentId,
                TableShape::PerEntity if shape == TableShape::PerEntity => {
                    KeySource::EntityIdentity
                }
                TableShape::PerEntity => {
                    return Err(ContractLoadError::invalid(format!(
                        "table {table} is not per-entity but its parent {} is",
                        relationship.parent_table
                    )));
                }
                TableShape::RowGroup => {
                    return Err(ContractLoadError::invalid(format!(
                        "table {table} cannot reference row-group table {}",
                        relationship.parent_table
                    )));
                }
            };
            if !foreign_keys
                .iter()
                .any(|key: &ForeignKey| key.column == relationship.foreign_key_column)
            {
                foreign_keys.push(ForeignKey {
                    column: relationship.foreign_key_column.clone(),
                    source,
                });
            }
        }

        layouts.push(TableLayout {
            name: table.to_string(),
            shape,
            field_indices,
            key_columns,
            foreign_keys,
            fallback_path,
        });
    }
    Ok(layouts)
}

fn table_shape(fields: &[FieldMapping], indices: &[usize], entity: &EntityConfig) -> TableShape {
    let table_fields = || indices.iter().filter_map(|&index| fields.get(index));
    if table_fields().any(|field| field.row_group.is_some()) {
        return TableShape::RowGroup;
    }
    // role selectors read from a chosen entity, not the one being projected
    let per_entity = table_fields().any(|field| {
        matches!(
            field.selector,
            None | Some(ContextSelector::CurrentAddressOnly)
        ) && is_at_or_below(&field.source_path, &entity.path)
    });
    if per_entity {
        TableShape::PerEntity
    } else {
        TableShape::Singleton
    }
}

/// Every path the selective reader must be able to answer for.
pub fn required_paths(
    fields: &[FieldMapping],
    relationships: &[RelationshipMapping],
    expression_scopes: &BTreeMap<String, String>,
    identity: &DocumentIdentity,
    application_root: &str,
) -> RequiredPaths {
    let mut required = RequiredPaths::default();

    for field in fields {
        insert_with_ancestors(&mut required.paths, &field.source_path);
        insert_last_segment(&mut required.element_names, &field.source_path);
    }
    for relationship in relationships {
        for path in [&relationship.parent_path, &relationship.child_path] {
            insert_with_ancestors(&mut required.paths, path);
            insert_last_segment(&mut required.element_names, path);
        }
    }
    for path in expression_scopes.values() {
        insert_with_ancestors(&mut required.paths, path);
    }
    insert_with_ancestors(&mut required.paths, &identity.path);
    insert_with_ancestors(&mut required.paths, application_root);

    required.scaffold_names = path_segments(application_root)
        .map(str::to_string)
        .collect();
    required
}

fn insert_with_ancestors(paths: &mut BTreeSet<String>, path: &str) {
    let mut current = String::new();
    for segment in path_segments(path) {
        current.push('/');
        current.push_str(segment);
        paths.insert(current.clone());
    }
}

fn insert_last_segment(names: &mut BTreeSet<String>, path: &str) {
    if let Some(last) = path_segments(path).last() {
        names.insert(last.to_string());
    }
}

/// Normalize `path` to `/a/b/c`, rejecting relative or empty-segment paths.
pub fn normalize_path(path: &str, context: &str) -> Result<String, ContractLoadError> {
    let trimmed = path.trim();
    let stripped = trimmed.strip_suffix('/').unwrap_or(trimmed);
    let invalid = || ContractLoadError::InvalidPath {
        context: context.to_string(),
        path: path.to_string(),
    };
    let Some(body) = stripped.strip_prefix('/') else {
        return Err(invalid());
    };
    if body.is_empty() || body.split('/').any(|segment| segment.trim().is_empty()) {
        return Err(invalid());
    }
    Ok(stripped.to_string())
}
