//! Raw value resolution.
//!
//! Decides which element a field reads from, before any value transform runs.
//! Context selectors pick a specific entity (or its current address); other
//! fields read from the entity being projected or from the path index.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use loanflat_expr::ExprContext;
use loanflat_model::{
    ContextSelector, DocumentIndex, FieldMapping, MappingContract, ResolvedEntity, TableLayout,
    is_at_or_below,
};

type Attributes = BTreeMap<String, String>;

/// Per-call inputs a field can read from. Never shared between documents.
#[derive(Debug, Clone, Copy)]
pub struct SourceScope<'a> {
    pub index: &'a DocumentIndex,
    pub entities: &'a [ResolvedEntity],
    /// The entity a per-entity record is being built for.
    pub current: Option<&'a ResolvedEntity>,
    pub table: &'a TableLayout,
    /// Clock value for `TimestampIfMissing`.
    pub now: NaiveDateTime,
}

impl<'a> SourceScope<'a> {
    pub fn with_current(self, entity: &'a ResolvedEntity) -> Self {
        Self {
            current: Some(entity),
            ..self
        }
    }
}

/// Where a field's value was found.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolvedSource<'a> {
    /// Attributes of the element the field reads from.
    pub own: Option<&'a Attributes>,
    /// Entity in play for this field, if any.
    pub entity: Option<&'a ResolvedEntity>,
    pub raw: Option<&'a str>,
}

pub fn resolve_source<'a>(
    contract: &'a MappingContract,
    field: &'a FieldMapping,
    scope: &SourceScope<'a>,
) -> ResolvedSource<'a> {
    let entity = select_entity(contract, field, scope);
    let entity_path = contract.entity.path.as_str();

    let own = match entity {
        Some(entity) if is_at_or_below(&field.source_path, entity_path) => {
            entity_element(contract, field, entity, &field.source_path).or_else(|| {
                scope
                    .table
                    .fallback_path
                    .as_deref()
                    .filter(|path| is_at_or_below(path, entity_path))
                    .and_then(|path| entity_element(contract, field, entity, path))
            })
        }
        // a selector that found no entity means the value is absent
        None if field.selector.is_some() && is_at_or_below(&field.source_path, entity_path) => None,
        _ => scope
            .index
            .get(&field.source_path)
            .or_else(|| {
                scope
                    .table
                    .fallback_path
                    .as_deref()
                    .and_then(|path| scope.index.get(path))
            })
            .map(|node| &node.attributes),
    };

    ResolvedSource {
        own,
        entity,
        raw: own.and_then(|attributes| {
            attributes
                .get(&field.source_attribute)
                .map(String::as_str)
        }),
    }
}

fn select_entity<'a>(
    contract: &'a MappingContract,
    field: &FieldMapping,
    scope: &SourceScope<'a>,
) -> Option<&'a ResolvedEntity> {
    match field.selector {
        Some(ContextSelector::CurrentAddressOnly) => scope
            .current
            .or_else(|| last_with_role(scope.entities, contract.roles.primary.as_deref())),
        Some(selector) => last_with_role(scope.entities, contract.role_code(selector)),
        None => scope.current,
    }
}

fn last_with_role<'a>(
    entities: &'a [ResolvedEntity],
    role: Option<&str>,
) -> Option<&'a ResolvedEntity> {
    let role = role?;
    entities.iter().rev().find(|entity| entity.role == role)
}

fn entity_element<'a>(
    contract: &MappingContract,
    field: &FieldMapping,
    entity: &'a ResolvedEntity,
    path: &str,
) -> Option<&'a Attributes> {
    if field.selector == Some(ContextSelector::CurrentAddressOnly) {
        return current_address(contract, entity);
    }

    let relative = path
        .strip_prefix(contract.entity.path.as_str())
        .map(|rest| rest.trim_start_matches('/'))
        .unwrap_or_default();
    if relative.is_empty() {
        return Some(&entity.attributes);
    }
    entity
        .last_element(relative)
        .map(|element| &element.attributes)
}

/// The last `current_address.element` of `entity` whose marker attribute holds
/// the configured value, regardless of the field's own path.
fn current_address<'a>(
    contract: &MappingContract,
    entity: &'a ResolvedEntity,
) -> Option<&'a Attributes> {
    let address = contract.current_address.as_ref()?;
    entity
        .elements
        .iter()
        .rev()
        .filter(|element| {
            element.tag == address.element || element.relative_path == address.element
        })
        .find(|element| {
            element.attribute(&address.attribute).map(str::trim) == Some(address.value.as_str())
        })
        .map(|element| &element.attributes)
}

/// Expression scopes for one field: declared scopes from the path index, the
/// entity element name bound to the entity in play, and the field's own element.
pub fn expression_context<'a>(
    contract: &'a MappingContract,
    index: &'a DocumentIndex,
    source: &ResolvedSource<'a>,
) -> ExprContext<'a> {
    let mut ctx = ExprContext::new();
    for (name, path) in &contract.expression_scopes {
        if let Some(node) = index.get(path) {
            ctx.insert_scope(name, &node.attributes);
        }
    }
    if let Some(entity) = source.entity {
        ctx.insert_scope(&contract.entity.element, &entity.attributes);
    }
    if let Some(own) = source.own {
        ctx = ctx.with_own(own);
    }
    ctx
}
