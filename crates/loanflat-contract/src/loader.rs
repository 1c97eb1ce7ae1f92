//! Contract loading: JSON → validated [`MappingContract`].

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use loanflat_expr::{Expression, parse_expression};
use loanflat_model::{
    ContextSelector, CurrentAddress, DataType, DocumentIdentity, EntityConfig, FieldMapping,
    Literal, LookupTable, MappingContract, MappingOperator, RelationshipMapping, RoleCodes,
    RowGroup, RowGroupMarker, path_segments,
};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::ContractLoadError;
use crate::hash::sha256_hex;
use crate::layout::{build_layouts, normalize_path, required_paths};
use crate::operators::{OperatorName, TransformStep, normalize_chain, parse_operator_name};
use crate::wire::{ContractFile, FieldFile, OneOrMany};

pub const SUPPORTED_VERSION: &str = "1";

/// Read and validate a contract file.
pub fn load_contract(path: &Path) -> Result<MappingContract, ContractLoadError> {
    let source = fs::read_to_string(path).map_err(|e| ContractLoadError::io(path, e))?;
    let contract = parse_contract(&source)?;
    info!(
        path = %path.display(),
        contract = %contract.name,
        fingerprint = %contract.fingerprint,
        "loaded mapping contract"
    );
    Ok(contract)
}

/// Validate contract JSON text.
///
/// Every operator name, row-group marker and expression is parsed here so
/// that a bad contract fails before any document is processed.
pub fn parse_contract(source: &str) -> Result<MappingContract, ContractLoadError> {
    let file: ContractFile = serde_json::from_str(source)?;
    let fingerprint = sha256_hex(source.as_bytes());

    if file.version.trim() != SUPPORTED_VERSION {
        return Err(ContractLoadError::UnsupportedVersion {
            version: file.version,
        });
    }

    let application_root = normalize_path(&file.application_root, "application_root")?;
    let document_identity = DocumentIdentity {
        path: normalize_path(&file.document_identity.path, "document_identity")?,
        attribute: non_blank(&file.document_identity.attribute, "document_identity.attribute")?,
        column: non_blank(&file.document_identity.column, "document_identity.column")?,
    };

    let roles = RoleCodes {
        primary: trimmed(file.roles.primary.as_deref()),
        secondary: trimmed(file.roles.secondary.as_deref()),
        auxiliary: trimmed(file.roles.auxiliary.as_deref()),
    };

    let entity_path = normalize_path(&file.entity.path, "entity")?;
    let element = path_segments(&entity_path)
        .last()
        .map(str::to_string)
        .unwrap_or_default();
    let mut allowed_roles: BTreeSet<String> = file
        .entity
        .allowed_roles
        .iter()
        .map(|role| role.trim().to_string())
        .filter(|role| !role.is_empty())
        .collect();
    if allowed_roles.is_empty() {
        allowed_roles.extend(
            [&roles.primary, &roles.secondary, &roles.auxiliary]
                .into_iter()
                .flatten()
                .cloned(),
        );
    }
    if allowed_roles.is_empty() {
        return Err(ContractLoadError::invalid(
            "entity.allowed_roles is empty and no role codes are declared",
        ));
    }
    let entity = EntityConfig {
        path: entity_path,
        element,
        identity_attribute: non_blank(&file.entity.identity_attribute, "entity.identity_attribute")?,
        identity_column: non_blank(&file.entity.identity_column, "entity.identity_column")?,
        role_attribute: non_blank(&file.entity.role_attribute, "entity.role_attribute")?,
        allowed_roles,
        required: file.entity.required,
    };

    let current_address = file.current_address.as_ref().map(|address| CurrentAddress {
        element: address.element.trim().to_string(),
        attribute: address.attribute.trim().to_string(),
        value: address.value.trim().to_string(),
    });

    let mut expression_scopes = BTreeMap::new();
    for (name, path) in &file.expression_scopes {
        let context = format!("expression_scopes.{name}");
        expression_scopes.insert(name.trim().to_string(), normalize_path(path, &context)?);
    }

    let mut row_groups: Vec<RowGroup> = Vec::with_capacity(file.row_groups.len());
    for group in &file.row_groups {
        let kind = non_blank(&group.kind, "row_groups.kind")?;
        if row_groups
            .iter()
            .any(|existing| existing.kind.eq_ignore_ascii_case(&kind))
        {
            return Err(ContractLoadError::invalid(format!(
                "row group '{kind}' is declared twice"
            )));
        }
        row_groups.push(RowGroup {
            kind,
            slot_column: non_blank(&group.slot_column, "row_groups.slot_column")?,
            zero_is_meaningful: group.zero_is_meaningful,
        });
    }

    let enum_tables = lookup_tables(&file.enum_mappings, "enum_mappings")?;
    let bit_tables = lookup_tables(&file.bit_conversions, "bit_conversions")?;
    let mut default_values = BTreeMap::new();
    for (column, value) in &file.default_values {
        if let Some(literal) = literal_from_json(value, &format!("default_values.{column}"))? {
            default_values.insert(column.clone(), literal);
        }
    }

    let normalizer = FieldNormalizer {
        row_group_kinds: row_groups.iter().map(|group| group.kind.as_str()).collect(),
        enum_tables: &enum_tables,
        bit_tables: &bit_tables,
        scopes: &expression_scopes,
        entity: &entity,
        roles: &roles,
        has_current_address: current_address.is_some(),
    };
    let fields = file
        .fields
        .iter()
        .map(|field| normalizer.normalize(field))
        .collect::<Result<Vec<_>, _>>()?;
    if fields.is_empty() {
        return Err(ContractLoadError::invalid("contract declares no fields"));
    }

    let mut relationships = Vec::with_capacity(file.relationships.len());
    for relationship in &file.relationships {
        let context = format!(
            "relationship {} -> {}",
            relationship.parent_table, relationship.child_table
        );
        relationships.push(RelationshipMapping {
            parent_table: non_blank(&relationship.parent_table, &context)?,
            child_table: non_blank(&relationship.child_table, &context)?,
            foreign_key_column: non_blank(&relationship.foreign_key_column, &context)?,
            parent_path: normalize_path(&relationship.parent_path, &context)?,
            child_path: normalize_path(&relationship.child_path, &context)?,
        });
    }

    let tables = build_layouts(
        &fields,
        &relationships,
        &row_groups,
        &entity,
        &document_identity,
    )?;
    let paths = required_paths(
        &fields,
        &relationships,
        &expression_scopes,
        &document_identity,
        &application_root,
    );
    debug!(
        fields = fields.len(),
        tables = tables.len(),
        required_paths = paths.paths.len(),
        "contract normalized"
    );

    Ok(MappingContract {
        version: file.version.trim().to_string(),
        name: file.name,
        fingerprint,
        application_root,
        document_identity,
        entity,
        roles,
        current_address,
        expression_scopes,
        row_groups,
        fields,
        relationships,
        enum_tables,
        bit_tables,
        default_values,
        tables,
        paths,
    })
}

struct FieldNormalizer<'a> {
    row_group_kinds: Vec<&'a str>,
    enum_tables: &'a BTreeMap<String, LookupTable>,
    bit_tables: &'a BTreeMap<String, LookupTable>,
    scopes: &'a BTreeMap<String, String>,
    entity: &'a EntityConfig,
    roles: &'a RoleCodes,
    has_current_address: bool,
}

impl FieldNormalizer<'_> {
    fn normalize(&self, field: &FieldFile) -> Result<FieldMapping, ContractLoadError> {
        let label = format!("{}.{}", field.target_table.trim(), field.target_column.trim());
        let target_table = non_blank(&field.target_table, &label)?;
        let target_column = non_blank(&field.target_column, &label)?;
        let source_path = normalize_path(&field.source_path, &label)?;
        let data_type: DataType =
            field
                .data_type
                .parse()
                .map_err(|source| ContractLoadError::UnknownDataType {
                    field: label.clone(),
                    source,
                })?;

        let names = field
            .mapping_type
            .as_ref()
            .map(OneOrMany::names)
            .unwrap_or_default();

        let mut operators = Vec::with_capacity(names.len());
        let mut selectors: Vec<ContextSelector> = Vec::new();
        let mut markers: Vec<RowGroupMarker> = Vec::new();
        let mut steps = Vec::new();
        for name in names {
            let operator = match parse_operator_name(name, &self.row_group_kinds, &label)? {
                OperatorName::Enum => {
                    let table = self.lookup_name(field.enum_name.as_deref(), &target_column);
                    self.require_table(self.enum_tables, "enum", &table, &label)?;
                    steps.push(TransformStep::Enum(table.clone()));
                    MappingOperator::EnumLookup { table }
                }
                OperatorName::Bit => {
                    let table = self.lookup_name(field.bit_name.as_deref(), &target_column);
                    self.require_table(self.bit_tables, "bit", &table, &label)?;
                    steps.push(TransformStep::Bit(table.clone()));
                    MappingOperator::BitConversion { table }
                }
                OperatorName::NumbersOnly => {
                    steps.push(TransformStep::NumbersOnly);
                    MappingOperator::NumericExtract
                }
                OperatorName::Calculated => {
                    steps.push(TransformStep::Calculated);
                    MappingOperator::CalculatedField
                }
                OperatorName::Timestamp => {
                    steps.push(TransformStep::Timestamp);
                    MappingOperator::TimestampIfMissing
                }
                OperatorName::Selector(selector) => {
                    self.check_selector(selector, &label)?;
                    selectors.push(selector);
                    MappingOperator::ContextSelector(selector)
                }
                OperatorName::Marker(marker) => {
                    markers.push(marker.clone());
                    MappingOperator::RowGroupMarker(marker)
                }
                OperatorName::Identity => MappingOperator::IdentityPassthrough,
            };
            operators.push(operator);
        }

        if selectors.len() > 1 || markers.len() > 1 {
            return Err(ContractLoadError::UnsupportedChain {
                field: label,
                chain: operators
                    .iter()
                    .map(MappingOperator::name)
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }
        let chain = normalize_chain(&steps, &label)?;

        let expression = match field.expression.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => Some(self.parse_expression(text, &label)?),
            _ => None,
        };
        if chain.uses_expression() && expression.is_none() {
            return Err(ContractLoadError::MissingExpression { field: label });
        }

        let default_value = match &field.default_value {
            Some(value) => literal_from_json(value, &label)?,
            None => None,
        };

        Ok(FieldMapping {
            source_path,
            source_attribute: field.source_attribute.trim().to_string(),
            target_table,
            target_column,
            data_type,
            operators,
            selector: selectors.pop(),
            row_group: markers.pop(),
            chain,
            expression,
            default_value,
            nullable: field.nullable,
            required: field.required,
            exclude_default_when_record_empty: field.exclude_default_when_record_empty,
        })
    }

    fn lookup_name(&self, declared: Option<&str>, target_column: &str) -> String {
        declared
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(target_column)
            .to_string()
    }

    fn require_table(
        &self,
        tables: &BTreeMap<String, LookupTable>,
        kind: &'static str,
        table: &str,
        label: &str,
    ) -> Result<(), ContractLoadError> {
        if tables.contains_key(table) {
            Ok(())
        } else {
            Err(ContractLoadError::UnknownLookupTable {
                field: label.to_string(),
                kind,
                table: table.to_string(),
            })
        }
    }

    fn check_selector(
        &self,
        selector: ContextSelector,
        label: &str,
    ) -> Result<(), ContractLoadError> {
        let configured = match selector {
            ContextSelector::PrimaryRoleContact => self.roles.primary.is_some(),
            ContextSelector::SecondaryRoleContact => self.roles.secondary.is_some(),
            ContextSelector::AuxiliaryRoleContact => self.roles.auxiliary.is_some(),
            ContextSelector::CurrentAddressOnly => self.has_current_address,
        };
        if configured {
            Ok(())
        } else {
            Err(ContractLoadError::invalid(format!(
                "{label}: {selector} needs its role code or current_address declared"
            )))
        }
    }

    fn parse_expression(&self, text: &str, label: &str) -> Result<Expression, ContractLoadError> {
        let expression = parse_expression(text).map_err(|source| ContractLoadError::Expression {
            field: label.to_string(),
            source,
        })?;
        for scope in expression.scopes() {
            if !self.scopes.contains_key(scope) && scope != self.entity.element {
                return Err(ContractLoadError::UnknownScope {
                    field: label.to_string(),
                    scope: scope.to_string(),
                });
            }
        }
        Ok(expression)
    }
}

fn lookup_tables(
    raw: &BTreeMap<String, BTreeMap<String, Value>>,
    section: &str,
) -> Result<BTreeMap<String, LookupTable>, ContractLoadError> {
    let mut tables = BTreeMap::new();
    for (name, entries) in raw {
        let mut table = LookupTable::new(name.clone());
        for (key, value) in entries {
            let context = format!("{section}.{name}.{key}");
            let literal = literal_from_json(value, &context)?
                .ok_or_else(|| ContractLoadError::invalid(format!("{context} is null")))?;
            table.entries.insert(key.clone(), literal);
        }
        tables.insert(name.clone(), table);
    }
    Ok(tables)
}

/// JSON scalar → literal; `null` means "no literal".
fn literal_from_json(value: &Value, context: &str) -> Result<Option<Literal>, ContractLoadError> {
    let literal = match value {
        Value::Null => return Ok(None),
        Value::Bool(flag) => Literal::Bool(*flag),
        Value::Number(number) => match number.as_i64() {
            Some(integer) => Literal::Integer(integer),
            None => Literal::Decimal(number.to_string()),
        },
        Value::String(text) => Literal::Text(text.clone()),
        Value::Array(_) | Value::Object(_) => {
            return Err(ContractLoadError::invalid(format!(
                "{context} must be a scalar"
            )));
        }
    };
    Ok(Some(literal))
}

fn non_blank(value: &str, context: &str) -> Result<String, ContractLoadError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ContractLoadError::invalid(format!("{context} is blank")))
    } else {
        Ok(trimmed.to_string())
    }
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
