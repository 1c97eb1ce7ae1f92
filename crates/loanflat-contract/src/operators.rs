//! Operator-name parsing and chain normalization.

use loanflat_model::{ContextSelector, RowGroupMarker, ValueChain};

use crate::error::ContractLoadError;

/// A declared operator name before lookup tables are attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorName {
    Enum,
    Bit,
    NumbersOnly,
    Calculated,
    Selector(ContextSelector),
    Marker(RowGroupMarker),
    Identity,
    Timestamp,
}

/// Parse one `mapping_type` entry.
///
/// Names are matched case-insensitively. A name containing `(` must be a
/// `kind(parameter)` marker whose kind is one of `row_group_kinds`.
pub fn parse_operator_name(
    raw: &str,
    row_group_kinds: &[&str],
    field: &str,
) -> Result<OperatorName, ContractLoadError> {
    let name = raw.trim();
    if name.contains('(') || name.contains(')') {
        let (kind, parameter) =
            parse_marker(name).ok_or_else(|| ContractLoadError::MalformedMarker {
                field: field.to_string(),
                marker: name.to_string(),
            })?;
        let declared = row_group_kinds
            .iter()
            .find(|candidate| candidate.eq_ignore_ascii_case(kind))
            .ok_or_else(|| ContractLoadError::UnknownRowGroup {
                field: field.to_string(),
                marker: name.to_string(),
                kind: kind.to_string(),
            })?;
        return Ok(OperatorName::Marker(RowGroupMarker {
            kind: (*declared).to_string(),
            parameter: parameter.to_string(),
        }));
    }

    let parsed = match name.to_ascii_lowercase().as_str() {
        "enum" => OperatorName::Enum,
        "char_to_bit" | "bit" => OperatorName::Bit,
        "numbers_only" => OperatorName::NumbersOnly,
        "calculated_field" => OperatorName::Calculated,
        "last_valid_pr_contact" | "primary_contact" => {
            OperatorName::Selector(ContextSelector::PrimaryRoleContact)
        }
        "last_valid_sec_contact" | "secondary_contact" => {
            OperatorName::Selector(ContextSelector::SecondaryRoleContact)
        }
        "auxiliary_contact" => OperatorName::Selector(ContextSelector::AuxiliaryRoleContact),
        "curr_address_only" | "current_address_only" => {
            OperatorName::Selector(ContextSelector::CurrentAddressOnly)
        }
        "identity" | "direct" => OperatorName::Identity,
        "timestamp_if_missing" | "default_getutcdate_if_null" => OperatorName::Timestamp,
        _ => {
            return Err(ContractLoadError::UnknownOperator {
                field: field.to_string(),
                name: name.to_string(),
            });
        }
    };
    Ok(parsed)
}

/// Split `kind(parameter)` into its parts.
///
/// The kind is an identifier, the parameter non-empty and free of parentheses,
/// and nothing may follow the closing parenthesis.
pub fn parse_marker(raw: &str) -> Option<(&str, &str)> {
    let (kind, rest) = raw.split_once('(')?;
    let parameter = rest.trim_end().strip_suffix(')')?;
    let kind = kind.trim();
    let parameter = parameter.trim();

    let mut chars = kind.chars();
    let starts_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !starts_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    if parameter.is_empty() || parameter.contains(['(', ')']) {
        return None;
    }
    Some((kind, parameter))
}

/// Value-transform step with its lookup table attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformStep {
    Enum(String),
    Bit(String),
    NumbersOnly,
    Calculated,
    Timestamp,
}

impl TransformStep {
    fn label(&self) -> &'static str {
        match self {
            Self::Enum(_) => "enum",
            Self::Bit(_) => "char_to_bit",
            Self::NumbersOnly => "numbers_only",
            Self::Calculated => "calculated_field",
            Self::Timestamp => "timestamp_if_missing",
        }
    }
}

/// Collapse value-transform steps into one of the accepted chain shapes.
pub fn normalize_chain(
    steps: &[TransformStep],
    field: &str,
) -> Result<ValueChain, ContractLoadError> {
    let unsupported = |steps: &[TransformStep]| ContractLoadError::UnsupportedChain {
        field: field.to_string(),
        chain: steps
            .iter()
            .map(TransformStep::label)
            .collect::<Vec<_>>()
            .join(", "),
    };

    let chain = match steps {
        [] => ValueChain::Passthrough,
        [TransformStep::Enum(table)] => ValueChain::EnumLookup {
            table: table.clone(),
        },
        [TransformStep::Bit(table)] => ValueChain::BitConversion {
            table: table.clone(),
        },
        [TransformStep::NumbersOnly] => ValueChain::NumericExtract,
        [TransformStep::Calculated] => ValueChain::Calculated,
        [TransformStep::Timestamp] => ValueChain::TimestampIfMissing,
        [TransformStep::Calculated, TransformStep::Enum(table)] => {
            ValueChain::CalculatedThenEnum {
                table: table.clone(),
            }
        }
        _ => return Err(unsupported(steps)),
    };
    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_shapes() {
        assert_eq!(parse_marker("add_score(V4P)"), Some(("add_score", "V4P")));
        assert_eq!(parse_marker(" add_collateral( 2 ) "), Some(("add_collateral", "2")));
        assert_eq!(parse_marker("add_score()"), None);
        assert_eq!(parse_marker("add_score(V4P"), None);
        assert_eq!(parse_marker("add_score(V4P)x"), None);
        assert_eq!(parse_marker("add score(1)"), None);
        assert_eq!(parse_marker("(1)"), None);
    }

    #[test]
    fn names_are_case_insensitive() {
        assert_eq!(
            parse_operator_name(" Char_To_Bit ", &[], "t.c").unwrap(),
            OperatorName::Bit
        );
        assert_eq!(
            parse_operator_name("LAST_VALID_PR_CONTACT", &[], "t.c").unwrap(),
            OperatorName::Selector(ContextSelector::PrimaryRoleContact)
        );
    }

    #[test]
    fn marker_kind_takes_declared_spelling() {
        let parsed = parse_operator_name("ADD_SCORE(V4P)", &["add_score"], "t.c").unwrap();
        assert_eq!(
            parsed,
            OperatorName::Marker(RowGroupMarker {
                kind: "add_score".into(),
                parameter: "V4P".into(),
            })
        );
    }

    #[test]
    fn rejects_unknown_names_and_groups() {
        assert!(matches!(
            parse_operator_name("uppercase", &[], "t.c"),
            Err(ContractLoadError::UnknownOperator { .. })
        ));
        assert!(matches!(
            parse_operator_name("add_score(1)", &["add_collateral"], "t.c"),
            Err(ContractLoadError::UnknownRowGroup { .. })
        ));
        assert!(matches!(
            parse_operator_name("add_score(", &["add_score"], "t.c"),
            Err(ContractLoadError::MalformedMarker { .. })
        ));
    }

    #[test]
    fn only_known_chain_shapes_normalize() {
        assert_eq!(
            normalize_chain(
                &[TransformStep::Calculated, TransformStep::Enum("e".into())],
                "t.c"
            )
            .unwrap(),
            ValueChain::CalculatedThenEnum { table: "e".into() }
        );
        assert!(matches!(
            normalize_chain(
                &[TransformStep::Enum("e".into()), TransformStep::Calculated],
                "t.c"
            ),
            Err(ContractLoadError::UnsupportedChain { .. })
        ));
        assert!(matches!(
            normalize_chain(
                &[TransformStep::NumbersOnly, TransformStep::Bit("b".into())],
                "t.c"
            ),
            Err(ContractLoadError::UnsupportedChain { .. })
        ));
    }
}
