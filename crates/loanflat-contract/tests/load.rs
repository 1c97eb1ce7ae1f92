use loanflat_contract::{ContractLoadError, parse_contract};
use loanflat_expr::ExpressionError;
use loanflat_model::{
    ContextSelector, KeySource, MappingContract, RowGroupMarker, TableShape, ValueChain,
};
use serde_json::{Value, json};

const FIXTURE: &str = include_str!("fixtures/credit_card.json");
const APP: &str = "/Provenir/Request/CustData/application";

fn fixture() -> MappingContract {
    parse_contract(FIXTURE).expect("fixture contract loads")
}

/// Load the fixture after editing its JSON.
fn load_modified(edit: impl FnOnce(&mut Value)) -> Result<MappingContract, ContractLoadError> {
    let mut value: Value = serde_json::from_str(FIXTURE).expect("fixture is JSON");
    edit(&mut value);
    parse_contract(&value.to_string())
}

fn field_mut<'a>(value: &'a mut Value, column: &str) -> &'a mut Value {
    value["fields"]
        .as_array_mut()
        .expect("fields array")
        .iter_mut()
        .find(|field| field["target_column"] == column)
        .expect("field present")
}

#[test]
fn fixture_tables_get_expected_shapes() {
    let contract = fixture();
    let shape = |name: &str| contract.table(name).map(|table| table.shape);

    assert_eq!(shape("app_base"), Some(TableShape::Singleton));
    assert_eq!(shape("contact_base"), Some(TableShape::PerEntity));
    assert_eq!(shape("contact_address"), Some(TableShape::PerEntity));
    assert_eq!(shape("app_collateral"), Some(TableShape::RowGroup));
    assert_eq!(contract.entity.element, "contact");
    assert_eq!(contract.fingerprint.len(), 64);
}

#[test]
fn foreign_keys_follow_parent_shape() {
    let contract = fixture();

    let contact = contract.table("contact_base").unwrap();
    let sources: Vec<(&str, KeySource)> = contact
        .foreign_keys
        .iter()
        .map(|key| (key.column.as_str(), key.source))
        .collect();
    assert_eq!(
        sources,
        vec![
            ("con_id", KeySource::EntityIdentity),
            ("app_id", KeySource::DocumentId)
        ]
    );

    // the relationship key duplicates the entity identity column
    let address = contract.table("contact_address").unwrap();
    assert_eq!(address.foreign_keys.len(), 1);
    assert_eq!(
        address.fallback_path.as_deref(),
        Some("/Provenir/Request/CustData/application/contact/contact_address")
    );
}

#[test]
fn row_group_layout() {
    let contract = fixture();
    let layout = contract.table("app_collateral").unwrap();
    insta::assert_json_snapshot!(
        (&layout.key_columns, &layout.foreign_keys),
        @r#"
    [
      [
        "app_id",
        "collateral_slot"
      ],
      [
        {
          "column": "app_id",
          "source": "document_id"
        }
      ]
    ]
    "#
    );

    let markers: Vec<&RowGroupMarker> = contract
        .table_fields(layout)
        .filter_map(|field| field.row_group.as_ref())
        .collect();
    assert_eq!(markers.len(), 8);
    assert_eq!(markers[0].kind, "add_collateral");
    assert_eq!(markers[0].parameter, "1");
    assert_eq!(markers[7].parameter, "4");
}

#[test]
fn operators_normalize_into_selector_and_chain() {
    let contract = fixture();
    let field = |column: &str| {
        contract
            .fields
            .iter()
            .find(|field| field.target_column == column)
            .unwrap()
    };

    assert_eq!(
        field("primary_email").selector,
        Some(ContextSelector::PrimaryRoleContact)
    );
    assert_eq!(field("primary_email").chain, ValueChain::Passthrough);
    assert_eq!(
        field("home_owner_flag").chain,
        ValueChain::BitConversion { table: "yn".into() }
    );
    assert_eq!(field("score_band").chain, ValueChain::Calculated);
    assert!(field("score_band").expression.is_some());
    assert_eq!(field("app_id").chain, ValueChain::Passthrough);
}

#[test]
fn required_paths_include_ancestors_only_for_referenced_branches() {
    let contract = fixture();
    let paths = &contract.paths;
    assert!(paths.paths.contains("/Provenir"));
    assert!(paths.paths.contains("/Provenir/Request/CustData"));
    assert!(paths.paths.contains(&format!("{APP}/contact/contact_address")));
    assert!(paths.element_names.contains("collateral_info"));
    assert!(paths.scaffold_names.contains("CustData"));
    assert!(!paths.has_descendant(&format!("{APP}/collateral_info")));
}

#[test]
fn membership_list_is_a_load_error() {
    let result = load_modified(|value| {
        field_mut(value, "score_band")["expression"] =
            json!("WHEN app.app_type_code IN ('STD', 'PRM') THEN 'x'");
    });
    match result {
        Err(ContractLoadError::Expression { field, source }) => {
            assert_eq!(field, "app_base.score_band");
            assert!(matches!(source, ExpressionError::MembershipList { .. }));
        }
        other => panic!("expected expression error, got {other:?}"),
    }
}

#[test]
fn unknown_operator_is_rejected() {
    let result = load_modified(|value| {
        field_mut(value, "first_name")["mapping_type"] = json!("upper_case");
    });
    assert!(matches!(
        result,
        Err(ContractLoadError::UnknownOperator { name, .. }) if name == "upper_case"
    ));
}

#[test]
fn malformed_and_undeclared_markers_are_rejected() {
    let malformed = load_modified(|value| {
        field_mut(value, "first_name")["mapping_type"] = json!("add_collateral(1");
    });
    assert!(matches!(
        malformed,
        Err(ContractLoadError::MalformedMarker { .. })
    ));

    let undeclared = load_modified(|value| {
        field_mut(value, "first_name")["mapping_type"] = json!(["add_score(V4P)"]);
    });
    assert!(matches!(
        undeclared,
        Err(ContractLoadError::UnknownRowGroup { kind, .. }) if kind == "add_score"
    ));
}

#[test]
fn chain_validation() {
    let reversed = load_modified(|value| {
        field_mut(value, "app_type_enum")["mapping_type"] = json!(["enum", "calculated_field"]);
        field_mut(value, "app_type_enum")["expression"] = json!("WHEN app.score > 1 THEN 'STD'");
    });
    assert!(matches!(
        reversed,
        Err(ContractLoadError::UnsupportedChain { .. })
    ));

    let missing = load_modified(|value| {
        field_mut(value, "app_type_enum")["mapping_type"] = json!(["calculated_field", "enum"]);
    });
    assert!(matches!(
        missing,
        Err(ContractLoadError::MissingExpression { .. })
    ));

    let fallback = load_modified(|value| {
        field_mut(value, "app_type_enum")["mapping_type"] = json!(["calculated_field", "enum"]);
        field_mut(value, "app_type_enum")["expression"] = json!("WHEN app.score > 1 THEN 'STD'");
    })
    .expect("calculated then enum is allowed");
    let field = fallback
        .fields
        .iter()
        .find(|field| field.target_column == "app_type_enum")
        .unwrap();
    assert_eq!(
        field.chain,
        ValueChain::CalculatedThenEnum {
            table: "app_type".into()
        }
    );
}

#[test]
fn lookup_tables_and_scopes_are_checked() {
    let missing_table = load_modified(|value| {
        field_mut(value, "role_enum")["enum_name"] = json!("no_such_table");
    });
    assert!(matches!(
        missing_table,
        Err(ContractLoadError::UnknownLookupTable { kind: "enum", .. })
    ));

    let bad_scope = load_modified(|value| {
        field_mut(value, "score_band")["expression"] = json!("WHEN bureau.score > 1 THEN 'x'");
    });
    assert!(matches!(
        bad_scope,
        Err(ContractLoadError::UnknownScope { scope, .. }) if scope == "bureau"
    ));
}

#[test]
fn structural_errors() {
    assert!(matches!(
        parse_contract("{"),
        Err(ContractLoadError::Json { .. })
    ));
    assert!(matches!(
        load_modified(|value| value["version"] = json!("2")),
        Err(ContractLoadError::UnsupportedVersion { .. })
    ));
    assert!(matches!(
        load_modified(|value| value["application_root"] = json!("relative/path")),
        Err(ContractLoadError::InvalidPath { .. })
    ));
    assert!(matches!(
        load_modified(|value| field_mut(value, "zip")["data_type"] = json!("geometry")),
        Err(ContractLoadError::UnknownDataType { .. })
    ));
}
