use chrono::{NaiveDate, NaiveDateTime};
use loanflat_contract::parse_contract;
use loanflat_ingest::{Document, EntityResolver, SelectiveReader};
use loanflat_model::{CellValue, MappingContract, ValueSource};
use loanflat_transform::{ChainExecutor, FieldOutcome, FieldTransformError, SourceScope};

const CONTRACT: &str = r#"{
  "version": "1",
  "name": "chain-tests",
  "application_root": "/doc/app",
  "document_identity": { "path": "/doc/app", "attribute": "app_id", "column": "app_id" },
  "entity": {
    "path": "/doc/app/party",
    "identity_attribute": "pid",
    "identity_column": "pid",
    "role_attribute": "role",
    "allowed_roles": ["PR", "CO"]
  },
  "roles": { "primary": "PR", "secondary": "CO" },
  "current_address": { "element": "address", "attribute": "type", "value": "CURR" },
  "expression_scopes": { "app": "/doc/app" },
  "fields": [
    { "source_path": "/doc/app", "source_attribute": "app_id",
      "target_table": "app_summary", "target_column": "app_id", "data_type": "int",
      "required": true, "nullable": false },
    { "source_path": "/doc/app/contact_info", "source_attribute": "code",
      "target_table": "app_summary", "target_column": "contact_email", "data_type": "varchar(60)",
      "mapping_type": ["calculated_field", "enum"], "enum_name": "email_by_code",
      "expression": "CASE WHEN app.kind = 'VIP' THEN 'vip@bank.example' END" },
    { "source_path": "/doc/app", "source_attribute": "kind",
      "target_table": "app_summary", "target_column": "kind_enum", "data_type": "smallint",
      "mapping_type": "enum", "enum_name": "kinds" },
    { "source_path": "/doc/app", "source_attribute": "kind",
      "target_table": "app_summary", "target_column": "strict_enum", "data_type": "smallint",
      "mapping_type": "enum", "enum_name": "strict_kinds" },
    { "source_path": "/doc/app", "source_attribute": "paperless",
      "target_table": "app_summary", "target_column": "paperless", "data_type": "bit",
      "mapping_type": "char_to_bit", "bit_name": "yn" },
    { "source_path": "/doc/app", "source_attribute": "phone",
      "target_table": "app_summary", "target_column": "phone", "data_type": "varchar(15)",
      "mapping_type": "numbers_only" },
    { "source_path": "/doc/app", "source_attribute": "created",
      "target_table": "app_summary", "target_column": "created", "data_type": "datetime",
      "mapping_type": "default_getutcdate_if_null" },
    { "source_path": "/doc/app", "source_attribute": "score",
      "target_table": "app_summary", "target_column": "score", "data_type": "smallint",
      "default_value": 0 },
    { "source_path": "/doc/app/party", "source_attribute": "name",
      "target_table": "app_summary", "target_column": "co_name", "data_type": "varchar(20)",
      "mapping_type": "secondary_contact" },
    { "source_path": "/doc/app/party", "source_attribute": "pid",
      "target_table": "party_base", "target_column": "pid", "data_type": "varchar(5)" },
    { "source_path": "/doc/app/party/address", "source_attribute": "city",
      "target_table": "party_base", "target_column": "city", "data_type": "varchar(3)",
      "mapping_type": "curr_address_only" },
    { "source_path": "/doc/app/party", "source_attribute": "city",
      "target_table": "party_base", "target_column": "home_city", "data_type": "varchar(20)",
      "mapping_type": "curr_address_only" },
    { "source_path": "/doc/app/party/employer", "source_attribute": "city",
      "target_table": "party_base", "target_column": "work_city", "data_type": "varchar(20)",
      "mapping_type": "curr_address_only" },
    { "source_path": "/doc/app/collateral_std", "source_attribute": "make",
      "target_table": "app_asset", "target_column": "make", "data_type": "varchar(20)" }
  ],
  "relationships": [
    { "parent_table": "app_summary", "child_table": "app_asset", "foreign_key_column": "app_id",
      "parent_path": "/doc/app", "child_path": "/doc/app/collateral_alt" }
  ],
  "enum_mappings": {
    "email_by_code": { "6010": "wendy.dotson@example.com" },
    "kinds": { "STD": 1, "PRM": 2, "": 9 },
    "strict_kinds": { "STD": 1, "PRM": 2 }
  },
  "bit_conversions": { "yn": { "Y": 1, "N": 0 } }
}"#;

const DOCUMENT: &str = r#"
<doc>
  <app app_id="77" kind="STD" score="712" phone="(555) 123-4567" paperless="Y">
    <contact_info code="6010"/>
    <party pid="P1" role="PR" name="Ann" city="Elsewhere">
      <employer city="Dallas"/>
      <address type="CURR" city="Austin"/>
      <address type="PREV" city="Boston"/>
    </party>
    <party pid="P2" role="CO" name="Bo"/>
    <party pid="P3" role="CO" name="Cy"/>
    <collateral_alt make="ACME"/>
  </app>
</doc>"#;

fn contract() -> MappingContract {
    parse_contract(CONTRACT).expect("test contract loads")
}

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1)
        .and_then(|date| date.and_hms_opt(12, 30, 0))
        .expect("valid timestamp")
}

/// Run one field of `table` against `xml`, optionally for the entity `current`.
fn run(xml: &str, table: &str, column: &str, current: Option<&str>) -> FieldOutcome {
    let contract = contract();
    let doc = Document::parse(xml).expect("test document parses");
    let index = SelectiveReader::new(&contract.paths).read(&doc);
    let entities = EntityResolver::new(&contract.entity).resolve(&doc).entities;
    let layout = contract.table(table).expect("table exists");
    let field = contract
        .fields
        .iter()
        .find(|field| field.target_table == table && field.target_column == column)
        .expect("field exists");

    let scope = SourceScope {
        index: &index,
        entities: &entities,
        current: current.and_then(|id| entities.iter().find(|entity| entity.identity == id)),
        table: layout,
        now: now(),
    };
    ChainExecutor::new(&contract).execute(field, &scope)
}

fn summary(xml: &str, column: &str) -> FieldOutcome {
    run(xml, "app_summary", column, None)
}

#[test]
fn calculated_fallback_looks_up_the_original_raw_value() {
    let outcome = summary(DOCUMENT, "contact_email");
    assert_eq!(
        outcome.cell,
        Some((
            CellValue::Text("wendy.dotson@example.com".into()),
            ValueSource::Mapped
        ))
    );

    let vip = summary(&DOCUMENT.replace(r#"kind="STD""#, r#"kind="VIP""#), "contact_email");
    assert_eq!(vip.value(), Some(&CellValue::Text("vip@bank.example".into())));
}

#[test]
fn enum_uses_empty_key_default_or_excludes_the_column() {
    let xml = DOCUMENT.replace(r#"kind="STD""#, r#"kind="Z""#);
    assert_eq!(summary(&xml, "kind_enum").value(), Some(&CellValue::Integer(9)));

    let strict = summary(&xml, "strict_enum");
    assert_eq!(strict.cell, None);
    assert_eq!(strict.error, None);

    let lower = DOCUMENT.replace(r#"kind="STD""#, r#"kind="prm""#);
    assert_eq!(summary(&lower, "strict_enum").value(), Some(&CellValue::Integer(2)));
}

#[test]
fn bit_conversion_defaults_to_zero() {
    assert_eq!(
        summary(DOCUMENT, "paperless").cell,
        Some((CellValue::Bit(true), ValueSource::Flag))
    );

    let unmatched = DOCUMENT.replace(r#"paperless="Y""#, r#"paperless="Q""#);
    assert_eq!(
        summary(&unmatched, "paperless").cell,
        Some((CellValue::Bit(false), ValueSource::Flag))
    );

    let absent = DOCUMENT.replace(r#" paperless="Y""#, "");
    assert_eq!(
        summary(&absent, "paperless").cell,
        Some((CellValue::Bit(false), ValueSource::Default))
    );
}

#[test]
fn numeric_extraction() {
    assert_eq!(
        summary(DOCUMENT, "phone").value(),
        Some(&CellValue::Text("5551234567".into()))
    );
    let no_digits = DOCUMENT.replace("(555) 123-4567", "n/a");
    assert_eq!(summary(&no_digits, "phone").cell, None);
}

#[test]
fn timestamp_only_when_missing() {
    assert_eq!(
        summary(DOCUMENT, "created").cell,
        Some((
            CellValue::DateTime("2024-06-01 12:30:00".into()),
            ValueSource::Default
        ))
    );

    let stamped = DOCUMENT.replace(r#"app_id="77""#, r#"app_id="77" created="2024-01-02T03:04:05""#);
    assert_eq!(
        summary(&stamped, "created").cell,
        Some((
            CellValue::DateTime("2024-01-02 03:04:05".into()),
            ValueSource::Mapped
        ))
    );
}

#[test]
fn coercion_failure_falls_back_to_default() {
    assert_eq!(summary(DOCUMENT, "score").value(), Some(&CellValue::Integer(712)));

    let outcome = summary(&DOCUMENT.replace(r#"score="712""#, r#"score="high""#), "score");
    assert_eq!(outcome.cell, Some((CellValue::Integer(0), ValueSource::Default)));
    assert!(matches!(
        outcome.error,
        Some(FieldTransformError::Coercion { ref field, .. }) if field == "app_summary.score"
    ));
}

#[test]
fn missing_required_field_is_flagged() {
    let outcome = summary(&DOCUMENT.replace(r#"app_id="77" "#, ""), "app_id");
    assert_eq!(outcome.cell, None);
    assert!(outcome.missing_required);
}

#[test]
fn selector_reads_last_entity_with_role() {
    assert_eq!(
        summary(DOCUMENT, "co_name").value(),
        Some(&CellValue::Text("Cy".into()))
    );

    let no_co = DOCUMENT.replace(r#"role="CO""#, r#"role="PR""#);
    assert_eq!(summary(&no_co, "co_name").cell, None);
}

#[test]
fn current_address_filters_nested_elements() {
    let outcome = run(DOCUMENT, "party_base", "city", Some("P1"));
    assert_eq!(outcome.value(), Some(&CellValue::Text("Aus".into())));
    assert!(outcome.truncated);

    assert_eq!(run(DOCUMENT, "party_base", "city", Some("P2")).cell, None);
}

#[test]
fn current_address_reads_the_address_element_whatever_the_field_path() {
    let austin = Some(CellValue::Text("Austin".into()));
    assert_eq!(run(DOCUMENT, "party_base", "home_city", Some("P1")).value(), austin.as_ref());
    assert_eq!(run(DOCUMENT, "party_base", "work_city", Some("P1")).value(), austin.as_ref());

    let no_current = DOCUMENT.replace(r#"type="CURR""#, r#"type="OLD""#);
    assert_eq!(run(&no_current, "party_base", "home_city", Some("P1")).cell, None);
}

#[test]
fn absent_variant_path_falls_back_to_relationship_child_path() {
    assert_eq!(
        run(DOCUMENT, "app_asset", "make", None).value(),
        Some(&CellValue::Text("ACME".into()))
    );

    let standard = DOCUMENT.replace(
        r#"<collateral_alt make="ACME"/>"#,
        r#"<collateral_std make="ZETA"/><collateral_alt make="ACME"/>"#,
    );
    assert_eq!(
        run(&standard, "app_asset", "make", None).value(),
        Some(&CellValue::Text("ZETA".into()))
    );
}
