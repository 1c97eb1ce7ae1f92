use chrono::NaiveDate;
use loanflat_contract::parse_contract;
use loanflat_core::{
    DiagnosticLevel, DocumentOutput, EngineError, EngineOptions, FixedClock, MappingEngine,
};
use loanflat_ingest::Document;
use loanflat_model::CellValue;
use proptest::prelude::*;

const CONTRACT: &str = include_str!("../../loanflat-contract/tests/fixtures/credit_card.json");

const COLLATERAL: &str = r#"<collateral_info collateral_1_value="15000" collateral_1_make="ACME" collateral_2_value="0" collateral_4_value="2500.5" collateral_4_make="ZETA"/>"#;

const DOCUMENT: &str = r#"<Provenir>
  <Request>
    <CustData>
      <application app_id="1001" app_type_code="STD" app_receive_date="2024-03-01" score="712" status="">
        <contact con_id="C1" ac_role_tp_c="PR" first_name="Annabelle" email="ann@example.com" home_owner="Y" cell_phone="(555) 123-4567">
          <contact_address address_tp_c="PREV" city="Boston" zip="02101"/>
          <contact_address address_tp_c="CURR" city="Austin" zip="73301"/>
        </contact>
        <contact con_id="C2" ac_role_tp_c="AUTHU" first_name="Bo"/>
        COLLATERAL
      </application>
    </CustData>
  </Request>
</Provenir>"#;

fn engine() -> MappingEngine {
    MappingEngine::new(parse_contract(CONTRACT).expect("fixture contract loads"))
}

fn clock() -> FixedClock {
    FixedClock(
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .and_then(|date| date.and_hms_opt(12, 0, 0))
            .expect("valid timestamp"),
    )
}

fn document(collateral: &str) -> String {
    DOCUMENT.replace("COLLATERAL", collateral)
}

fn process(xml: &str) -> Result<DocumentOutput, EngineError> {
    let doc = Document::parse(xml).expect("test document parses");
    engine().process(&doc, &clock())
}

fn slots(output: &DocumentOutput) -> Vec<CellValue> {
    output
        .tables
        .table("app_collateral")
        .unwrap_or_default()
        .iter()
        .filter_map(|record| record.get("collateral_slot").cloned())
        .collect()
}

#[test]
fn flattens_the_credit_card_application() {
    let output = process(&document(COLLATERAL)).unwrap();
    assert_eq!(output.document_id, "1001");

    insta::assert_json_snapshot!(output.tables, @r#"
    {
      "app_base": [
        {
          "app_id": 1001,
          "app_type_enum": 30,
          "authorized_user_name": "Bo",
          "created_on": "2024-06-01 12:00:00",
          "primary_email": "ann@example.com",
          "receive_date": "2024-03-01",
          "score_band": "prime",
          "status_enum": 1
        }
      ],
      "app_collateral": [
        {
          "app_id": 1001,
          "collateral_slot": 1,
          "make": "ACME",
          "value": "15000.00"
        },
        {
          "app_id": 1001,
          "collateral_slot": 4,
          "make": "ZETA",
          "value": "2500.50"
        }
      ],
      "contact_address": [
        {
          "city": "Austin",
          "con_id": "C1",
          "zip": "73301"
        },
        {
          "con_id": "C2"
        }
      ],
      "contact_base": [
        {
          "app_id": 1001,
          "cell_phone": "5551234567",
          "con_id": "C1",
          "first_name": "Annab",
          "home_owner_flag": 1,
          "role_enum": 1,
          "segment": "core"
        },
        {
          "app_id": 1001,
          "con_id": "C2",
          "first_name": "Bo",
          "home_owner_flag": 0,
          "role_enum": 2,
          "segment": "other"
        }
      ]
    }
    "#);

    let report = &output.report;
    assert_eq!(report.records_emitted, 7);
    assert_eq!(report.records_suppressed, 2);
    assert_eq!(report.truncated_values, 1);
    assert_eq!(report.field_errors, 0);
    assert_eq!(report.table_errors, 0);
}

#[test]
fn zero_placeholder_alone_is_not_a_record() {
    let zero_only = process(&document(r#"<collateral_info collateral_2_value="0"/>"#)).unwrap();
    assert!(zero_only.tables.table("app_collateral").is_none());

    let with_make = process(&document(
        r#"<collateral_info collateral_2_value="0" collateral_2_make="ACME"/>"#,
    ))
    .unwrap();
    let records = with_make.tables.table("app_collateral").unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get("value"), Some(&CellValue::Decimal("0.00".into())));
    assert_eq!(records[0].get("make"), Some(&CellValue::Text("ACME".into())));
}

#[test]
fn skipped_slot_does_not_renumber_later_slots() {
    let output = process(&document(
        r#"<collateral_info collateral_1_make="A" collateral_2_make="B" collateral_4_make="D"/>"#,
    ))
    .unwrap();
    assert_eq!(
        slots(&output),
        vec![
            CellValue::Integer(1),
            CellValue::Integer(2),
            CellValue::Integer(4)
        ]
    );
}

#[test]
fn missing_document_id_is_fatal() {
    let xml = document(COLLATERAL).replace(r#"app_id="1001" "#, "");
    assert!(matches!(
        process(&xml),
        Err(EngineError::MissingDocumentId { ref attribute, .. }) if attribute == "app_id"
    ));
}

#[test]
fn entities_are_optional_unless_strict() {
    let xml = r#"<Provenir><Request><CustData>
        <application app_id="7" app_type_code="PRM"/>
    </CustData></Request></Provenir>"#;
    let doc = Document::parse(xml).unwrap();

    let output = engine().process(&doc, &clock()).unwrap();
    assert!(output.tables.table("contact_base").is_none());
    assert!(output.tables.table("app_base").is_some());
    assert!(output.report.warning_count() > 0);

    let strict = engine().with_options(EngineOptions::default().with_strict_entities(true));
    assert!(matches!(
        strict.process(&doc, &clock()),
        Err(EngineError::NoEntities { .. })
    ));
}

#[test]
fn dropped_entities_are_reported() {
    let xml = document(COLLATERAL).replace(
        r#"<contact con_id="C2" ac_role_tp_c="AUTHU" first_name="Bo"/>"#,
        r#"<contact con_id="C2" ac_role_tp_c="AUTHU" first_name="Bo"/><contact con_id="C9" ac_role_tp_c="GUAR"/>"#,
    );
    let output = process(&xml).unwrap();
    assert_eq!(output.report.dropped_entities, 1);
    assert_eq!(output.tables.table("contact_base").map(<[_]>::len), Some(2));
}

#[test]
fn later_duplicate_entity_wins_and_is_noted() {
    let xml = document(COLLATERAL).replace(
        r#"<contact con_id="C2" ac_role_tp_c="AUTHU" first_name="Bo"/>"#,
        r#"<contact con_id="C2" ac_role_tp_c="AUTHU" first_name="Bo"/><contact con_id="C1" ac_role_tp_c="PR" first_name="Zed"/>"#,
    );
    let output = process(&xml).unwrap();
    assert_eq!(output.report.replaced_entities, 1);
    assert!(
        output
            .report
            .diagnostics
            .iter()
            .any(|d| d.level == DiagnosticLevel::Info && d.message.contains("replaced"))
    );

    let contacts = output.tables.table("contact_base").unwrap();
    assert_eq!(contacts.len(), 2);
    assert_eq!(contacts[0].get("con_id"), Some(&CellValue::Text("C1".into())));
    assert_eq!(contacts[0].get("first_name"), Some(&CellValue::Text("Zed".into())));
}

#[test]
fn key_that_cannot_be_typed_fails_only_its_tables() {
    let xml = document(COLLATERAL).replace(r#"app_id="1001""#, r#"app_id="A-1""#);
    let output = process(&xml).unwrap();
    let report = &output.report;

    // app_id is typed int: the app_base field fails, child tables lose their key
    assert_eq!(report.field_errors, 1);
    assert_eq!(report.missing_required, 1);
    assert_eq!(report.table_errors, 2);
    assert!(output.tables.table("contact_base").is_none());
    assert!(output.tables.table("app_collateral").is_none());
    assert!(output.tables.table("app_base").is_some());
    assert_eq!(
        output.tables.table("contact_address").map(<[_]>::len),
        Some(2)
    );
    assert_eq!(
        report
            .diagnostics
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Error)
            .count(),
        2
    );
}

fn contact_xml(id: u8, role: &str, name: &str) -> String {
    format!(r#"<contact con_id="C{id}" ac_role_tp_c="{role}" first_name="{name}"/>"#)
}

proptest! {
    #[test]
    fn repeated_runs_are_identical(
        contacts in prop::collection::vec(
            (1u8..4, prop::sample::select(vec!["PR", "AUTHU", "GUAR"]), "[a-z]{0,8}"),
            0..6,
        ),
        values in prop::collection::vec(prop::option::of(0u32..5000), 4),
    ) {
        let contacts: String = contacts
            .iter()
            .map(|(id, role, name)| contact_xml(*id, role, name))
            .collect();
        let collateral: String = values
            .iter()
            .enumerate()
            .filter_map(|(slot, value)| {
                value.map(|value| format!(r#" collateral_{}_value="{value}""#, slot + 1))
            })
            .collect();
        let xml = format!(
            r#"<Provenir><Request><CustData><application app_id="5" app_type_code="STD">{contacts}<collateral_info{collateral}/></application></CustData></Request></Provenir>"#
        );

        let first = process(&xml).unwrap();
        let second = process(&xml).unwrap();
        prop_assert_eq!(
            serde_json::to_string(&first.tables).unwrap(),
            serde_json::to_string(&second.tables).unwrap()
        );
        prop_assert_eq!(first, second);
    }
}
