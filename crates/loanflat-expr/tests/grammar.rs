//! Grammar-level behavior of contract expressions.

use std::collections::BTreeMap;

use loanflat_expr::{ExprContext, ExprValue, ExpressionError, parse_expression};
use proptest::prelude::*;

fn attrs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

#[test]
fn or_chain_replaces_membership_list() {
    let expr = parse_expression(
        "WHEN app.state = 'CA' OR app.state = 'NV' OR app.state = 'OR' THEN 'west' ELSE 'other'",
    )
    .expect("or chain parses");

    for (state, expected) in [("NV", "west"), ("OR", "west"), ("TX", "other")] {
        let app = attrs(&[("state", state)]);
        let ctx = ExprContext::new().with_scope("app", &app);
        assert_eq!(
            expr.evaluate(&ctx),
            Some(ExprValue::Text(expected.to_string())),
            "state {state}"
        );
    }
}

#[test]
fn membership_list_is_an_authoring_error() {
    let err = parse_expression("WHEN app.state IN ('CA', 'NV') THEN 'west'").unwrap_err();
    assert!(matches!(err, ExpressionError::MembershipList { position: 15 }));
    assert!(err.to_string().contains("OR chain"));
}

#[test]
fn and_is_evaluated_before_or() {
    // a OR (b AND c): true when only `a` holds
    let expr = parse_expression("WHEN s.a = '1' OR s.b = '1' AND s.c = '1' THEN 'hit'").unwrap();
    let only_a = attrs(&[("a", "1"), ("b", "0"), ("c", "0")]);
    let only_b = attrs(&[("a", "0"), ("b", "1"), ("c", "0")]);
    assert!(
        expr.evaluate(&ExprContext::new().with_scope("s", &only_a))
            .is_some()
    );
    assert!(
        expr.evaluate(&ExprContext::new().with_scope("s", &only_b))
            .is_none()
    );
}

#[test]
fn cross_scope_references_resolve_independently() {
    let app = attrs(&[("app_type_code", "SEC")]);
    let contact = attrs(&[("ac_role_tp_c", "PR")]);
    let ctx = ExprContext::new()
        .with_scope("app", &app)
        .with_scope("contact", &contact);
    let expr = parse_expression(
        "CASE WHEN app.app_type_code = 'SEC' AND contact.ac_role_tp_c = 'PR' THEN 'secured' END",
    )
    .unwrap();
    assert_eq!(expr.evaluate(&ctx), Some(ExprValue::Text("secured".into())));
    assert_eq!(expr.scopes(), vec!["app", "contact"]);
}

#[test]
fn keywords_are_case_insensitive() {
    let own = attrs(&[("code", "X1")]);
    let expr = parse_expression("case when code like 'X%' then 'x' else 'y' end").unwrap();
    assert_eq!(
        expr.evaluate(&ExprContext::new().with_own(&own)),
        Some(ExprValue::Text("x".into()))
    );
}

proptest! {
    #[test]
    fn numeric_comparison_matches_integer_ordering(a in -10_000i64..10_000, b in -10_000i64..10_000) {
        let own = attrs(&[("n", a.to_string().as_str())]);
        let expr = parse_expression(&format!("WHEN n > {b} THEN 'gt' WHEN n < {b} THEN 'lt' ELSE 'eq'")).unwrap();
        let expected = match a.cmp(&b) {
            std::cmp::Ordering::Greater => "gt",
            std::cmp::Ordering::Less => "lt",
            std::cmp::Ordering::Equal => "eq",
        };
        prop_assert_eq!(
            expr.evaluate(&ExprContext::new().with_own(&own)),
            Some(ExprValue::Text(expected.to_string()))
        );
    }
}
