use std::collections::BTreeSet;

use loanflat_ingest::{Document, EntityResolver, SelectiveReader};
use loanflat_model::{EntityConfig, RequiredPaths};
use proptest::prelude::*;

fn contact_config() -> EntityConfig {
    EntityConfig {
        path: "/root/application/contact".into(),
        element: "contact".into(),
        identity_attribute: "con_id".into(),
        identity_column: "con_id".into(),
        role_attribute: "role".into(),
        allowed_roles: BTreeSet::from(["PR".to_string(), "AUTHU".to_string()]),
        required: false,
    }
}

#[test]
fn last_duplicate_entity_wins_whole() {
    // element positions: root 0, application 1, contacts at 2, 5 and 9
    let xml = r#"
        <root>
          <application>
            <contact con_id="C1" role="PR" first="a" email="a@x"/>
            <note/>
            <note/>
            <contact con_id="C1" role="PR" first="b"/>
            <note/>
            <note/>
            <note/>
            <contact con_id="C1" role="PR" first="c"/>
            <contact con_id="C2" role="AUTHU" first="d"/>
          </application>
        </root>"#;
    let doc = Document::parse(xml).unwrap();
    let config = contact_config();
    let resolution = EntityResolver::new(&config).resolve(&doc);

    assert_eq!(resolution.entities.len(), 2);
    assert_eq!(resolution.replaced, 2);

    let winner = &resolution.entities[0];
    assert_eq!(winner.identity, "C1");
    assert_eq!(winner.position, 9);
    assert_eq!(winner.attribute("first"), Some("c"));
    // whole-entity replacement: nothing carried over from position 2
    assert_eq!(winner.attribute("email"), None);

    assert_eq!(resolution.entities[1].identity, "C2");
}

#[test]
fn same_identity_different_role_is_a_different_entity() {
    let xml = r#"<root><application>
        <contact con_id="C1" role="PR"/>
        <contact con_id="C1" role="AUTHU"/>
    </application></root>"#;
    let doc = Document::parse(xml).unwrap();
    let config = contact_config();
    let resolution = EntityResolver::new(&config).resolve(&doc);
    let roles: Vec<&str> = resolution
        .entities
        .iter()
        .map(|entity| entity.role.as_str())
        .collect();
    assert_eq!(roles, vec!["PR", "AUTHU"]);
}

#[test]
fn index_and_resolver_disagree_on_multiplicity() {
    let xml = r#"<root><application>
        <contact con_id="C1" role="PR"/>
        <contact con_id="C2" role="PR"/>
    </application></root>"#;
    let doc = Document::parse(xml).unwrap();
    let mut required = RequiredPaths::default();
    required
        .paths
        .insert("/root/application/contact".to_string());
    let index = SelectiveReader::new(&required).read(&doc);
    assert_eq!(
        index.attribute("/root/application/contact", "con_id"),
        Some("C2")
    );

    let config = contact_config();
    assert_eq!(EntityResolver::new(&config).resolve(&doc).entities.len(), 2);
}

fn subtree(tags: &[&str], depth: usize, width: usize, level: usize) -> String {
    if level == depth {
        return String::new();
    }
    let tag = tags[level % tags.len()];
    let mut xml = String::new();
    for n in 0..width {
        xml.push_str(&format!(r#"<{tag} n="{n}">"#));
        xml.push_str(&subtree(tags, depth, width, level + 1));
        xml.push_str(&format!("</{tag}>"));
    }
    xml
}

proptest! {
    #[test]
    fn unrequired_sibling_subtree_is_never_indexed(
        depth in 1usize..5,
        width in 1usize..4,
        tags in prop::collection::vec(prop::sample::select(vec!["B", "C", "D"]), 1..6),
    ) {
        let xml = format!(
            r#"<Root><A><B v="keep"/><C>{}</C></A></Root>"#,
            subtree(&tags, depth, width, 0)
        );
        let doc = Document::parse(&xml).unwrap();

        let mut required = RequiredPaths::default();
        for path in ["/Root", "/Root/A", "/Root/A/B"] {
            required.paths.insert(path.to_string());
        }
        required.element_names.insert("B".to_string());

        let (index, stats) = SelectiveReader::new(&required).read_with_stats(&doc);

        prop_assert_eq!(index.attribute("/Root/A/B", "v"), Some("keep"));
        prop_assert!(index.paths().all(|path| !path.starts_with("/Root/A/C")));
        // Root, A, B and C itself; nothing below C is visited
        prop_assert_eq!(stats.visited, 4);
        prop_assert_eq!(stats.pruned, 1);
    }
}
