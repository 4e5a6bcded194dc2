//! Integration tests: persisted document ↔ editable tree.
//!
//! Loads full documents, checks the tree they produce, and verifies
//! that saving them again yields the same persisted content.

use fb_core::check::check_document;
use fb_core::id::IdAllocator;
use fb_core::locate::{find_node, max_id, node_count};
use fb_core::model::*;
use fb_core::persist::{PersistedDocument, deserialize, initial_value, serialize};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

fn load(input: &str) -> (Document, IdAllocator) {
    Document::from_json(input).unwrap()
}

#[test]
fn survey_roundtrips_unchanged() {
    let input = include_str!("fixtures/survey.json");
    let (doc, _) = load(input);

    let original: Value = serde_json::from_str(input).unwrap();
    let saved = serde_json::to_value(doc.to_persisted()).unwrap();
    assert_eq!(saved, original);
}

#[test]
fn survey_tree_shape() {
    let (doc, ids) = load(include_str!("fixtures/survey.json"));

    assert_eq!(doc.geometry_type, GeometryType::Point);
    assert!(doc.update_feature_layer_fields);
    assert_eq!(doc.fields.len(), 5);
    assert!(doc.fields.iter().all(|f| !f.existing));

    assert_eq!(doc.root.list_id, fb_core::ListId::ROOT);
    assert_eq!(node_count(&doc.root), 8);
    let tabs = &doc.root.list[1];
    assert_eq!(tabs.kind(), ElementKind::Tabs);
    assert_eq!(tabs.value.name, "Tabs");
    let titles: Vec<&str> = tabs.tabs().iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["General", "Details"]);

    let visited = &tabs.tabs()[0].items.list[1];
    let moment = initial_value(&visited.data).unwrap();
    assert_eq!(moment.date().to_string(), "2024-03-15");

    assert!(ids.last_issued() >= max_id(&doc.root));
    assert!(check_document(&doc).is_empty());
}

#[test]
fn reloading_assigns_new_ids_but_same_content() {
    let (doc, mut ids) = load(include_str!("fixtures/survey.json"));
    let items = serialize(&doc.root);

    let again = deserialize(&items, &mut ids);
    let first_id = doc.root.list[0].id;
    assert!(find_node(&again, first_id).is_none());
    assert_eq!(serialize(&again), items);
}

#[test]
fn markers_and_current_sentinel_are_dropped() {
    let (doc, _) = load(include_str!("fixtures/with_markers.json"));

    assert_eq!(doc.root.len(), 2);
    assert_eq!(node_count(&doc.root), 3);
    let when = &doc.root.list[1].tabs()[0].items.list[0];
    assert_eq!(when.kind(), ElementKind::Datetime);
    assert!(when.data.get("initial").is_none());

    let saved = serde_json::to_value(doc.to_persisted()).unwrap();
    assert_eq!(
        saved["items"],
        json!([
            {"type": "textbox", "field": "note", "remember": true, "max_lines": 4, "numbers_only": false},
            {"type": "tabs", "tabs": [
                {"title": "Only", "active": true, "items": [
                    {"type": "datetime", "field": "when", "datetime": "datetime", "remember": false}
                ]}
            ]}
        ])
    );
}

#[test]
fn malformed_documents_are_errors() {
    let err = Document::from_json(r#"{"items": [{"type": "hologram"}]}"#).unwrap_err();
    assert!(err.to_string().starts_with("Serialization error"));
    assert!(Document::from_json("not json").is_err());
    assert!(serde_json::from_str::<PersistedDocument>(r#"{"items": [{"label": "x"}]}"#).is_err());
}
