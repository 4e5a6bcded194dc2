//! Consistency diagnostics for form documents.
//!
//! Reports broken invariants without modifying the document. A document
//! built only through the mutators never yields an `Error`; hand-edited
//! or legacy documents may.

use crate::id::NodeId;
use crate::locate::{Visit, walk};
use crate::model::{Document, is_unbound};
use crate::registry::{PropKind, all_field_props, spec};
use std::collections::HashSet;
use std::ops::ControlFlow;

// ─── Diagnostic types ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// An invariant is broken; saving would persist bad data.
    Error,
    /// Tolerated, but likely not what the author wants.
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Node the finding refers to; `None` for catalog findings.
    pub node_id: Option<NodeId>,
    pub message: String,
    pub severity: Severity,
    /// Short rule identifier (e.g. "dangling-field").
    pub rule: &'static str,
}

impl Diagnostic {
    fn error(node_id: Option<NodeId>, rule: &'static str, message: String) -> Self {
        Self {
            node_id,
            message,
            severity: Severity::Error,
            rule,
        }
    }

    fn warning(node_id: Option<NodeId>, rule: &'static str, message: String) -> Self {
        Self {
            node_id,
            message,
            severity: Severity::Warning,
            rule,
        }
    }
}

// ─── Public API ──────────────────────────────────────────────────────────

#[must_use]
pub fn check_document(doc: &Document) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    check_ids(doc, &mut diags);
    check_keynames(doc, &mut diags);
    let _: ControlFlow<()> = walk(&doc.root, &mut |v| {
        check_field_refs(doc, &v, &mut diags);
        check_active_tab(&v, &mut diags);
        check_ranges(&v, &mut diags);
        ControlFlow::Continue(())
    });
    diags
}

// ─── Rules ───────────────────────────────────────────────────────────────

fn check_ids(doc: &Document, diags: &mut Vec<Diagnostic>) {
    let mut nodes = HashSet::new();
    let mut lists = HashSet::from([doc.root.list_id]);
    let _: ControlFlow<()> = walk(&doc.root, &mut |v| {
        if !nodes.insert(v.node.id) {
            diags.push(Diagnostic::error(
                Some(v.node.id),
                "duplicate-node-id",
                format!("Node id {} is used more than once", v.node.id),
            ));
        }
        for tab in v.node.tabs() {
            if !lists.insert(tab.items.list_id) {
                diags.push(Diagnostic::error(
                    Some(v.node.id),
                    "duplicate-list-id",
                    format!("List id {} is used more than once", tab.items.list_id),
                ));
            }
        }
        ControlFlow::Continue(())
    });
}

fn check_keynames(doc: &Document, diags: &mut Vec<Diagnostic>) {
    let mut seen = HashSet::new();
    for field in &doc.fields {
        if !seen.insert(field.keyname.as_str()) {
            diags.push(Diagnostic::error(
                None,
                "duplicate-keyname",
                format!("Field `{}` is declared more than once", field.keyname),
            ));
        }
    }
}

fn check_field_refs(doc: &Document, v: &Visit<'_>, diags: &mut Vec<Diagnostic>) {
    for prop in all_field_props() {
        let Some(keyname) = v.node.data_str(prop) else {
            continue;
        };
        if is_unbound(keyname) || doc.fields.iter().any(|f| f.keyname == keyname) {
            continue;
        }
        diags.push(Diagnostic::error(
            Some(v.node.id),
            "dangling-field",
            format!("`{prop}` of {} refers to unknown field `{keyname}`", v.node.id),
        ));
    }
}

fn check_active_tab(v: &Visit<'_>, diags: &mut Vec<Diagnostic>) {
    let tabs = v.node.tabs();
    if tabs.is_empty() {
        return;
    }
    let active = tabs.iter().filter(|t| t.active).count();
    if active != 1 {
        diags.push(Diagnostic::warning(
            Some(v.node.id),
            "active-tab",
            format!("Tabs {} have {active} active tabs, expected one", v.node.id),
        ));
    }
}

fn check_ranges(v: &Visit<'_>, diags: &mut Vec<Diagnostic>) {
    let Some(spec) = spec(v.node.kind()) else {
        return;
    };
    for prop in spec.schema {
        let PropKind::Number { min, max } = prop.kind else {
            continue;
        };
        let Some(value) = v.node.data.get(prop.key) else {
            continue;
        };
        let in_range = value.as_i64().is_some_and(|n| (min..=max).contains(&n));
        if !in_range {
            diags.push(Diagnostic::warning(
                Some(v.node.id),
                "out-of-range",
                format!("`{}` of {} must be within {min}..={max}, got {value}", prop.key, v.node.id),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::IdAllocator;
    use crate::model::{ElementKind, Field, FieldDatatype};
    use crate::registry::new_node;
    use serde_json::json;

    fn rules(doc: &Document) -> Vec<&'static str> {
        check_document(doc).into_iter().map(|d| d.rule).collect()
    }

    #[test]
    fn clean_document_has_no_diagnostics() {
        let mut ids = IdAllocator::new();
        let mut doc = Document::default();
        let mut node = new_node(ElementKind::Textbox, &mut ids);
        node.data.insert("field".into(), json!("name"));
        doc.root.list.push(node);
        doc.root.list.push(new_node(ElementKind::Tabs, &mut ids));
        doc.fields.push(Field::new("name", "Name", FieldDatatype::String));
        assert!(check_document(&doc).is_empty());
    }

    #[test]
    fn dangling_references_and_duplicate_keynames() {
        let mut ids = IdAllocator::new();
        let mut doc = Document::default();
        let mut node = new_node(ElementKind::Coordinates, &mut ids);
        node.data.insert("field_lon".into(), json!("lon"));
        node.data.insert("field_lat".into(), json!("-"));
        doc.root.list.push(node);
        doc.fields.push(Field::new("x", "X", FieldDatatype::Real));
        doc.fields.push(Field::new("x", "X again", FieldDatatype::Real));
        assert_eq!(rules(&doc), vec!["duplicate-keyname", "dangling-field"]);
    }

    #[test]
    fn duplicate_ids() {
        let mut ids = IdAllocator::new();
        let mut doc = Document::default();
        let node = new_node(ElementKind::Spacer, &mut ids);
        doc.root.list.push(node.clone());
        doc.root.list.push(node);
        assert_eq!(rules(&doc), vec!["duplicate-node-id"]);
    }

    #[test]
    fn active_tab_count_and_ranges() {
        let mut ids = IdAllocator::new();
        let mut doc = Document::default();
        let mut tabs = new_node(ElementKind::Tabs, &mut ids);
        for tab in tabs.tabs_mut().unwrap().iter_mut() {
            tab.active = false;
        }
        let mut avg = new_node(ElementKind::Average, &mut ids);
        avg.data.insert("samples".into(), json!(12));
        doc.root.list.push(tabs);
        doc.root.list.push(avg);

        let diags = check_document(&doc);
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].rule, "active-tab");
        assert_eq!(diags[1].rule, "out-of-range");
        assert!(diags.iter().all(|d| d.severity == Severity::Warning));
    }
}
