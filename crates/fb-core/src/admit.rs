//! Admission checks for caller-built nodes.
//!
//! The addressed mutators write whatever they are given. Callers that
//! accept nodes, lists or values from outside run them through here first,
//! so a payload that would reuse an id or bind a missing field is refused
//! before anything is written.

use crate::error::{FormError, Result};
use crate::fields::find_field;
use crate::id::{ListId, NodeId};
use crate::locate::{find_list, find_node, walk};
use crate::model::{DataBag, ElementKind, Field, ItemList, Node, NodeValue, Tab, is_unbound};
use crate::registry::{all_field_props, field_props};
use serde_json::Value;
use std::collections::HashSet;
use std::ops::ControlFlow;

// ─── Ids in use ──────────────────────────────────────────────────────────

/// Node and list ids taken by a tree.
#[derive(Debug, Default)]
struct IdsInUse {
    nodes: HashSet<NodeId>,
    lists: HashSet<ListId>,
}

impl IdsInUse {
    fn of(root: &ItemList) -> Self {
        let mut ids = Self::default();
        ids.lists.insert(root.list_id);
        let _: ControlFlow<()> = walk(root, &mut |v| {
            ids.nodes.insert(v.node.id);
            ids.lists.extend(v.node.tabs().iter().map(|t| t.items.list_id));
            ControlFlow::Continue(())
        });
        ids
    }

    /// Forget everything below `list`. The list's own id stays taken.
    fn release_contents(&mut self, list: &ItemList) {
        let _: ControlFlow<()> = walk(list, &mut |v| {
            self.nodes.remove(&v.node.id);
            for tab in v.node.tabs() {
                self.lists.remove(&tab.items.list_id);
            }
            ControlFlow::Continue(())
        });
    }

    fn claim_node(&mut self, id: NodeId) -> Result<()> {
        if self.nodes.insert(id) {
            Ok(())
        } else {
            Err(FormError::DuplicateId(id.to_string()))
        }
    }

    fn claim_list(&mut self, id: ListId) -> Result<()> {
        if self.lists.insert(id) {
            Ok(())
        } else {
            Err(FormError::DuplicateId(id.to_string()))
        }
    }
}

// ─── Bindings ────────────────────────────────────────────────────────────

/// Every bound field property in `data` must be one of `kind`'s field
/// properties and name a catalog field.
pub fn check_bindings(fields: &[Field], kind: ElementKind, data: &DataBag) -> Result<()> {
    let own = field_props(kind);
    for prop in all_field_props() {
        let Some(keyname) = data.get(*prop).and_then(Value::as_str) else {
            continue;
        };
        if is_unbound(keyname) {
            continue;
        }
        if !own.contains(prop) {
            return Err(FormError::NotAFieldProp {
                kind: kind.as_str(),
                prop: (*prop).to_string(),
            });
        }
        if find_field(fields, keyname).is_none() {
            return Err(FormError::FieldNotFound(keyname.to_string()));
        }
    }
    Ok(())
}

/// `prop` must be a field property of `kind`.
pub fn check_field_prop(kind: ElementKind, prop: &str) -> Result<()> {
    if field_props(kind).iter().any(|p| *p == prop) {
        Ok(())
    } else {
        Err(FormError::NotAFieldProp {
            kind: kind.as_str(),
            prop: prop.to_string(),
        })
    }
}

fn admit_nodes(ids: &mut IdsInUse, fields: &[Field], nodes: &[Node]) -> Result<()> {
    for node in nodes {
        ids.claim_node(node.id)?;
        check_bindings(fields, node.kind(), &node.data)?;
        admit_tabs(ids, fields, node.tabs())?;
    }
    Ok(())
}

fn admit_tabs(ids: &mut IdsInUse, fields: &[Field], tabs: &[Tab]) -> Result<()> {
    for tab in tabs {
        ids.claim_list(tab.items.list_id)?;
        admit_nodes(ids, fields, &tab.items.list)?;
    }
    Ok(())
}

// ─── Payloads ────────────────────────────────────────────────────────────

/// Check `node` before it is inserted anywhere under `root`.
pub fn admit_node(root: &ItemList, fields: &[Field], node: &Node) -> Result<()> {
    let mut ids = IdsInUse::of(root);
    admit_nodes(&mut ids, fields, std::slice::from_ref(node))
}

/// Check `items` before they replace the contents of list `list_id`.
///
/// Ids of the nodes being replaced may come back, so reordering a list
/// with its own nodes is accepted. Unknown lists pass; the mutator
/// ignores them.
pub fn admit_list(root: &ItemList, fields: &[Field], list_id: ListId, items: &[Node]) -> Result<()> {
    let Some(list) = find_list(root, list_id) else {
        return Ok(());
    };
    let mut ids = IdsInUse::of(root);
    ids.release_contents(list);
    admit_nodes(&mut ids, fields, items)
}

/// Check `value` before it replaces the value of node `id`.
///
/// The element type is fixed once placed, and only tabs elements hold
/// tabs. Tab lists may keep their current ids or take unused ones.
pub fn admit_value(root: &ItemList, fields: &[Field], id: NodeId, value: &NodeValue) -> Result<()> {
    let Some(node) = find_node(root, id) else {
        return Ok(());
    };
    if value.kind != node.kind() {
        return Err(FormError::KindChanged {
            from: node.kind().as_str(),
            to: value.kind.as_str(),
        });
    }
    let tabs = value.tabs.as_deref().unwrap_or_default();
    if node.kind() != ElementKind::Tabs && !tabs.is_empty() {
        return Err(FormError::InvalidItem(format!("{} cannot hold tabs", node.kind().as_str())));
    }
    let mut ids = IdsInUse::of(root);
    for tab in node.tabs() {
        ids.lists.remove(&tab.items.list_id);
        ids.release_contents(&tab.items);
    }
    admit_tabs(&mut ids, fields, tabs)
}
