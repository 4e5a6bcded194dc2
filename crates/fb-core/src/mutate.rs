//! Structural edits on a layout tree.
//!
//! Every operation validates its addressing before writing anything, so
//! a call either applies completely or leaves the tree untouched. Stale
//! ids and list ids are no-ops reported through the return value.

use crate::id::{IdAllocator, ListId, NodeId};
use crate::locate::{find_list, find_list_mut, find_node, find_node_mut, is_ancestor, owner_of_list, position_of};
use crate::model::{DataBag, ItemList, Node, NodeValue, Tab, UNBOUND_FIELD};
use crate::registry::{all_field_props, field_props, new_tab};
use serde_json::Value;

// ─── List primitives ─────────────────────────────────────────────────────

/// Insert `node` at `index`, clamped to `[0, len]`.
pub fn insert_at(list: &mut Vec<Node>, index: usize, node: Node) {
    let index = index.min(list.len());
    list.insert(index, node);
}

/// Remove the node at `index`; `None` if out of range.
pub fn remove_at(list: &mut Vec<Node>, index: usize) -> Option<Node> {
    (index < list.len()).then(|| list.remove(index))
}

// ─── Addressed edits ─────────────────────────────────────────────────────

/// Replace the contents of the list `list_id`.
pub fn replace_list(root: &mut ItemList, list_id: ListId, items: Vec<Node>) -> bool {
    match find_list_mut(root, list_id) {
        Some(list) => {
            list.list = items;
            true
        }
        None => {
            log::debug!("replace_list: unknown {list_id}");
            false
        }
    }
}

/// Replace (not merge) the property bag of node `id`.
pub fn set_node_data(root: &mut ItemList, id: NodeId, data: DataBag) -> bool {
    match find_node_mut(root, id) {
        Some(node) => {
            node.data = data;
            true
        }
        None => {
            log::debug!("set_node_data: unknown node {id}");
            false
        }
    }
}

/// Replace the structural descriptor of node `id`.
pub fn set_node_value(root: &mut ItemList, id: NodeId, value: NodeValue) -> bool {
    match find_node_mut(root, id) {
        Some(node) => {
            node.value = value;
            true
        }
        None => {
            log::debug!("set_node_value: unknown node {id}");
            false
        }
    }
}

/// Insert `node` into list `list_id` at `index` (clamped).
pub fn insert_node(root: &mut ItemList, list_id: ListId, index: usize, node: Node) -> bool {
    match find_list_mut(root, list_id) {
        Some(list) => {
            insert_at(&mut list.list, index, node);
            true
        }
        None => {
            log::debug!("insert_node: unknown {list_id}");
            false
        }
    }
}

/// Remove node `id` from its owning list, wherever it is.
pub fn remove_node(root: &mut ItemList, id: NodeId) -> Option<Node> {
    let (list_id, index) = position_of(root, id)?;
    let list = find_list_mut(root, list_id)?;
    remove_at(&mut list.list, index)
}

// ─── Moves ───────────────────────────────────────────────────────────────

/// Why a move was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveRejection {
    UnknownNode,
    UnknownList,
    /// The target list belongs to the moved node or to one of its descendants.
    IntoOwnSubtree,
}

/// Result of `move_node`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Node now sits at `index` of `list_id`.
    Moved { list_id: ListId, index: usize },
    /// Dropped into the gap right before or right after itself.
    Unchanged,
    Rejected(MoveRejection),
}

/// Whether dropping `node` into `list_id` would nest it inside itself.
pub fn would_nest_into_self(root: &ItemList, node: NodeId, list_id: ListId) -> bool {
    match owner_of_list(root, list_id) {
        Some(owner) => owner == node || is_ancestor(root, node, owner),
        None => false,
    }
}

/// Move node `id` into the gap `gap` of list `target`.
///
/// Gaps are numbered over the target list as it is before the move: gap
/// `i` sits before the item currently at index `i`, gap `len` is the end.
/// Within one list, gaps `source` and `source + 1` leave the order as is.
pub fn move_node(root: &mut ItemList, id: NodeId, target: ListId, gap: usize) -> MoveOutcome {
    let Some((source, from)) = position_of(root, id) else {
        return MoveOutcome::Rejected(MoveRejection::UnknownNode);
    };
    let Some(target_len) = find_list(root, target).map(ItemList::len) else {
        return MoveOutcome::Rejected(MoveRejection::UnknownList);
    };
    if would_nest_into_self(root, id, target) {
        return MoveOutcome::Rejected(MoveRejection::IntoOwnSubtree);
    }

    let gap = gap.min(target_len);
    if source == target {
        if gap == from || gap == from + 1 {
            return MoveOutcome::Unchanged;
        }
        let Some(list) = find_list_mut(root, target) else {
            return MoveOutcome::Rejected(MoveRejection::UnknownList);
        };
        let node = list.list.remove(from);
        let index = if gap > from { gap - 1 } else { gap };
        insert_at(&mut list.list, index, node);
        log::debug!("moved {id} within {target}: {from} -> {index}");
        return MoveOutcome::Moved {
            list_id: target,
            index,
        };
    }

    let Some(node) = find_list_mut(root, source).and_then(|l| remove_at(&mut l.list, from)) else {
        return MoveOutcome::Rejected(MoveRejection::UnknownNode);
    };
    // Target was checked above and removing from another list cannot drop it.
    if let Some(list) = find_list_mut(root, target) {
        insert_at(&mut list.list, gap, node);
    }
    log::debug!("moved {id} from {source}[{from}] to {target}[{gap}]");
    MoveOutcome::Moved {
        list_id: target,
        index: gap,
    }
}

// ─── Tabs ────────────────────────────────────────────────────────────────

fn tabs_of(root: &mut ItemList, id: NodeId) -> Option<&mut smallvec::SmallVec<[Tab; 2]>> {
    find_node_mut(root, id).and_then(Node::tabs_mut)
}

/// Append an inactive, empty tab to tabs node `id`. Returns its list id.
pub fn add_tab(root: &mut ItemList, id: NodeId, ids: &mut IdAllocator, title_template: &str) -> Option<ListId> {
    let tabs = tabs_of(root, id)?;
    let tab = new_tab(title_template, tabs.len() + 1, false, ids);
    let list_id = tab.items.list_id;
    tabs.push(tab);
    Some(list_id)
}

/// Remove tab `index` of tabs node `id`, discarding its list.
///
/// When the removed tab was active the first remaining tab becomes
/// active; with no tabs left nothing is active.
pub fn delete_tab(root: &mut ItemList, id: NodeId, index: usize) -> Option<Tab> {
    let tabs = tabs_of(root, id)?;
    if index >= tabs.len() {
        return None;
    }
    let removed = tabs.remove(index);
    if removed.active
        && let Some(first) = tabs.first_mut()
    {
        first.active = true;
    }
    Some(removed)
}

/// Make tab `index` the only active tab of tabs node `id`.
pub fn activate_tab(root: &mut ItemList, id: NodeId, index: usize) -> bool {
    let Some(tabs) = tabs_of(root, id) else {
        return false;
    };
    if index >= tabs.len() {
        return false;
    }
    for (i, tab) in tabs.iter_mut().enumerate() {
        tab.active = i == index;
    }
    true
}

pub fn rename_tab(root: &mut ItemList, id: NodeId, index: usize, title: impl Into<String>) -> bool {
    match tabs_of(root, id).and_then(|tabs| tabs.get_mut(index)) {
        Some(tab) => {
            tab.title = title.into();
            true
        }
        None => false,
    }
}

// ─── Bulk edits ──────────────────────────────────────────────────────────

/// Visit every node mutably, pre-order.
pub fn walk_mut(root: &mut ItemList, visitor: &mut impl FnMut(&mut Node)) {
    for node in root.list.iter_mut() {
        visitor(node);
        if let Some(tabs) = node.value.tabs.as_mut() {
            for tab in tabs.iter_mut() {
                walk_mut(&mut tab.items, visitor);
            }
        }
    }
}

/// Reset every field property bound to `keyname` to the unbound
/// placeholder. Returns the number of properties cleared.
pub fn unbind_field(root: &mut ItemList, keyname: &str) -> usize {
    let mut cleared = 0;
    walk_mut(root, &mut |node| {
        for prop in all_field_props() {
            if node.data_str(prop) == Some(keyname) {
                node.data.insert((*prop).to_string(), Value::String(UNBOUND_FIELD.into()));
                cleared += 1;
            }
        }
    });
    cleared
}

/// Bind `prop` of node `id` to `keyname`. Refused when `prop` is not one
/// of the node type's field properties.
pub fn bind_field(root: &mut ItemList, id: NodeId, prop: &str, keyname: &str) -> bool {
    match find_node_mut(root, id) {
        Some(node) if field_props(node.kind()).iter().any(|p| *p == prop) => {
            node.data.insert(prop.to_string(), Value::String(keyname.to_string()));
            true
        }
        Some(node) => {
            log::debug!("bind_field: {prop} is not a field of {}", node.kind().as_str());
            false
        }
        None => false,
    }
}

/// Whether `id` names a node that is still in the tree.
pub fn contains_node(root: &ItemList, id: NodeId) -> bool {
    find_node(root, id).is_some()
}
