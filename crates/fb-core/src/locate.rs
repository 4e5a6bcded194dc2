//! Read-only queries over a layout tree.
//!
//! Every query is built on `walk`, a pre-order depth-first descent: a
//! node is visited, then the lists of its tabs in tab order, then its
//! next sibling. Nothing here mutates; all functions are re-entrant.

use crate::id::{ListId, NodeId};
use crate::model::{ItemList, Node, is_unbound};
use crate::registry::all_field_props;
use std::ops::ControlFlow;

/// A node seen during a walk, with its position in the tree.
#[derive(Debug, Clone, Copy)]
pub struct Visit<'a> {
    pub node: &'a Node,
    /// List holding the node.
    pub list: &'a ItemList,
    pub index: usize,
    /// Tabs node owning `list`; `None` for the root list.
    pub owner: Option<NodeId>,
    /// Number of tabs containers above the node.
    pub depth: usize,
}

// ─── Traversal ───────────────────────────────────────────────────────────

/// Visit every node under `root` until the visitor breaks.
pub fn walk<'a, B>(
    root: &'a ItemList,
    visitor: &mut impl FnMut(Visit<'a>) -> ControlFlow<B>,
) -> ControlFlow<B> {
    walk_list(root, None, 0, visitor)
}

fn walk_list<'a, B>(
    list: &'a ItemList,
    owner: Option<NodeId>,
    depth: usize,
    visitor: &mut impl FnMut(Visit<'a>) -> ControlFlow<B>,
) -> ControlFlow<B> {
    for (index, node) in list.list.iter().enumerate() {
        visitor(Visit {
            node,
            list,
            index,
            owner,
            depth,
        })?;
        for tab in node.tabs() {
            walk_list(&tab.items, Some(node.id), depth + 1, visitor)?;
        }
    }
    ControlFlow::Continue(())
}

/// First visit matching `pred`, in walk order.
pub fn find_visit<'a>(root: &'a ItemList, mut pred: impl FnMut(&Visit<'a>) -> bool) -> Option<Visit<'a>> {
    let found = walk(root, &mut |v| {
        if pred(&v) {
            ControlFlow::Break(v)
        } else {
            ControlFlow::Continue(())
        }
    });
    match found {
        ControlFlow::Break(v) => Some(v),
        ControlFlow::Continue(()) => None,
    }
}

// ─── Nodes and lists ─────────────────────────────────────────────────────

pub fn find_node(root: &ItemList, id: NodeId) -> Option<&Node> {
    find_visit(root, |v| v.node.id == id).map(|v| v.node)
}

/// Owning list and index of a node.
pub fn position_of(root: &ItemList, id: NodeId) -> Option<(ListId, usize)> {
    find_visit(root, |v| v.node.id == id).map(|v| (v.list.list_id, v.index))
}

/// The root list or any tab's list with this id.
pub fn find_list(root: &ItemList, list_id: ListId) -> Option<&ItemList> {
    if root.list_id == list_id {
        return Some(root);
    }
    find_visit(root, |v| v.node.tabs().iter().any(|t| t.items.list_id == list_id)).and_then(|v| {
        v.node
            .tabs()
            .iter()
            .map(|t| &t.items)
            .find(|l| l.list_id == list_id)
    })
}

/// Tabs node owning a list. `None` for the root list and for unknown ids.
pub fn owner_of_list(root: &ItemList, list_id: ListId) -> Option<NodeId> {
    find_visit(root, |v| v.node.tabs().iter().any(|t| t.items.list_id == list_id)).map(|v| v.node.id)
}

pub fn find_node_mut(root: &mut ItemList, id: NodeId) -> Option<&mut Node> {
    for node in root.list.iter_mut() {
        if node.id == id {
            return Some(node);
        }
        if let Some(tabs) = node.value.tabs.as_mut() {
            for tab in tabs.iter_mut() {
                if let Some(found) = find_node_mut(&mut tab.items, id) {
                    return Some(found);
                }
            }
        }
    }
    None
}

pub fn find_list_mut(root: &mut ItemList, list_id: ListId) -> Option<&mut ItemList> {
    if root.list_id == list_id {
        return Some(root);
    }
    for node in root.list.iter_mut() {
        if let Some(tabs) = node.value.tabs.as_mut() {
            for tab in tabs.iter_mut() {
                if let Some(found) = find_list_mut(&mut tab.items, list_id) {
                    return Some(found);
                }
            }
        }
    }
    None
}

/// True iff `ancestor` is a tabs node and `descendant` sits somewhere in
/// its tab lists, at any depth. A node is not its own ancestor.
pub fn is_ancestor(root: &ItemList, ancestor: NodeId, descendant: NodeId) -> bool {
    let Some(container) = find_node(root, ancestor) else {
        return false;
    };
    if container.value.tabs.is_none() {
        return false;
    }
    container
        .tabs()
        .iter()
        .any(|tab| find_node(&tab.items, descendant).is_some())
}

// ─── Field occupancy ─────────────────────────────────────────────────────

/// Field-tagged properties of `node` bound to `keyname`.
pub fn bound_props<'a>(node: &'a Node, keyname: &'a str) -> impl Iterator<Item = &'static str> + 'a {
    all_field_props()
        .iter()
        .copied()
        .filter(move |prop| node.data_str(prop) == Some(keyname))
}

fn binds(node: &Node, keyname: &str) -> bool {
    !is_unbound(keyname) && bound_props(node, keyname).next().is_some()
}

/// Whether any node anywhere in the tree binds `keyname`.
pub fn is_field_occupied(keyname: &str, root: &ItemList) -> bool {
    find_visit(root, |v| binds(v.node, keyname)).is_some()
}

/// First node, in walk order, binding `keyname`.
pub fn find_node_binding_field(keyname: &str, root: &ItemList) -> Option<NodeId> {
    find_visit(root, |v| binds(v.node, keyname)).map(|v| v.node.id)
}

/// Every node binding `keyname`, in walk order.
pub fn nodes_binding_field(keyname: &str, root: &ItemList) -> Vec<NodeId> {
    let mut ids = Vec::new();
    let _: ControlFlow<()> = walk(root, &mut |v| {
        if binds(v.node, keyname) {
            ids.push(v.node.id);
        }
        ControlFlow::Continue(())
    });
    ids
}

/// Every bound keyname in the tree, in walk order, without repeats.
pub fn bound_keynames(root: &ItemList) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    let _: ControlFlow<()> = walk(root, &mut |v| {
        for prop in all_field_props() {
            if let Some(value) = v.node.data_str(prop)
                && !is_unbound(value)
                && !keys.iter().any(|k| k == value)
            {
                keys.push(value.to_string());
            }
        }
        ControlFlow::Continue(())
    });
    keys
}

// ─── Counting ────────────────────────────────────────────────────────────

pub fn node_count(root: &ItemList) -> usize {
    let mut count = 0;
    let _: ControlFlow<()> = walk(root, &mut |_| {
        count += 1;
        ControlFlow::Continue(())
    });
    count
}

/// Largest node or list id in the tree (including the root list).
pub fn max_id(root: &ItemList) -> u32 {
    let mut max = root.list_id.0;
    let _: ControlFlow<()> = walk(root, &mut |v| {
        max = max.max(v.node.id.0);
        for tab in v.node.tabs() {
            max = max.max(tab.items.list_id.0);
        }
        ControlFlow::Continue(())
    });
    max
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::IdAllocator;
    use crate::model::ElementKind;
    use crate::registry::new_node;
    use serde_json::json;

    /// root: [A(tabs) { tab0: [B(tabs) { tab0: [C(textbox)] }], tab1: [] }, D(textbox)]
    fn nested() -> (ItemList, [NodeId; 4]) {
        let mut ids = IdAllocator::new();
        let mut c = new_node(ElementKind::Textbox, &mut ids);
        c.data.insert("field".into(), json!("field_1"));
        let c_id = c.id;

        let mut b = new_node(ElementKind::Tabs, &mut ids);
        b.tabs_mut().unwrap()[0].items.list.push(c);
        let b_id = b.id;

        let mut a = new_node(ElementKind::Tabs, &mut ids);
        a.tabs_mut().unwrap()[0].items.list.push(b);
        let a_id = a.id;

        let mut d = new_node(ElementKind::Textbox, &mut ids);
        d.data.insert("field".into(), json!("field_1"));
        let d_id = d.id;

        let root = ItemList {
            list_id: ListId::ROOT,
            list: vec![a, d],
        };
        (root, [a_id, b_id, c_id, d_id])
    }

    #[test]
    fn finds_nodes_at_any_depth() {
        let (root, [a, b, c, d]) = nested();
        for id in [a, b, c, d] {
            assert_eq!(find_node(&root, id).map(|n| n.id), Some(id));
        }
        assert!(find_node(&root, NodeId(999)).is_none());
    }

    #[test]
    fn finds_tab_lists() {
        let (root, [a, b, ..]) = nested();
        let inner = find_node(&root, b).unwrap().tabs()[0].items.list_id;
        let list = find_list(&root, inner).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(owner_of_list(&root, inner), Some(b));
        let outer_second = find_node(&root, a).unwrap().tabs()[1].items.list_id;
        assert!(find_list(&root, outer_second).unwrap().is_empty());
        assert_eq!(owner_of_list(&root, ListId::ROOT), None);
        assert!(find_list(&root, ListId(999)).is_none());
    }

    #[test]
    fn ancestry_follows_tabs_only() {
        let (root, [a, b, c, d]) = nested();
        assert!(is_ancestor(&root, a, c));
        assert!(is_ancestor(&root, a, b));
        assert!(is_ancestor(&root, b, c));
        assert!(!is_ancestor(&root, b, a));
        assert!(!is_ancestor(&root, a, d));
        assert!(!is_ancestor(&root, a, a));
        assert!(!is_ancestor(&root, c, c));
        assert!(!is_ancestor(&root, NodeId(999), c));
    }

    #[test]
    fn occupancy_searches_whole_tree() {
        let (root, [_, _, c, d]) = nested();
        assert!(is_field_occupied("field_1", &root));
        assert!(!is_field_occupied("field_2", &root));
        assert!(!is_field_occupied("", &root));
        assert_eq!(find_node_binding_field("field_1", &root), Some(c));
        assert_eq!(nodes_binding_field("field_1", &root), vec![c, d]);
        assert_eq!(find_node_binding_field("nope", &root), None);
        assert_eq!(bound_keynames(&root), vec!["field_1".to_string()]);
    }

    #[test]
    fn positions_and_counts() {
        let (root, [a, _, c, d]) = nested();
        assert_eq!(position_of(&root, a), Some((ListId::ROOT, 0)));
        assert_eq!(position_of(&root, d), Some((ListId::ROOT, 1)));
        assert_eq!(position_of(&root, c).map(|(_, i)| i), Some(0));
        assert_eq!(node_count(&root), 4);
        assert_eq!(max_id(&root), d.0);
    }
}
