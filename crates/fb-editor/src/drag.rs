//! Drag/drop placement resolver.
//!
//! One gesture at a time: `Idle → Grabbed → Dragging → Idle`. The tree is
//! only touched when a drop commits; grabbing, moving and cancelling are
//! pure bookkeeping. A node grabbed from the palette is built (and gets
//! its id) at grab time; a node grabbed from the tree records where it
//! came from so the drop can take it out of that list.

use crate::config::EditorConfig;
use crate::input::DropTarget;
use fb_core::fields::mint_field;
use fb_core::id::{IdAllocator, ListId, NodeId};
use fb_core::locate::{find_list, find_node, position_of};
use fb_core::model::{Document, ElementKind, ItemList, Node};
use fb_core::mutate::{MoveOutcome, MoveRejection, insert_node, move_node};
use fb_core::registry::{field_props, new_node_with_titles};
use serde_json::Value;
use smallvec::SmallVec;

/// What is being dragged.
#[derive(Debug, Clone, PartialEq)]
pub enum Grab {
    /// A new element from the palette, not yet in the tree.
    Palette(Box<Node>),
    /// An element already in the tree, and where it sat at grab time.
    Existing {
        id: NodeId,
        source_list: ListId,
        source_index: usize,
    },
}

impl Grab {
    pub fn node_id(&self) -> NodeId {
        match self {
            Grab::Palette(node) => node.id,
            Grab::Existing { id, .. } => *id,
        }
    }

    pub fn is_move(&self) -> bool {
        matches!(self, Grab::Existing { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Grabbed(Grab),
    Dragging { grab: Grab, x: f32, y: f32 },
}

/// Why a drop was refused. The tree is unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropRejection {
    /// The target list or tab no longer exists.
    UnknownTarget,
    /// The target list lies inside the grabbed tabs element.
    IntoOwnSubtree,
    /// The grabbed element is gone or no longer where it was grabbed.
    StaleSource,
}

/// Result of releasing the pointer.
#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    /// A palette element was inserted. `minted` lists the keynames of the
    /// fields created and bound for it.
    Placed {
        id: NodeId,
        list_id: ListId,
        index: usize,
        minted: SmallVec<[String; 2]>,
    },
    /// An existing element changed position.
    Moved {
        id: NodeId,
        list_id: ListId,
        index: usize,
    },
    /// Dropped where it already was.
    Unchanged,
    Rejected(DropRejection),
    /// Nothing was grabbed.
    Ignored,
}

impl DropOutcome {
    /// Whether the document changed.
    pub fn is_committed(&self) -> bool {
        matches!(self, DropOutcome::Placed { .. } | DropOutcome::Moved { .. })
    }
}

// ─── Resolver ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct DragResolver {
    state: DragState,
}

impl DragResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn grab(&self) -> Option<&Grab> {
        match &self.state {
            DragState::Idle => None,
            DragState::Grabbed(grab) | DragState::Dragging { grab, .. } => Some(grab),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state == DragState::Idle
    }

    /// Live pointer position for the drag ghost.
    pub fn pointer(&self) -> Option<(f32, f32)> {
        match self.state {
            DragState::Dragging { x, y, .. } => Some((x, y)),
            _ => None,
        }
    }

    /// Start dragging a new element of `kind`. A gesture already in
    /// progress is abandoned.
    pub fn grab_palette(&mut self, kind: ElementKind, ids: &mut IdAllocator, config: &EditorConfig) -> NodeId {
        let node = new_node_with_titles(kind, ids, &config.tab_title_template);
        let id = node.id;
        log::debug!("drag: grabbed new {kind} {id}");
        self.state = DragState::Grabbed(Grab::Palette(Box::new(node)));
        id
    }

    /// Start dragging the placed element `id`. Unknown ids leave the
    /// resolver idle.
    pub fn grab_node(&mut self, root: &ItemList, id: NodeId) -> bool {
        let Some((source_list, source_index)) = position_of(root, id) else {
            log::debug!("drag: cannot grab unknown node {id}");
            self.state = DragState::Idle;
            return false;
        };
        log::debug!("drag: grabbed {id} at {source_list}[{source_index}]");
        self.state = DragState::Grabbed(Grab::Existing {
            id,
            source_list,
            source_index,
        });
        true
    }

    /// Track the pointer. Ignored while idle.
    pub fn pointer_move(&mut self, x: f32, y: f32) {
        self.state = match std::mem::take(&mut self.state) {
            DragState::Idle => DragState::Idle,
            DragState::Grabbed(grab) => {
                log::trace!("drag: dragging {}", grab.node_id());
                DragState::Dragging { grab, x, y }
            }
            DragState::Dragging { grab, .. } => DragState::Dragging { grab, x, y },
        };
    }

    /// Abandon the gesture without touching the tree.
    pub fn cancel(&mut self) {
        if let Some(grab) = self.grab() {
            log::debug!("drag: cancelled {}", grab.node_id());
        }
        self.state = DragState::Idle;
    }

    /// Release over `target` and commit the placement. Always returns to
    /// idle. A palette element that is not placed is discarded; its id is
    /// never reused.
    pub fn drop_on(&mut self, target: DropTarget, doc: &mut Document, config: &EditorConfig) -> DropOutcome {
        let grab = match std::mem::take(&mut self.state) {
            DragState::Idle => return DropOutcome::Ignored,
            DragState::Grabbed(grab) | DragState::Dragging { grab, .. } => grab,
        };
        let Some((list_id, index)) = resolve_target(doc, target) else {
            log::debug!("drag: drop target {target:?} is gone");
            return DropOutcome::Rejected(DropRejection::UnknownTarget);
        };
        let outcome = match grab {
            Grab::Palette(node) => place_new(doc, *node, list_id, index, config),
            Grab::Existing {
                id,
                source_list,
                source_index,
            } => move_existing(doc, id, (source_list, source_index), list_id, index),
        };
        log::debug!("drag: {outcome:?}");
        outcome
    }
}

/// Concrete list and gap a drop target stands for.
fn resolve_target(doc: &Document, target: DropTarget) -> Option<(ListId, usize)> {
    match target {
        DropTarget::Gap { list_id, index } => find_list(&doc.root, list_id).map(|_| (list_id, index)),
        DropTarget::TabHeader { tabs, tab } => {
            let items = &find_node(&doc.root, tabs)?.tabs().get(tab)?.items;
            Some((items.list_id, items.len()))
        }
        DropTarget::Canvas => Some((doc.root.list_id, doc.root.len())),
    }
}

fn place_new(doc: &mut Document, mut node: Node, list_id: ListId, index: usize, config: &EditorConfig) -> DropOutcome {
    let mut minted = SmallVec::new();
    if config.auto_bind_fields {
        let template = config.field_template();
        for prop in field_props(node.kind()) {
            let field = mint_field(&doc.fields, &template);
            node.data
                .insert(prop.to_string(), Value::String(field.keyname.clone()));
            minted.push(field.keyname.clone());
            doc.fields.push(field);
        }
    }

    let id = node.id;
    let index = index.min(find_list(&doc.root, list_id).map_or(0, |l| l.len()));
    if !insert_node(&mut doc.root, list_id, index, node) {
        // Unreachable once resolve_target succeeded; undo the minting.
        doc.fields.retain(|f| !minted.contains(&f.keyname));
        return DropOutcome::Rejected(DropRejection::UnknownTarget);
    }
    DropOutcome::Placed {
        id,
        list_id,
        index,
        minted,
    }
}

fn move_existing(doc: &mut Document, id: NodeId, source: (ListId, usize), list_id: ListId, index: usize) -> DropOutcome {
    if position_of(&doc.root, id) != Some(source) {
        return DropOutcome::Rejected(DropRejection::StaleSource);
    }
    match move_node(&mut doc.root, id, list_id, index) {
        MoveOutcome::Moved { list_id, index } => DropOutcome::Moved { id, list_id, index },
        MoveOutcome::Unchanged => DropOutcome::Unchanged,
        MoveOutcome::Rejected(MoveRejection::IntoOwnSubtree) => DropOutcome::Rejected(DropRejection::IntoOwnSubtree),
        MoveOutcome::Rejected(MoveRejection::UnknownList) => DropOutcome::Rejected(DropRejection::UnknownTarget),
        MoveOutcome::Rejected(MoveRejection::UnknownNode) => DropOutcome::Rejected(DropRejection::StaleSource),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fb_core::model::{Field, FieldDatatype};
    use fb_core::persist::serialize;
    use fb_core::registry::new_node;

    fn setup() -> (Document, IdAllocator, EditorConfig) {
        (Document::default(), IdAllocator::new(), EditorConfig::default())
    }

    #[test]
    fn state_transitions() {
        let (mut doc, mut ids, config) = setup();
        let mut drag = DragResolver::new();
        assert!(drag.is_idle());

        drag.pointer_move(1.0, 1.0);
        assert!(drag.is_idle());

        drag.grab_palette(ElementKind::Spacer, &mut ids, &config);
        assert!(matches!(drag.state(), DragState::Grabbed(_)));
        drag.pointer_move(10.0, 20.0);
        assert_eq!(drag.pointer(), Some((10.0, 20.0)));

        let outcome = drag.drop_on(DropTarget::Canvas, &mut doc, &config);
        assert!(outcome.is_committed());
        assert!(drag.is_idle());
        assert_eq!(drag.drop_on(DropTarget::Canvas, &mut doc, &config), DropOutcome::Ignored);
    }

    #[test]
    fn palette_ids_are_assigned_at_grab() {
        let (mut doc, mut ids, config) = setup();
        let mut drag = DragResolver::new();
        let first = drag.grab_palette(ElementKind::Label, &mut ids, &config);
        drag.cancel();
        let second = drag.grab_palette(ElementKind::Label, &mut ids, &config);
        assert!(second > first);

        match drag.drop_on(DropTarget::Canvas, &mut doc, &config) {
            DropOutcome::Placed { id, minted, .. } => {
                assert_eq!(id, second);
                assert!(minted.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(doc.fields.is_empty());
    }

    #[test]
    fn coordinates_mint_two_fields() {
        let (mut doc, mut ids, config) = setup();
        doc.fields.push(Field::new("field_1", "Field 1", FieldDatatype::Real));
        let mut drag = DragResolver::new();
        drag.grab_palette(ElementKind::Coordinates, &mut ids, &config);
        let outcome = drag.drop_on(DropTarget::Canvas, &mut doc, &config);

        let DropOutcome::Placed { minted, .. } = outcome else {
            panic!("expected placement");
        };
        assert_eq!(minted.as_slice(), ["field_2", "field_3"]);
        let node = &doc.root.list[0];
        assert_eq!(node.data_str("field_lon"), Some("field_2"));
        assert_eq!(node.data_str("field_lat"), Some("field_3"));
        assert_eq!(doc.fields.len(), 3);
    }

    #[test]
    fn auto_bind_can_be_disabled() {
        let (mut doc, mut ids, _) = setup();
        let config = EditorConfig {
            auto_bind_fields: false,
            ..EditorConfig::default()
        };
        let mut drag = DragResolver::new();
        drag.grab_palette(ElementKind::Textbox, &mut ids, &config);
        drag.drop_on(DropTarget::Canvas, &mut doc, &config);
        assert!(doc.fields.is_empty());
        assert_eq!(doc.root.list[0].data_str("field"), Some(""));
    }

    #[test]
    fn tab_header_appends_to_tab() {
        let (mut doc, mut ids, config) = setup();
        let tabs = new_node(ElementKind::Tabs, &mut ids);
        let tabs_id = tabs.id;
        let second = tabs.tabs()[1].items.list_id;
        doc.root.list.push(tabs);
        doc.root.list.push(new_node(ElementKind::Spacer, &mut ids));
        let spacer = doc.root.list[1].id;

        let mut drag = DragResolver::new();
        assert!(drag.grab_node(&doc.root, spacer));
        let outcome = drag.drop_on(DropTarget::TabHeader { tabs: tabs_id, tab: 1 }, &mut doc, &config);
        assert_eq!(
            outcome,
            DropOutcome::Moved {
                id: spacer,
                list_id: second,
                index: 0
            }
        );
        assert_eq!(doc.root.len(), 1);
    }

    #[test]
    fn unknown_targets_are_rejected_without_side_effects() {
        let (mut doc, mut ids, config) = setup();
        let mut drag = DragResolver::new();
        drag.grab_palette(ElementKind::Textbox, &mut ids, &config);
        let before = serialize(&doc.root);
        let outcome = drag.drop_on(
            DropTarget::Gap {
                list_id: ListId(99),
                index: 0,
            },
            &mut doc,
            &config,
        );
        assert_eq!(outcome, DropOutcome::Rejected(DropRejection::UnknownTarget));
        assert_eq!(serialize(&doc.root), before);
        assert!(doc.fields.is_empty());
        assert!(drag.is_idle());
    }

    #[test]
    fn grabbing_unknown_node_stays_idle() {
        let (doc, _, _) = setup();
        let mut drag = DragResolver::new();
        assert!(!drag.grab_node(&doc.root, NodeId(5)));
        assert!(drag.is_idle());
    }
}
