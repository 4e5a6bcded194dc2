//! Editor store: the single owner of one form being edited.
//!
//! The store holds the document, the id allocator, the current selection
//! and the drag resolver, and exposes a fixed set of named mutators. Each
//! mutator that changes the document ends by emitting a
//! `ChangeNotification` to the registered callback, synchronously.
//! Reads never emit; gesture bookkeeping never emits.

use crate::config::EditorConfig;
use crate::drag::{DragResolver, DropOutcome};
use crate::input::{DropTarget, GestureEvent};
use fb_core::check::{Diagnostic, check_document};
use fb_core::admit;
use fb_core::error::{FormError, Result};
use fb_core::fields::{self, FieldPatch, FieldStatus};
use fb_core::id::{IdAllocator, ListId, NodeId};
use fb_core::locate::{find_node, is_ancestor};
use fb_core::model::*;
use fb_core::mutate;
use fb_core::persist::{Item, PersistedDocument};
use fb_core::registry::new_node_with_titles;
use serde::Serialize;

/// Snapshot handed to the host after every committed change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeNotification {
    pub items: Vec<Item>,
    /// Only fields some element is bound to.
    pub fields: Vec<Field>,
    pub update_feature_layer_fields: bool,
    pub geometry_type: GeometryType,
}

pub type ChangeCallback = Box<dyn FnMut(&ChangeNotification)>;

pub struct EditorStore {
    doc: Document,
    ids: IdAllocator,
    config: EditorConfig,
    selected: Option<NodeId>,
    drag: DragResolver,
    /// Whether the user may add fields to the parent layer.
    can_update_fields: bool,
    on_change: Option<ChangeCallback>,
}

impl EditorStore {
    /// Empty form for a layer of `geometry_type`.
    pub fn new(geometry_type: GeometryType, config: EditorConfig) -> Self {
        Self::with_document(Document::new(geometry_type), IdAllocator::new(), config)
    }

    pub fn from_persisted(persisted: &PersistedDocument, config: EditorConfig) -> Self {
        let mut ids = IdAllocator::new();
        let doc = Document::from_persisted(persisted, &mut ids);
        Self::with_document(doc, ids, config)
    }

    pub fn from_json(json: &str, config: EditorConfig) -> Result<Self> {
        let (doc, ids) = Document::from_json(json)?;
        Ok(Self::with_document(doc, ids, config))
    }

    fn with_document(doc: Document, ids: IdAllocator, config: EditorConfig) -> Self {
        Self {
            doc,
            ids,
            config,
            selected: None,
            drag: DragResolver::new(),
            can_update_fields: false,
            on_change: None,
        }
    }

    pub fn set_on_change(&mut self, callback: impl FnMut(&ChangeNotification) + 'static) {
        self.on_change = Some(Box::new(callback));
    }

    // ─── Reads ───────────────────────────────────────────────────────────

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn root(&self) -> &ItemList {
        &self.doc.root
    }

    pub fn fields(&self) -> &[Field] {
        &self.doc.fields
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    pub fn selected_node(&self) -> Option<&Node> {
        self.selected.and_then(|id| find_node(&self.doc.root, id))
    }

    pub fn drag(&self) -> &DragResolver {
        &self.drag
    }

    pub fn can_update_fields(&self) -> bool {
        self.can_update_fields
    }

    /// Catalog fields with their display status, in catalog order.
    pub fn field_statuses(&self) -> Vec<(&Field, FieldStatus)> {
        self.doc
            .fields
            .iter()
            .map(|f| {
                let status = fields::classify(
                    f,
                    &self.doc.root,
                    self.doc.update_feature_layer_fields,
                    self.can_update_fields,
                );
                (f, status)
            })
            .collect()
    }

    pub fn notification(&self) -> ChangeNotification {
        ChangeNotification {
            items: fb_core::persist::serialize(&self.doc.root),
            fields: fields::referenced_fields(&self.doc.fields, &self.doc.root),
            update_feature_layer_fields: self.doc.update_feature_layer_fields,
            geometry_type: self.doc.geometry_type,
        }
    }

    pub fn save(&self) -> PersistedDocument {
        self.doc.to_persisted()
    }

    pub fn to_json(&self) -> Result<String> {
        self.doc.to_json()
    }

    pub fn check(&self) -> Vec<Diagnostic> {
        check_document(&self.doc)
    }

    fn emit(&mut self) {
        if self.on_change.is_none() {
            return;
        }
        let notification = self.notification();
        if let Some(callback) = self.on_change.as_mut() {
            callback(&notification);
        }
    }

    /// Emit when `changed`, and pass it through.
    fn committed(&mut self, changed: bool) -> bool {
        if changed {
            self.emit();
        }
        changed
    }

    // ─── Selection ───────────────────────────────────────────────────────

    /// Select a placed element. Unknown ids leave the selection alone.
    pub fn select(&mut self, id: NodeId) -> bool {
        if !mutate::contains_node(&self.doc.root, id) {
            return false;
        }
        self.selected = Some(id);
        true
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Drop the selection once its node has left the tree.
    fn retain_selection(&mut self) {
        if let Some(selected) = self.selected
            && !mutate::contains_node(&self.doc.root, selected)
        {
            self.selected = None;
        }
    }

    // ─── Document settings ───────────────────────────────────────────────

    pub fn set_update_feature_layer_fields(&mut self, update: bool) {
        if self.doc.update_feature_layer_fields != update {
            self.doc.update_feature_layer_fields = update;
            self.emit();
        }
    }

    pub fn set_geometry_type(&mut self, geometry_type: GeometryType) {
        if self.doc.geometry_type != geometry_type {
            self.doc.geometry_type = geometry_type;
            self.emit();
        }
    }

    /// Merge the parent layer's fields into the catalog and record whether
    /// the user may add fields to that layer.
    pub fn merge_existing_fields(&mut self, resource_fields: &[Field], can_update_fields: bool) {
        self.can_update_fields = can_update_fields;
        self.doc.fields = fields::merge_existing(&self.doc.fields, resource_fields);
        log::debug!("merged {} layer field(s)", resource_fields.len());
        self.emit();
    }

    // ─── Tree ────────────────────────────────────────────────────────────

    /// Build a detached element of `kind` with a fresh id.
    pub fn new_node(&mut self, kind: ElementKind) -> Node {
        new_node_with_titles(kind, &mut self.ids, &self.config.tab_title_template)
    }

    /// Replace the contents of list `list_id`. Ids must stay unique; the
    /// list's current nodes may come back in any order.
    pub fn replace_list(&mut self, list_id: ListId, items: Vec<Node>) -> Result<bool> {
        admit::admit_list(&self.doc.root, &self.doc.fields, list_id, &items)?;
        let changed = mutate::replace_list(&mut self.doc.root, list_id, items);
        self.retain_selection();
        Ok(self.committed(changed))
    }

    /// Replace the properties of node `id`. Field properties must belong
    /// to the node's type and name a catalog field or be unbound.
    pub fn set_node_data(&mut self, id: NodeId, data: DataBag) -> Result<bool> {
        let Some(node) = find_node(&self.doc.root, id) else {
            return Ok(false);
        };
        admit::check_bindings(&self.doc.fields, node.kind(), &data)?;
        let changed = mutate::set_node_data(&mut self.doc.root, id, data);
        Ok(self.committed(changed))
    }

    /// Replace the value of node `id`. The element type cannot change.
    pub fn set_node_value(&mut self, id: NodeId, value: NodeValue) -> Result<bool> {
        admit::admit_value(&self.doc.root, &self.doc.fields, id, &value)?;
        let changed = mutate::set_node_value(&mut self.doc.root, id, value);
        self.retain_selection();
        Ok(self.committed(changed))
    }

    /// Insert a detached element (from `new_node`) into list `list_id`.
    pub fn insert_node(&mut self, list_id: ListId, index: usize, node: Node) -> Result<bool> {
        admit::admit_node(&self.doc.root, &self.doc.fields, &node)?;
        let changed = mutate::insert_node(&mut self.doc.root, list_id, index, node);
        Ok(self.committed(changed))
    }

    /// Remove a placed element. Its bound fields stay in the catalog.
    pub fn delete_node(&mut self, id: NodeId) -> Option<Node> {
        let removed = mutate::remove_node(&mut self.doc.root, id)?;
        self.retain_selection();
        log::debug!("deleted {id}");
        self.emit();
        Some(removed)
    }

    pub fn add_tab(&mut self, tabs: NodeId) -> Option<ListId> {
        let list_id = mutate::add_tab(&mut self.doc.root, tabs, &mut self.ids, &self.config.tab_title_template)?;
        self.emit();
        Some(list_id)
    }

    pub fn delete_tab(&mut self, tabs: NodeId, index: usize) -> bool {
        if mutate::delete_tab(&mut self.doc.root, tabs, index).is_none() {
            return false;
        }
        self.retain_selection();
        self.emit();
        true
    }

    pub fn activate_tab(&mut self, tabs: NodeId, index: usize) -> bool {
        let changed = mutate::activate_tab(&mut self.doc.root, tabs, index);
        self.committed(changed)
    }

    pub fn rename_tab(&mut self, tabs: NodeId, index: usize, title: impl Into<String>) -> bool {
        let changed = mutate::rename_tab(&mut self.doc.root, tabs, index, title);
        self.committed(changed)
    }

    // ─── Fields ──────────────────────────────────────────────────────────

    pub fn add_field(&mut self, field: Field) -> Result<()> {
        fields::add_field(&mut self.doc.fields, field)?;
        self.emit();
        Ok(())
    }

    /// Add a new field with the next free generated name.
    pub fn add_generated_field(&mut self) -> Result<Field> {
        let field = fields::mint_field(&self.doc.fields, &self.config.field_template());
        self.add_field(field.clone())?;
        Ok(field)
    }

    pub fn update_field(&mut self, keyname: &str, patch: FieldPatch) -> Result<()> {
        fields::update_field(&mut self.doc.fields, keyname, patch)?;
        self.emit();
        Ok(())
    }

    /// Delete a new field and unbind it everywhere.
    pub fn delete_field(&mut self, keyname: &str) -> Result<Field> {
        let (field, _) = fields::delete_field(&mut self.doc.fields, &mut self.doc.root, keyname)?;
        self.emit();
        Ok(field)
    }

    /// Bind field property `prop` of node `id` to an existing catalog field.
    pub fn bind_field(&mut self, id: NodeId, prop: &str, keyname: &str) -> Result<bool> {
        let Some(node) = find_node(&self.doc.root, id) else {
            return Ok(false);
        };
        admit::check_field_prop(node.kind(), prop)?;
        if fields::find_field(&self.doc.fields, keyname).is_none() {
            return Err(FormError::FieldNotFound(keyname.to_string()));
        }
        let changed = mutate::bind_field(&mut self.doc.root, id, prop, keyname);
        Ok(self.committed(changed))
    }

    // ─── Gestures ────────────────────────────────────────────────────────

    pub fn grab_palette(&mut self, kind: ElementKind) -> NodeId {
        self.drag.grab_palette(kind, &mut self.ids, &self.config)
    }

    pub fn grab_node(&mut self, id: NodeId) -> bool {
        self.drag.grab_node(&self.doc.root, id)
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        self.drag.pointer_move(x, y);
    }

    pub fn cancel_drag(&mut self) {
        self.drag.cancel();
    }

    pub fn drop_on(&mut self, target: DropTarget) -> DropOutcome {
        let outcome = self.drag.drop_on(target, &mut self.doc, &self.config);
        if outcome.is_committed() {
            self.emit();
        }
        outcome
    }

    /// Feed one gesture event. Returns the outcome of a drop, `None` for
    /// every other event.
    pub fn handle(&mut self, event: &GestureEvent) -> Option<DropOutcome> {
        match event {
            GestureEvent::GrabPalette { kind } => {
                self.grab_palette(*kind);
                None
            }
            GestureEvent::GrabNode { id } => {
                self.grab_node(*id);
                None
            }
            GestureEvent::PointerMove { x, y } => {
                self.pointer_move(*x, *y);
                None
            }
            GestureEvent::Drop { target } => Some(self.drop_on(*target)),
            GestureEvent::Cancel => {
                self.cancel_drag();
                None
            }
        }
    }

    /// Whether dropping the grabbed element into `list_id` would be
    /// refused as self-nesting. The UI uses this to grey out drop zones.
    pub fn can_drop_into(&self, list_id: ListId) -> bool {
        let Some(grab) = self.drag.grab() else {
            return false;
        };
        if !grab.is_move() {
            return true;
        }
        let id = grab.node_id();
        match fb_core::locate::owner_of_list(&self.doc.root, list_id) {
            Some(owner) => owner != id && !is_ancestor(&self.doc.root, id, owner),
            None => true,
        }
    }
}
