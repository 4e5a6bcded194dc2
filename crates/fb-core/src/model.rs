//! Core data model for form layouts.
//!
//! A document is a tree of item lists. The root list holds placed
//! elements; a `tabs` element owns one list per tab, so nesting happens
//! only through tabs. Every node and every list carries an id drawn from
//! the session's `IdAllocator`. Element properties live in a free-form
//! property bag whose keys are described by the element registry.

use crate::id::{ListId, NodeId};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Free-form element properties (`field`, `remember`, `options`, ...).
pub type DataBag = serde_json::Map<String, serde_json::Value>;

/// Value a cascade writes into a field property it unbinds.
pub const UNBOUND_FIELD: &str = "-";

/// Returns true when a field property value binds no field.
pub fn is_unbound(value: &str) -> bool {
    value.is_empty() || value == UNBOUND_FIELD
}

// ─── Element kinds ───────────────────────────────────────────────────────

/// Element type tag, as it appears in the persisted `type` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Label,
    Spacer,
    Tabs,
    Textbox,
    Checkbox,
    Datetime,
    Coordinates,
    Distance,
    Average,
    Photo,
    System,
    Dropdown,
    DropdownDual,
    Radio,
    Cascade,
    /// Drop-target marker found in some older editor trees. Never created
    /// by this crate and discarded on load and save.
    #[serde(rename = "dropPlace")]
    DropPlace,
}

impl ElementKind {
    pub const PLACEABLE: [ElementKind; 15] = [
        ElementKind::Label,
        ElementKind::Spacer,
        ElementKind::Tabs,
        ElementKind::Textbox,
        ElementKind::Checkbox,
        ElementKind::Datetime,
        ElementKind::Coordinates,
        ElementKind::Distance,
        ElementKind::Average,
        ElementKind::Photo,
        ElementKind::System,
        ElementKind::Dropdown,
        ElementKind::DropdownDual,
        ElementKind::Radio,
        ElementKind::Cascade,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ElementKind::Label => "label",
            ElementKind::Spacer => "spacer",
            ElementKind::Tabs => "tabs",
            ElementKind::Textbox => "textbox",
            ElementKind::Checkbox => "checkbox",
            ElementKind::Datetime => "datetime",
            ElementKind::Coordinates => "coordinates",
            ElementKind::Distance => "distance",
            ElementKind::Average => "average",
            ElementKind::Photo => "photo",
            ElementKind::System => "system",
            ElementKind::Dropdown => "dropdown",
            ElementKind::DropdownDual => "dropdown_dual",
            ElementKind::Radio => "radio",
            ElementKind::Cascade => "cascade",
            ElementKind::DropPlace => "dropPlace",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        if tag == "dropPlace" {
            return Some(ElementKind::DropPlace);
        }
        Self::PLACEABLE.into_iter().find(|k| k.as_str() == tag)
    }

    pub fn is_transient(self) -> bool {
        matches!(self, ElementKind::DropPlace)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Tree ────────────────────────────────────────────────────────────────

/// Structural descriptor of a node. Only `tabs` nodes carry `tabs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeValue {
    #[serde(rename = "type")]
    pub kind: ElementKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tabs: Option<SmallVec<[Tab; 2]>>,
}

/// One placed form element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub value: NodeValue,
    pub data: DataBag,
}

impl Node {
    pub fn kind(&self) -> ElementKind {
        self.value.kind
    }

    /// Tabs of a container node; empty for leaf elements.
    pub fn tabs(&self) -> &[Tab] {
        self.value.tabs.as_deref().unwrap_or(&[])
    }

    pub fn tabs_mut(&mut self) -> Option<&mut SmallVec<[Tab; 2]>> {
        self.value.tabs.as_mut()
    }

    /// String value of a property, if present and a string.
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }
}

/// A page of a tabs element. Owns exactly one list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tab {
    pub title: String,
    pub active: bool,
    pub items: ItemList,
}

/// An independently addressable, ordered sequence of nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemList {
    pub list_id: ListId,
    pub list: Vec<Node>,
}

impl ItemList {
    pub fn new(list_id: ListId) -> Self {
        Self {
            list_id,
            list: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

impl Default for ItemList {
    fn default() -> Self {
        Self::new(ListId::ROOT)
    }
}

// ─── Fields ──────────────────────────────────────────────────────────────

/// Storage type of a data field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldDatatype {
    #[default]
    String,
    Integer,
    Bigint,
    Real,
    Date,
    Time,
    Datetime,
}

/// A named, typed data slot that elements bind to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub keyname: String,
    pub display_name: String,
    pub datatype: FieldDatatype,
    /// Already present on the backing layer: keyname and datatype are fixed
    /// and the field cannot be deleted.
    #[serde(default)]
    pub existing: bool,
}

impl Field {
    pub fn new(
        keyname: impl Into<String>,
        display_name: impl Into<String>,
        datatype: FieldDatatype,
    ) -> Self {
        Self {
            keyname: keyname.into(),
            display_name: display_name.into(),
            datatype,
            existing: false,
        }
    }

    #[must_use]
    pub fn existing(mut self) -> Self {
        self.existing = true;
        self
    }
}

// ─── Document ────────────────────────────────────────────────────────────

/// Geometry of the parent feature layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GeometryType {
    #[default]
    Point,
    Linestring,
    Polygon,
    Multipoint,
    Multilinestring,
    Multipolygon,
    Pointz,
    Linestringz,
    Polygonz,
    Multipointz,
    Multilinestringz,
    Multipolygonz,
}

/// The whole editable form: layout tree plus field declarations.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub root: ItemList,
    pub fields: Vec<Field>,
    pub geometry_type: GeometryType,
    pub update_feature_layer_fields: bool,
}

impl Document {
    pub fn new(geometry_type: GeometryType) -> Self {
        Self {
            geometry_type,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_roundtrip() {
        for kind in ElementKind::PLACEABLE {
            assert_eq!(ElementKind::from_tag(kind.as_str()), Some(kind));
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, serde_json::json!(kind.as_str()));
        }
        assert_eq!(
            ElementKind::from_tag("dropPlace"),
            Some(ElementKind::DropPlace)
        );
        assert_eq!(ElementKind::from_tag("slider"), None);
    }

    #[test]
    fn datatype_wire_names() {
        let json = serde_json::to_string(&FieldDatatype::Bigint).unwrap();
        assert_eq!(json, "\"BIGINT\"");
        let back: FieldDatatype = serde_json::from_str("\"DATETIME\"").unwrap();
        assert_eq!(back, FieldDatatype::Datetime);
    }

    #[test]
    fn unbound_placeholders() {
        assert!(is_unbound(""));
        assert!(is_unbound("-"));
        assert!(!is_unbound("field_1"));
    }
}
