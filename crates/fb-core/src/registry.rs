//! Element-type registry.
//!
//! A static table mapping each element type to its property schema and a
//! default-data factory. The registry knows nothing about rendering; the
//! UI looks elements up by type tag.

use crate::id::IdAllocator;
use crate::model::{DataBag, ElementKind, ItemList, Node, NodeValue, Tab};
use serde_json::{Value, json};
use smallvec::smallvec;
use std::sync::LazyLock;

/// Default title template for tabs; `{}` is replaced with the tab number.
pub const DEFAULT_TAB_TITLE: &str = "Tab {}";

// ─── Schema ──────────────────────────────────────────────────────────────

/// What kind of value a schema property holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropKind {
    /// Keyname of a catalog field (data binding).
    Field,
    String,
    Number { min: i64, max: i64 },
    Boolean,
    Select(&'static [&'static str]),
    Datetime,
    Options,
    CascadeOptions,
}

#[derive(Debug, Clone, Copy)]
pub struct PropSpec {
    pub key: &'static str,
    pub kind: PropKind,
    pub label: &'static str,
}

const fn prop(key: &'static str, kind: PropKind, label: &'static str) -> PropSpec {
    PropSpec { key, kind, label }
}

pub struct ElementSpec {
    pub kind: ElementKind,
    /// Palette caption.
    pub name: &'static str,
    pub schema: &'static [PropSpec],
    default_data: fn() -> Value,
}

impl ElementSpec {
    pub fn default_data(&self) -> DataBag {
        match (self.default_data)() {
            Value::Object(map) => map,
            _ => DataBag::new(),
        }
    }

    pub fn field_props(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.schema
            .iter()
            .filter(|p| p.kind == PropKind::Field)
            .map(|p| p.key)
    }

    pub fn prop(&self, key: &str) -> Option<&PropSpec> {
        self.schema.iter().find(|p| p.key == key)
    }
}

pub const DATETIME_GRANULARITIES: &[&str] = &["date", "time", "datetime"];
pub const SYSTEM_SOURCES: &[&str] = &["ngid_username", "ngw_username"];

static ELEMENTS: &[ElementSpec] = &[
    ElementSpec {
        kind: ElementKind::Label,
        name: "Label",
        schema: &[prop("label", PropKind::String, "Label")],
        default_data: || json!({ "label": "Text" }),
    },
    ElementSpec {
        kind: ElementKind::Spacer,
        name: "Spacer",
        schema: &[],
        default_data: || json!({}),
    },
    ElementSpec {
        kind: ElementKind::Tabs,
        name: "Tabs",
        schema: &[],
        default_data: || json!({}),
    },
    ElementSpec {
        kind: ElementKind::Textbox,
        name: "Text box",
        schema: &[
            prop("field", PropKind::Field, "Field"),
            prop("max_lines", PropKind::Number { min: 1, max: 255 }, "Max. lines"),
            prop("numbers_only", PropKind::Boolean, "Numbers only"),
            prop("remember", PropKind::Boolean, "Remember last value"),
        ],
        default_data: || {
            json!({ "field": "", "remember": false, "max_lines": 1, "numbers_only": false })
        },
    },
    ElementSpec {
        kind: ElementKind::Checkbox,
        name: "Check box",
        schema: &[
            prop("label", PropKind::String, "Label"),
            prop("field", PropKind::Field, "Field"),
            prop("initial", PropKind::Boolean, "Initial value"),
            prop("remember", PropKind::Boolean, "Remember last value"),
        ],
        default_data: || json!({ "label": "Text", "field": "", "initial": false, "remember": false }),
    },
    ElementSpec {
        kind: ElementKind::Datetime,
        name: "Date & time",
        schema: &[
            prop("field", PropKind::Field, "Field"),
            prop("datetime", PropKind::Select(DATETIME_GRANULARITIES), "Type"),
            prop("initial", PropKind::Datetime, "Initial value"),
            prop("remember", PropKind::Boolean, "Remember last value"),
        ],
        default_data: || json!({ "field": "", "datetime": "date", "remember": false }),
    },
    ElementSpec {
        kind: ElementKind::Coordinates,
        name: "Coordinates",
        schema: &[
            prop("field_lon", PropKind::Field, "Longitude field"),
            prop("field_lat", PropKind::Field, "Latitude field"),
            prop("hidden", PropKind::Boolean, "Hidden"),
        ],
        default_data: || json!({ "field_lon": "", "field_lat": "", "hidden": false }),
    },
    ElementSpec {
        kind: ElementKind::Distance,
        name: "Distance meter",
        schema: &[prop("field", PropKind::Field, "Field")],
        default_data: || json!({ "field": "" }),
    },
    ElementSpec {
        kind: ElementKind::Average,
        name: "Average calculator",
        schema: &[
            prop("field", PropKind::Field, "Field"),
            prop("samples", PropKind::Number { min: 2, max: 9 }, "Number of samples"),
        ],
        default_data: || json!({ "field": "", "samples": 2 }),
    },
    ElementSpec {
        kind: ElementKind::Photo,
        name: "Photo",
        schema: &[
            prop("max_count", PropKind::Number { min: 1, max: 19 }, "Max. count"),
            prop("comment", PropKind::String, "Comment"),
        ],
        default_data: || json!({ "max_count": 1, "comment": "" }),
    },
    ElementSpec {
        kind: ElementKind::System,
        name: "System field",
        schema: &[
            prop("field", PropKind::Field, "Field"),
            prop("system", PropKind::Select(SYSTEM_SOURCES), "Type"),
        ],
        default_data: || json!({ "field": "", "system": "ngid_username" }),
    },
    ElementSpec {
        kind: ElementKind::Dropdown,
        name: "Dropdown",
        schema: &[
            prop("field", PropKind::Field, "Field"),
            prop("remember", PropKind::Boolean, "Remember last value"),
            prop("free_input", PropKind::Boolean, "Allow free input"),
            prop("options", PropKind::Options, "Options"),
        ],
        default_data: || json!({ "field": "", "remember": false, "free_input": false, "options": [] }),
    },
    ElementSpec {
        kind: ElementKind::DropdownDual,
        name: "Dual dropdown",
        schema: &[
            prop("field", PropKind::Field, "Field"),
            prop("remember", PropKind::Boolean, "Remember last value"),
            prop("label_first", PropKind::String, "First label"),
            prop("label_second", PropKind::String, "Second label"),
            prop("options", PropKind::Options, "Options"),
        ],
        default_data: || {
            json!({
                "field": "",
                "remember": false,
                "label_first": "",
                "label_second": "",
                "options": []
            })
        },
    },
    ElementSpec {
        kind: ElementKind::Radio,
        name: "Radio group",
        schema: &[
            prop("field", PropKind::Field, "Field"),
            prop("remember", PropKind::Boolean, "Remember last value"),
            prop("options", PropKind::Options, "Options"),
        ],
        default_data: || json!({ "field": "", "remember": false, "options": [] }),
    },
    ElementSpec {
        kind: ElementKind::Cascade,
        name: "Dependent dropdowns",
        schema: &[
            prop("field_primary", PropKind::Field, "Primary field"),
            prop("field_secondary", PropKind::Field, "Secondary field"),
            prop("remember", PropKind::Boolean, "Remember last value"),
            prop("options", PropKind::CascadeOptions, "Options"),
        ],
        default_data: || {
            json!({ "field_primary": "", "field_secondary": "", "remember": false, "options": [] })
        },
    },
];

/// Union of every field-tagged property key, first-seen order.
static ALL_FIELD_PROPS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    let mut keys: Vec<&'static str> = Vec::new();
    for spec in ELEMENTS {
        for key in spec.field_props() {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }
    keys
});

// ─── Lookup ──────────────────────────────────────────────────────────────

pub fn elements() -> &'static [ElementSpec] {
    ELEMENTS
}

/// Registry entry for a type; `None` for the transient drop marker.
pub fn spec(kind: ElementKind) -> Option<&'static ElementSpec> {
    ELEMENTS.iter().find(|s| s.kind == kind)
}

pub fn all_field_props() -> &'static [&'static str] {
    &ALL_FIELD_PROPS
}

/// Field-tagged property keys of one element type, in schema order.
pub fn field_props(kind: ElementKind) -> Vec<&'static str> {
    spec(kind)
        .map(|s| s.field_props().collect())
        .unwrap_or_default()
}

pub fn is_field_bearing(kind: ElementKind) -> bool {
    spec(kind).is_some_and(|s| s.field_props().next().is_some())
}

// ─── Construction ────────────────────────────────────────────────────────

/// Build a fresh node of `kind` with its registry defaults.
///
/// Tabs nodes get two empty tabs, the first one active.
pub fn new_node(kind: ElementKind, ids: &mut IdAllocator) -> Node {
    new_node_with_titles(kind, ids, DEFAULT_TAB_TITLE)
}

pub fn new_node_with_titles(kind: ElementKind, ids: &mut IdAllocator, tab_title: &str) -> Node {
    let (name, data) = match spec(kind) {
        Some(s) => (s.name.to_string(), s.default_data()),
        None => (kind.as_str().to_string(), DataBag::new()),
    };

    let tabs = (kind == ElementKind::Tabs).then(|| {
        smallvec![
            new_tab(tab_title, 1, true, ids),
            new_tab(tab_title, 2, false, ids),
        ]
    });

    Node {
        id: ids.next_node_id(),
        value: NodeValue { kind, name, tabs },
        data,
    }
}

/// Build an empty tab numbered `number` (1-based) with a fresh list.
pub fn new_tab(template: &str, number: usize, active: bool, ids: &mut IdAllocator) -> Tab {
    Tab {
        title: tab_title(template, number),
        active,
        items: ItemList::new(ids.next_list_id()),
    }
}

pub fn tab_title(template: &str, number: usize) -> String {
    template.replacen("{}", &number.to_string(), 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_placeable_kind_is_registered() {
        for kind in ElementKind::PLACEABLE {
            assert!(spec(kind).is_some(), "{kind} missing from registry");
        }
        assert!(spec(ElementKind::DropPlace).is_none());
    }

    #[test]
    fn textbox_defaults() {
        let mut ids = IdAllocator::new();
        let node = new_node(ElementKind::Textbox, &mut ids);
        assert_eq!(node.data_str("field"), Some(""));
        assert_eq!(node.data.get("remember"), Some(&json!(false)));
        assert_eq!(node.data.get("max_lines"), Some(&json!(1)));
        assert!(node.value.tabs.is_none());
    }

    #[test]
    fn tabs_node_starts_with_two_tabs() {
        let mut ids = IdAllocator::new();
        let node = new_node(ElementKind::Tabs, &mut ids);
        let tabs = node.tabs();
        assert_eq!(tabs.len(), 2);
        assert_eq!(tabs[0].title, "Tab 1");
        assert_eq!(tabs[1].title, "Tab 2");
        assert!(tabs[0].active);
        assert!(!tabs[1].active);
        assert_ne!(tabs[0].items.list_id, tabs[1].items.list_id);
        assert!(tabs.iter().all(|t| t.items.is_empty()));
    }

    #[test]
    fn field_props_union() {
        let all = all_field_props();
        assert_eq!(
            all,
            &["field", "field_lon", "field_lat", "field_primary", "field_secondary"]
        );
        assert_eq!(field_props(ElementKind::Coordinates), vec!["field_lon", "field_lat"]);
        assert!(is_field_bearing(ElementKind::Cascade));
        assert!(!is_field_bearing(ElementKind::Label));
        assert!(!is_field_bearing(ElementKind::Tabs));
    }

    #[test]
    fn localized_tab_titles() {
        let mut ids = IdAllocator::new();
        let node = new_node_with_titles(ElementKind::Tabs, &mut ids, "Вкладка {}");
        assert_eq!(node.tabs()[1].title, "Вкладка 2");
    }
}
