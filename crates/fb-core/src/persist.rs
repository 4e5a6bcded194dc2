//! Persisted wire format and the conversion to and from the editable tree.
//!
//! The wire format is a flat JSON item list: every element is a single
//! object `{ "type": ..., ...properties }`, and a tabs element nests its
//! pages as `{ "type": "tabs", "tabs": [{ title, active, items }] }`.
//! Ids exist only in memory: `deserialize` hands out fresh ones.

use crate::error::Result;
use crate::id::{IdAllocator, ListId};
use crate::locate::max_id;
use crate::model::{DataBag, Document, ElementKind, Field, FieldDatatype, GeometryType, ItemList, Node, NodeValue, Tab};
use crate::registry::spec;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smallvec::SmallVec;

// ─── Wire types ──────────────────────────────────────────────────────────

/// One persisted element.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Tabs { tabs: Vec<PersistedTab> },
    Element { kind: ElementKind, data: DataBag },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedTab {
    pub title: String,
    pub active: bool,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl Item {
    pub fn kind(&self) -> ElementKind {
        match self {
            Item::Tabs { .. } => ElementKind::Tabs,
            Item::Element { kind, .. } => *kind,
        }
    }

    fn from_map(mut map: DataBag) -> std::result::Result<Self, String> {
        let tag = match map.remove("type") {
            Some(Value::String(tag)) => tag,
            Some(other) => return Err(format!("item type must be a string, got {other}")),
            None => return Err("item without a type".into()),
        };
        let kind = ElementKind::from_tag(&tag).ok_or_else(|| format!("unknown item type: {tag}"))?;
        if kind != ElementKind::Tabs {
            return Ok(Item::Element { kind, data: map });
        }
        let tabs = match map.remove("tabs") {
            Some(value) => serde_json::from_value(value).map_err(|e| format!("invalid tabs: {e}"))?,
            None => Vec::new(),
        };
        Ok(Item::Tabs { tabs })
    }
}

impl Serialize for Item {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Item::Tabs { tabs } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", ElementKind::Tabs.as_str())?;
                map.serialize_entry("tabs", tabs)?;
                map.end()
            }
            Item::Element { kind, data } => {
                let mut map = serializer.serialize_map(Some(data.len() + 1))?;
                map.serialize_entry("type", kind.as_str())?;
                for (key, value) in data.iter().filter(|(k, _)| k.as_str() != "type") {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Item {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let map = DataBag::deserialize(deserializer)?;
        Item::from_map(map).map_err(de::Error::custom)
    }
}

/// Field as persisted: the `existing` flag is recomputed on every load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedField {
    pub keyname: String,
    pub display_name: String,
    #[serde(default)]
    pub datatype: FieldDatatype,
}

impl From<&Field> for PersistedField {
    fn from(field: &Field) -> Self {
        Self {
            keyname: field.keyname.clone(),
            display_name: field.display_name.clone(),
            datatype: field.datatype,
        }
    }
}

impl From<PersistedField> for Field {
    fn from(field: PersistedField) -> Self {
        Field::new(field.keyname, field.display_name, field.datatype)
    }
}

/// The saved form document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PersistedDocument {
    #[serde(default)]
    pub geometry_type: GeometryType,
    #[serde(default)]
    pub fields: Vec<PersistedField>,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub update_feature_layer_fields: bool,
}

// ─── Datetime initial values ─────────────────────────────────────────────

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Wire value meaning "use the current moment when the form opens".
pub const CURRENT_INITIAL: &str = "CURRENT";

/// Granularity of a datetime element's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Granularity {
    #[default]
    Date,
    Time,
    Datetime,
}

impl Granularity {
    const ALL: [Granularity; 3] = [Granularity::Datetime, Granularity::Date, Granularity::Time];

    pub fn of(data: &DataBag) -> Self {
        match data.get("datetime").and_then(Value::as_str) {
            Some("time") => Granularity::Time,
            Some("datetime") => Granularity::Datetime,
            _ => Granularity::Date,
        }
    }

    pub fn wire_format(self) -> &'static str {
        match self {
            Granularity::Date => DATE_FORMAT,
            Granularity::Time => TIME_FORMAT,
            Granularity::Datetime => DATETIME_FORMAT,
        }
    }

    fn parse(self, text: &str) -> Option<NaiveDateTime> {
        match self {
            Granularity::Date => NaiveDate::parse_from_str(text, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0)),
            Granularity::Time => {
                let time = NaiveTime::parse_from_str(text, TIME_FORMAT).ok()?;
                Some(NaiveDateTime::new(NaiveDate::default(), time))
            }
            Granularity::Datetime => NaiveDateTime::parse_from_str(text, DATETIME_FORMAT).ok(),
        }
    }
}

/// Parse `text` in the node's own wire format, falling back to the other
/// two. A granularity switch keeps a value entered under the old one.
fn parse_initial(own: Granularity, text: &str) -> Option<NaiveDateTime> {
    std::iter::once(own)
        .chain(Granularity::ALL)
        .find_map(|g| g.parse(text))
}

/// Explicit initial value of a datetime node, if any.
///
/// In memory the value is kept as a full `YYYY-MM-DDTHH:MM:SS` string;
/// a time-only value sits on 1970-01-01.
pub fn initial_value(data: &DataBag) -> Option<NaiveDateTime> {
    let text = data.get("initial")?.as_str()?;
    parse_initial(Granularity::of(data), text)
}

/// Set or clear the explicit initial value of a datetime node.
pub fn set_initial_value(data: &mut DataBag, value: Option<NaiveDateTime>) {
    match value {
        Some(moment) => {
            let text = moment.format(DATETIME_FORMAT).to_string();
            data.insert("initial".into(), Value::String(text));
        }
        None => {
            data.remove("initial");
        }
    }
}

fn encode_initial(data: &mut DataBag) {
    let encoded = initial_value(data).map(|moment| {
        moment
            .format(Granularity::of(data).wire_format())
            .to_string()
    });
    match encoded {
        Some(text) => {
            data.insert("initial".into(), Value::String(text));
        }
        None => {
            if let Some(dropped) = data.remove("initial")
                && !dropped.is_null()
                && dropped.as_str() != Some(CURRENT_INITIAL)
            {
                log::warn!("unparseable datetime initial value {dropped}, not saved");
            }
        }
    }
}

fn decode_initial(data: &mut DataBag) {
    let decoded = match data.get("initial") {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) if text == CURRENT_INITIAL => None,
        Some(Value::String(text)) => {
            let parsed = parse_initial(Granularity::of(data), text);
            if parsed.is_none() {
                log::warn!("unparseable datetime initial value {text:?}, ignored");
            }
            parsed
        }
        Some(other) => {
            log::warn!("datetime initial value is not a string: {other}, ignored");
            None
        }
    };
    set_initial_value(data, decoded);
}

// ─── Tree conversion ─────────────────────────────────────────────────────

/// Flatten a tree into persisted items, depth-first.
pub fn serialize(root: &ItemList) -> Vec<Item> {
    root.list.iter().filter_map(serialize_node).collect()
}

fn serialize_node(node: &Node) -> Option<Item> {
    match node.kind() {
        ElementKind::DropPlace => None,
        ElementKind::Tabs => Some(Item::Tabs {
            tabs: node
                .tabs()
                .iter()
                .map(|tab| PersistedTab {
                    title: tab.title.clone(),
                    active: tab.active,
                    items: serialize(&tab.items),
                })
                .collect(),
        }),
        kind => {
            let mut data = node.data.clone();
            if kind == ElementKind::Datetime {
                encode_initial(&mut data);
            }
            Some(Item::Element { kind, data })
        }
    }
}

/// Rebuild a tree from persisted items. The root list is `ListId::ROOT`;
/// every other list and every node gets a fresh id from `ids`.
pub fn deserialize(items: &[Item], ids: &mut IdAllocator) -> ItemList {
    ItemList {
        list_id: ListId::ROOT,
        list: deserialize_list(items, ids),
    }
}

fn deserialize_list(items: &[Item], ids: &mut IdAllocator) -> Vec<Node> {
    items
        .iter()
        .filter_map(|item| deserialize_item(item, ids))
        .collect()
}

fn node_name(kind: ElementKind) -> String {
    spec(kind).map_or_else(|| kind.as_str().to_string(), |s| s.name.to_string())
}

fn deserialize_item(item: &Item, ids: &mut IdAllocator) -> Option<Node> {
    match item {
        Item::Tabs { tabs } => {
            let tabs: SmallVec<[Tab; 2]> = tabs
                .iter()
                .map(|tab| Tab {
                    title: tab.title.clone(),
                    active: tab.active,
                    items: ItemList {
                        list_id: ids.next_list_id(),
                        list: deserialize_list(&tab.items, ids),
                    },
                })
                .collect();
            Some(Node {
                id: ids.next_node_id(),
                value: NodeValue {
                    kind: ElementKind::Tabs,
                    name: node_name(ElementKind::Tabs),
                    tabs: Some(tabs),
                },
                data: DataBag::new(),
            })
        }
        Item::Element {
            kind: ElementKind::DropPlace,
            ..
        } => {
            log::warn!("dropping transient dropPlace marker on load");
            None
        }
        Item::Element { kind, data } => {
            let mut data = data.clone();
            if *kind == ElementKind::Datetime {
                decode_initial(&mut data);
            }
            let node = Node {
                id: ids.next_node_id(),
                value: NodeValue {
                    kind: *kind,
                    name: node_name(*kind),
                    tabs: None,
                },
                data,
            };
            log::trace!("loaded {} as {}", node.kind(), node.id);
            Some(node)
        }
    }
}

// ─── Documents ───────────────────────────────────────────────────────────

impl Document {
    /// Build an editable document, allocating ids from `ids`.
    ///
    /// `ids` is first moved above anything it may already have issued,
    /// so ids stay unique if the caller keeps using the same allocator.
    pub fn from_persisted(persisted: &PersistedDocument, ids: &mut IdAllocator) -> Self {
        let root = deserialize(&persisted.items, ids);
        ids.observe(max_id(&root));
        Document {
            root,
            fields: persisted.fields.iter().cloned().map(Field::from).collect(),
            geometry_type: persisted.geometry_type,
            update_feature_layer_fields: persisted.update_feature_layer_fields,
        }
    }

    pub fn to_persisted(&self) -> PersistedDocument {
        PersistedDocument {
            geometry_type: self.geometry_type,
            fields: self.fields.iter().map(PersistedField::from).collect(),
            items: serialize(&self.root),
            update_feature_layer_fields: self.update_feature_layer_fields,
        }
    }

    /// Parse a saved JSON document with a fresh allocator.
    pub fn from_json(json: &str) -> Result<(Self, IdAllocator)> {
        let persisted: PersistedDocument = serde_json::from_str(json)?;
        let mut ids = IdAllocator::new();
        let doc = Self::from_persisted(&persisted, &mut ids);
        Ok((doc, ids))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_persisted())?)
    }
}
