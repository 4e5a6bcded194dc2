//! Export to the legacy mobile-form element format.
//!
//! Legacy elements are `{ "type": ..., "attributes": {...} }` objects
//! with their own type names and attribute keys; tabs become pages.
//! Properties missing from an item fall back to the element defaults.

use crate::model::{DataBag, ElementKind};
use crate::persist::{Granularity, Item, PersistedTab};
use chrono::NaiveDateTime;
use serde_json::{Map, Value, json};

/// Legacy type name of an element kind. `None` for the drop marker.
pub fn legacy_type(kind: ElementKind) -> Option<&'static str> {
    Some(match kind {
        ElementKind::Label => "text",
        ElementKind::Spacer => "space",
        ElementKind::Tabs => "tabs",
        ElementKind::Textbox | ElementKind::System => "text_edit",
        ElementKind::Checkbox => "checkbox",
        ElementKind::Datetime => "date_time",
        ElementKind::Coordinates => "coordinates",
        ElementKind::Distance => "distance",
        ElementKind::Average => "average_counter",
        ElementKind::Photo => "photo",
        ElementKind::Dropdown => "combobox",
        ElementKind::DropdownDual => "split_compobox",
        ElementKind::Radio => "radio_group",
        ElementKind::Cascade => "double_combobox",
        ElementKind::DropPlace => return None,
    })
}

/// Convert persisted items into legacy elements.
pub fn to_legacy(items: &[Item]) -> Vec<Value> {
    items.iter().filter_map(item_to_legacy).collect()
}

fn item_to_legacy(item: &Item) -> Option<Value> {
    let legacy = legacy_type(item.kind())?;
    let mut out = json!({ "type": legacy, "attributes": {} });
    match item {
        Item::Tabs { tabs } => {
            out["pages"] = Value::Array(tabs.iter().map(page_to_legacy).collect());
        }
        Item::Element { kind, data } => {
            out["attributes"] = Value::Object(attributes(*kind, data));
        }
    }
    Some(out)
}

fn page_to_legacy(tab: &PersistedTab) -> Value {
    let mut page = Map::new();
    page.insert("caption".into(), json!(tab.title));
    if tab.active {
        page.insert("default".into(), json!(true));
    }
    page.insert("elements".into(), Value::Array(to_legacy(&tab.items)));
    Value::Object(page)
}

// ─── Attributes ──────────────────────────────────────────────────────────

fn text<'a>(data: &'a DataBag, key: &str) -> &'a str {
    data.get(key).and_then(Value::as_str).unwrap_or("")
}

fn flag(data: &DataBag, key: &str) -> bool {
    data.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn number(data: &DataBag, key: &str, default: i64) -> i64 {
    data.get(key).and_then(Value::as_i64).unwrap_or(default)
}

fn attributes(kind: ElementKind, data: &DataBag) -> Map<String, Value> {
    let mut attrs = Map::new();
    let mut set = |key: &str, value: Value| {
        attrs.insert(key.to_string(), value);
    };
    match kind {
        ElementKind::Label => set("text", json!(text(data, "label"))),
        ElementKind::Textbox => {
            set("field", json!(text(data, "field")));
            set("last", json!(flag(data, "remember")));
            set("text", json!(text(data, "initial")));
            set("max_string_count", json!(number(data, "max_lines", 1)));
            set("only_figures", json!(flag(data, "numbers_only")));
            set("ngid_login", json!(false));
            set("ngw_login", json!(false));
        }
        ElementKind::System => {
            let source = text(data, "system");
            set("field", json!(text(data, "field")));
            set("text", json!(""));
            set("max_string_count", json!(1));
            set("only_figures", json!(false));
            set("ngid_login", json!(source != "ngw_username"));
            set("ngw_login", json!(source == "ngw_username"));
        }
        ElementKind::Checkbox => {
            set("field", json!(text(data, "field")));
            set("last", json!(flag(data, "remember")));
            set("init_value", json!(flag(data, "initial")));
            set("text", json!(text(data, "label")));
        }
        ElementKind::Datetime => {
            let granularity = Granularity::of(data);
            let date_type = match granularity {
                Granularity::Date => 0,
                Granularity::Time => 1,
                Granularity::Datetime => 2,
            };
            set("field", json!(text(data, "field")));
            set("last", json!(flag(data, "remember")));
            set("date_type", json!(date_type));
            set("datetime", legacy_datetime(granularity, data.get("initial")));
        }
        ElementKind::Radio => {
            set("field", json!(text(data, "field")));
            set("last", json!(flag(data, "remember")));
            set("values", options(data, single_option));
        }
        ElementKind::Dropdown => {
            set("field", json!(text(data, "field")));
            set("last", json!(flag(data, "remember")));
            set("values", options(data, single_option));
            set("input_search", json!(true));
            set("allow_adding_values", json!(flag(data, "free_input")));
        }
        ElementKind::DropdownDual => {
            set("field", json!(text(data, "field")));
            set("last", json!(flag(data, "remember")));
            set("values", options(data, dual_option));
            set("label1", json!(text(data, "label_first")));
            set("label2", json!(text(data, "label_second")));
        }
        ElementKind::Cascade => {
            set("field_level1", json!(text(data, "field_primary")));
            set("field_level2", json!(text(data, "field_secondary")));
            set("last", json!(flag(data, "remember")));
            set("values", options(data, cascade_option));
        }
        ElementKind::Coordinates => {
            set("field_long", json!(text(data, "field_lon")));
            set("field_lat", json!(text(data, "field_lat")));
            set("hidden", json!(flag(data, "hidden")));
            set("crs", json!(0));
            set("format", json!(0));
        }
        ElementKind::Distance => set("field", json!(text(data, "field"))),
        ElementKind::Average => {
            set("field", json!(text(data, "field")));
            set("num_values", json!(number(data, "samples", 2)));
        }
        ElementKind::Photo => {
            set("gallery_size", json!(number(data, "max_count", 1)));
            set("comment", json!(text(data, "comment")));
        }
        ElementKind::Spacer | ElementKind::Tabs | ElementKind::DropPlace => {}
    }
    attrs
}

/// Full datetimes switch to a space separator; dates and times pass as is.
fn legacy_datetime(granularity: Granularity, initial: Option<&Value>) -> Value {
    let Some(raw) = initial.and_then(Value::as_str) else {
        return Value::Null;
    };
    if granularity != Granularity::Datetime {
        return json!(raw);
    }
    match NaiveDateTime::parse_from_str(raw, granularity.wire_format()) {
        Ok(moment) => json!(moment.format("%Y-%m-%d %H:%M:%S").to_string()),
        Err(err) => {
            log::warn!("legacy export: bad datetime {raw:?}: {err}");
            Value::Null
        }
    }
}

// ─── Options ─────────────────────────────────────────────────────────────

fn options(data: &DataBag, convert: fn(&Map<String, Value>) -> Value) -> Value {
    let list = data.get("options").and_then(Value::as_array);
    Value::Array(
        list.into_iter()
            .flatten()
            .filter_map(Value::as_object)
            .map(convert)
            .collect(),
    )
}

fn option_base(option: &Map<String, Value>, alias_key: &str) -> Map<String, Value> {
    let mut out = Map::new();
    out.insert("name".into(), json!(text(option, "value")));
    out.insert("alias".into(), json!(text(option, alias_key)));
    out
}

fn with_default(mut out: Map<String, Value>, option: &Map<String, Value>) -> Value {
    if let Some(initial) = option.get("initial").and_then(Value::as_bool) {
        out.insert("default".into(), json!(initial));
    }
    Value::Object(out)
}

fn single_option(option: &Map<String, Value>) -> Value {
    with_default(option_base(option, "label"), option)
}

fn dual_option(option: &Map<String, Value>) -> Value {
    let mut out = option_base(option, "first");
    out.insert("alias2".into(), json!(text(option, "second")));
    with_default(out, option)
}

fn cascade_option(option: &Map<String, Value>) -> Value {
    let mut out = match single_option(option) {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    let nested = option.get("items").and_then(Value::as_array);
    let values: Vec<Value> = nested
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
        .map(single_option)
        .collect();
    out.insert("values".into(), Value::Array(values));
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn items(value: Value) -> Vec<Item> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn textbox_and_label() {
        let out = to_legacy(&items(json!([
            {"type": "label", "label": "Name"},
            {"type": "textbox", "field": "name", "remember": true, "max_lines": 2, "numbers_only": false}
        ])));
        assert_eq!(
            Value::Array(out),
            json!([
                {"type": "text", "attributes": {"text": "Name"}},
                {"type": "text_edit", "attributes": {
                    "field": "name", "last": true, "text": "", "max_string_count": 2,
                    "only_figures": false, "ngid_login": false, "ngw_login": false
                }}
            ])
        );
    }

    #[test]
    fn tabs_become_pages() {
        let out = to_legacy(&items(json!([
            {"type": "tabs", "tabs": [
                {"title": "Main", "active": true, "items": [{"type": "spacer"}]},
                {"title": "More", "active": false, "items": []}
            ]}
        ])));
        assert_eq!(
            out[0],
            json!({
                "type": "tabs",
                "attributes": {},
                "pages": [
                    {"caption": "Main", "default": true, "elements": [{"type": "space", "attributes": {}}]},
                    {"caption": "More", "elements": []}
                ]
            })
        );
    }

    #[test]
    fn datetime_types() {
        let out = to_legacy(&items(json!([
            {"type": "datetime", "field": "a", "remember": false, "datetime": "datetime", "initial": "2024-03-15T08:30:00"},
            {"type": "datetime", "field": "b", "remember": false, "datetime": "time", "initial": "08:30:00"},
            {"type": "datetime", "field": "c", "remember": false, "datetime": "date"}
        ])));
        assert_eq!(out[0]["attributes"]["date_type"], json!(2));
        assert_eq!(out[0]["attributes"]["datetime"], json!("2024-03-15 08:30:00"));
        assert_eq!(out[1]["attributes"]["date_type"], json!(1));
        assert_eq!(out[1]["attributes"]["datetime"], json!("08:30:00"));
        assert_eq!(out[2]["attributes"]["datetime"], Value::Null);
    }

    #[test]
    fn system_source_flags() {
        let out = to_legacy(&items(json!([
            {"type": "system", "field": "who", "system": "ngw_username"}
        ])));
        assert_eq!(out[0]["type"], json!("text_edit"));
        assert_eq!(out[0]["attributes"]["ngw_login"], json!(true));
        assert_eq!(out[0]["attributes"]["ngid_login"], json!(false));
    }

    #[test]
    fn option_lists() {
        let out = to_legacy(&items(json!([
            {"type": "dropdown_dual", "field": "d", "remember": false, "label_first": "EN", "label_second": "FR",
             "options": [{"value": "1", "first": "One", "second": "Un", "initial": true}]},
            {"type": "cascade", "field_primary": "p", "field_secondary": "s", "remember": false,
             "options": [{"value": "a", "label": "A", "items": [{"value": "a1", "label": "A1"}]}]}
        ])));
        assert_eq!(
            out[0]["attributes"]["values"],
            json!([{"name": "1", "alias": "One", "alias2": "Un", "default": true}])
        );
        assert_eq!(out[0]["attributes"]["label1"], json!("EN"));
        assert_eq!(out[1]["type"], json!("double_combobox"));
        assert_eq!(
            out[1]["attributes"]["values"],
            json!([{"name": "a", "alias": "A", "values": [{"name": "a1", "alias": "A1"}]}])
        );
    }
}
