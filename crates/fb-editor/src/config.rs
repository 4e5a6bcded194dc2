//! Editor session configuration.

use fb_core::fields::FieldTemplate;
use fb_core::model::FieldDatatype;
use fb_core::registry::DEFAULT_TAB_TITLE;
use serde::Deserialize;

/// Settings supplied by the host when an editor session starts.
///
/// Every key is optional when loaded from JSON; missing keys take the
/// defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Title of new tabs; `{}` is replaced with the 1-based tab number.
    /// Default: `"Tab {}"`.
    pub tab_title_template: String,

    /// Keyname prefix of auto-created fields. Default: `"field_"`.
    pub field_keyname_prefix: String,

    /// Display-name prefix of auto-created fields, joined to the number
    /// with a space. Default: `"Field"`.
    pub field_display_prefix: String,

    /// Datatype of auto-created fields. Default: `STRING`.
    pub new_field_datatype: FieldDatatype,

    /// Create and bind fields when a field-bearing element is placed from
    /// the palette. Default: **true**.
    pub auto_bind_fields: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            tab_title_template: DEFAULT_TAB_TITLE.to_string(),
            field_keyname_prefix: "field_".to_string(),
            field_display_prefix: "Field".to_string(),
            new_field_datatype: FieldDatatype::String,
            auto_bind_fields: true,
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn field_template(&self) -> FieldTemplate {
        FieldTemplate {
            keyname_prefix: self.field_keyname_prefix.clone(),
            display_prefix: self.field_display_prefix.clone(),
            datatype: self.new_field_datatype,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_field_template() {
        let config = EditorConfig::default();
        assert_eq!(config.field_template(), FieldTemplate::default());
        assert_eq!(config.tab_title_template, "Tab {}");
        assert!(config.auto_bind_fields);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EditorConfig::from_json(r#"{"tab_title_template": "Page {}", "new_field_datatype": "INTEGER"}"#)
            .unwrap();
        assert_eq!(config.tab_title_template, "Page {}");
        assert_eq!(config.new_field_datatype, FieldDatatype::Integer);
        assert_eq!(config.field_keyname_prefix, "field_");
        assert!(config.auto_bind_fields);
    }
}
