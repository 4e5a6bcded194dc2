//! Field catalog: declaration, validation, and cleanup of data fields.
//!
//! The catalog is a plain `Vec<Field>` owned by the document. Every
//! operation here validates first and writes second, so an `Err` leaves
//! both the catalog and the tree exactly as they were.

use crate::error::{FormError, Result};
use crate::locate::{is_field_occupied, nodes_binding_field};
use crate::model::{Field, FieldDatatype, ItemList};
use crate::mutate::unbind_field;
use serde::{Deserialize, Serialize};

/// How automatically created fields are named and typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldTemplate {
    /// `field_` yields `field_1`, `field_2`, ...
    pub keyname_prefix: String,
    /// `Field` yields `Field 1`, `Field 2`, ...
    pub display_prefix: String,
    pub datatype: FieldDatatype,
}

impl Default for FieldTemplate {
    fn default() -> Self {
        Self {
            keyname_prefix: "field_".into(),
            display_prefix: "Field".into(),
            datatype: FieldDatatype::String,
        }
    }
}

impl FieldTemplate {
    fn keyname(&self, n: usize) -> String {
        format!("{}{n}", self.keyname_prefix)
    }

    fn display_name(&self, n: usize) -> String {
        format!("{} {n}", self.display_prefix)
    }
}

pub fn find_field<'a>(fields: &'a [Field], keyname: &str) -> Option<&'a Field> {
    fields.iter().find(|f| f.keyname == keyname)
}

// ─── Naming ──────────────────────────────────────────────────────────────

/// Smallest `prefix + N` (N >= 1) not used as a keyname.
pub fn generate_unique_keyname(fields: &[Field], prefix: &str) -> String {
    (1..)
        .map(|n| format!("{prefix}{n}"))
        .find(|key| find_field(fields, key).is_none())
        .unwrap_or_else(|| prefix.to_string())
}

/// Smallest N whose generated keyname and display name are both free.
pub fn next_free_suffix(fields: &[Field], template: &FieldTemplate) -> usize {
    (1..)
        .find(|&n| {
            let key = template.keyname(n);
            let display = template.display_name(n);
            !fields
                .iter()
                .any(|f| f.keyname == key || f.display_name == display)
        })
        .unwrap_or(1)
}

/// Build (but do not add) a new field with the next free name.
pub fn mint_field(fields: &[Field], template: &FieldTemplate) -> Field {
    let n = next_free_suffix(fields, template);
    Field::new(template.keyname(n), template.display_name(n), template.datatype)
}

// ─── Catalog edits ───────────────────────────────────────────────────────

/// Append `candidate`, rejecting empty or colliding names.
pub fn add_field(fields: &mut Vec<Field>, candidate: Field) -> Result<()> {
    if candidate.keyname.trim().is_empty() {
        return Err(FormError::EmptyKeyname);
    }
    if candidate.display_name.trim().is_empty() {
        return Err(FormError::EmptyDisplayName);
    }
    if find_field(fields, &candidate.keyname).is_some() {
        return Err(FormError::KeynameTaken(candidate.keyname));
    }
    if fields.iter().any(|f| f.display_name == candidate.display_name) {
        return Err(FormError::DisplayNameTaken(candidate.display_name));
    }
    log::debug!("field added: {}", candidate.keyname);
    fields.push(candidate);
    Ok(())
}

/// Partial update of a field. `None` leaves the attribute alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPatch {
    pub display_name: Option<String>,
    pub datatype: Option<FieldDatatype>,
}

/// Apply `patch` to the field `keyname`.
///
/// The display name is editable on every field; the datatype only on
/// fields that are new to this form.
pub fn update_field(fields: &mut [Field], keyname: &str, patch: FieldPatch) -> Result<()> {
    let index = fields
        .iter()
        .position(|f| f.keyname == keyname)
        .ok_or_else(|| FormError::FieldNotFound(keyname.to_string()))?;

    if let Some(datatype) = patch.datatype
        && fields[index].existing
        && fields[index].datatype != datatype
    {
        return Err(FormError::ExistingFieldLocked(keyname.to_string()));
    }
    if let Some(display) = &patch.display_name {
        if display.trim().is_empty() {
            return Err(FormError::EmptyDisplayName);
        }
        let taken = fields
            .iter()
            .enumerate()
            .any(|(i, f)| i != index && &f.display_name == display);
        if taken {
            return Err(FormError::DisplayNameTaken(display.clone()));
        }
    }

    let field = &mut fields[index];
    if let Some(display) = patch.display_name {
        field.display_name = display;
    }
    if let Some(datatype) = patch.datatype {
        field.datatype = datatype;
    }
    log::debug!("field updated: {keyname}");
    Ok(())
}

/// Remove a new field and reset every property bound to it.
///
/// Returns the removed field and the number of cleared bindings.
pub fn delete_field(fields: &mut Vec<Field>, root: &mut ItemList, keyname: &str) -> Result<(Field, usize)> {
    let index = fields
        .iter()
        .position(|f| f.keyname == keyname)
        .ok_or_else(|| FormError::FieldNotFound(keyname.to_string()))?;
    if fields[index].existing {
        return Err(FormError::ExistingFieldLocked(keyname.to_string()));
    }

    let expected = nodes_binding_field(keyname, root).len();
    let cleared = unbind_field(root, keyname);
    let field = fields.remove(index);

    let leftover = is_field_occupied(keyname, root);
    if leftover || (expected > 0 && cleared == 0) {
        log::error!("field {keyname} still referenced after delete cascade");
    }
    debug_assert!(!leftover, "delete cascade left references to {keyname}");

    log::debug!("field deleted: {keyname}, {cleared} binding(s) cleared");
    Ok((field, cleared))
}

// ─── Derived views ───────────────────────────────────────────────────────

/// Display status of a field in the catalog panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldStatus {
    /// On the layer and bound by some element.
    ExistingUsed,
    ExistingUnused,
    /// New, bound, and will be created on the layer when saved.
    WillUpdate,
    /// New and bound, but the layer will not receive it.
    Pending,
    NewUnused,
}

pub fn classify(field: &Field, root: &ItemList, update_layer_fields: bool, can_update_fields: bool) -> FieldStatus {
    let used = is_field_occupied(&field.keyname, root);
    match (field.existing, used) {
        (true, true) => FieldStatus::ExistingUsed,
        (true, false) => FieldStatus::ExistingUnused,
        (false, true) if can_update_fields && update_layer_fields => FieldStatus::WillUpdate,
        (false, true) => FieldStatus::Pending,
        (false, false) => FieldStatus::NewUnused,
    }
}

/// Fields bound by at least one element, in catalog order.
pub fn referenced_fields(fields: &[Field], root: &ItemList) -> Vec<Field> {
    fields
        .iter()
        .filter(|f| is_field_occupied(&f.keyname, root))
        .cloned()
        .collect()
}

/// Combine the parent layer's fields with this form's declarations.
///
/// Layer fields come first and are marked existing; form fields follow
/// unless a layer field already owns their keyname. A form field whose
/// display name is taken gets a numbered one, so the merged catalog keeps
/// display names unique.
pub fn merge_existing(fields: &[Field], resource_fields: &[Field]) -> Vec<Field> {
    let mut merged: Vec<Field> = resource_fields
        .iter()
        .cloned()
        .map(Field::existing)
        .collect();
    for field in fields.iter().filter(|f| !f.existing) {
        if find_field(&merged, &field.keyname).is_some() {
            continue;
        }
        let mut field = field.clone();
        if display_name_taken(&merged, &field.display_name) {
            let renamed = (2..)
                .map(|n| format!("{} ({n})", field.display_name))
                .find(|name| !display_name_taken(&merged, name))
                .unwrap_or_else(|| field.display_name.clone());
            log::warn!(
                "{}: display name {:?} taken by a layer field, renamed to {renamed:?}",
                field.keyname,
                field.display_name
            );
            field.display_name = renamed;
        }
        merged.push(field);
    }
    merged
}

fn display_name_taken(fields: &[Field], display_name: &str) -> bool {
    fields.iter().any(|f| f.display_name == display_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{IdAllocator, ListId};
    use crate::model::ElementKind;
    use crate::registry::new_node;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn catalog() -> Vec<Field> {
        vec![
            Field::new("field_1", "Field 1", FieldDatatype::String),
            Field::new("field_2", "Field 2", FieldDatatype::Integer),
        ]
    }

    fn bound_tree(keyname: &str) -> ItemList {
        let mut ids = IdAllocator::new();
        let mut node = new_node(ElementKind::Textbox, &mut ids);
        node.data.insert("field".into(), json!(keyname));
        ItemList {
            list_id: ListId::ROOT,
            list: vec![node],
        }
    }

    #[test]
    fn keyname_generation_fills_gaps() {
        let mut fields = catalog();
        assert_eq!(generate_unique_keyname(&fields, "field_"), "field_3");
        fields.remove(0);
        assert_eq!(generate_unique_keyname(&fields, "field_"), "field_1");
        assert_eq!(generate_unique_keyname(&[], "field_"), "field_1");
    }

    #[test]
    fn minting_skips_taken_display_names() {
        let fields = vec![Field::new("other", "Field 1", FieldDatatype::Real)];
        let field = mint_field(&fields, &FieldTemplate::default());
        assert_eq!(field, Field::new("field_2", "Field 2", FieldDatatype::String));
    }

    #[test]
    fn add_rejects_collisions_and_blanks() {
        let mut fields = catalog();
        let dup_key = Field::new("field_1", "Another", FieldDatatype::String);
        assert!(matches!(add_field(&mut fields, dup_key), Err(FormError::KeynameTaken(_))));
        let dup_display = Field::new("other", "Field 2", FieldDatatype::String);
        assert!(matches!(
            add_field(&mut fields, dup_display),
            Err(FormError::DisplayNameTaken(_))
        ));
        let blank = Field::new(" ", "Blank", FieldDatatype::String);
        assert!(matches!(add_field(&mut fields, blank), Err(FormError::EmptyKeyname)));
        assert_eq!(fields, catalog());

        add_field(&mut fields, Field::new("height", "Height", FieldDatatype::Real)).unwrap();
        assert_eq!(fields.len(), 3);
    }

    #[test]
    fn existing_fields_keep_their_datatype() {
        let mut fields = vec![Field::new("name", "Name", FieldDatatype::String).existing()];
        let retype = FieldPatch {
            datatype: Some(FieldDatatype::Integer),
            ..FieldPatch::default()
        };
        assert!(matches!(
            update_field(&mut fields, "name", retype),
            Err(FormError::ExistingFieldLocked(_))
        ));
        let rename = FieldPatch {
            display_name: Some("Full name".into()),
            ..FieldPatch::default()
        };
        update_field(&mut fields, "name", rename).unwrap();
        assert_eq!(fields[0].display_name, "Full name");
        assert_eq!(fields[0].datatype, FieldDatatype::String);
    }

    #[test]
    fn update_unknown_field_fails() {
        let mut fields = catalog();
        let err = update_field(&mut fields, "nope", FieldPatch::default()).unwrap_err();
        assert_eq!(err.to_string(), "Field not found: nope");
    }

    #[test]
    fn delete_cascades_to_bindings() {
        let mut fields = catalog();
        let mut root = bound_tree("field_1");
        let (removed, cleared) = delete_field(&mut fields, &mut root, "field_1").unwrap();
        assert_eq!(removed.keyname, "field_1");
        assert_eq!(cleared, 1);
        assert_eq!(root.len(), 1);
        assert_eq!(root.list[0].data_str("field"), Some("-"));
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn existing_fields_cannot_be_deleted() {
        let mut fields = vec![Field::new("name", "Name", FieldDatatype::String).existing()];
        let mut root = bound_tree("name");
        let before = root.clone();
        assert!(matches!(
            delete_field(&mut fields, &mut root, "name"),
            Err(FormError::ExistingFieldLocked(_))
        ));
        assert_eq!(root, before);
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn status_classes() {
        let root = bound_tree("used");
        let existing_used = Field::new("used", "Used", FieldDatatype::String).existing();
        let existing_unused = Field::new("idle", "Idle", FieldDatatype::String).existing();
        let new_used = Field::new("used", "Used", FieldDatatype::String);
        let new_unused = Field::new("idle", "Idle", FieldDatatype::String);

        assert_eq!(classify(&existing_used, &root, false, false), FieldStatus::ExistingUsed);
        assert_eq!(classify(&existing_unused, &root, true, true), FieldStatus::ExistingUnused);
        assert_eq!(classify(&new_used, &root, true, true), FieldStatus::WillUpdate);
        assert_eq!(classify(&new_used, &root, true, false), FieldStatus::Pending);
        assert_eq!(classify(&new_used, &root, false, true), FieldStatus::Pending);
        assert_eq!(classify(&new_unused, &root, true, true), FieldStatus::NewUnused);
    }

    #[test]
    fn merge_puts_layer_fields_first() {
        let form = vec![
            Field::new("name", "Name (form)", FieldDatatype::String),
            Field::new("extra", "Extra", FieldDatatype::Real),
        ];
        let layer = vec![Field::new("name", "Name", FieldDatatype::String)];
        let merged = merge_existing(&form, &layer);
        assert_eq!(
            merged,
            vec![
                Field::new("name", "Name", FieldDatatype::String).existing(),
                Field::new("extra", "Extra", FieldDatatype::Real),
            ]
        );
    }

    #[test]
    fn merge_renames_clashing_display_names() {
        let form = vec![
            Field::new("title", "Name", FieldDatatype::String),
            Field::new("other", "Other", FieldDatatype::String),
        ];
        let layer = vec![
            Field::new("name", "Name", FieldDatatype::String),
            Field::new("code", "Name (2)", FieldDatatype::String),
        ];
        let merged = merge_existing(&form, &layer);
        let names: Vec<(&str, &str)> = merged
            .iter()
            .map(|f| (f.keyname.as_str(), f.display_name.as_str()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("name", "Name"),
                ("code", "Name (2)"),
                ("title", "Name (3)"),
                ("other", "Other")
            ]
        );
    }

    #[test]
    fn only_bound_fields_are_referenced() {
        let root = bound_tree("field_2");
        let referenced = referenced_fields(&catalog(), &root);
        assert_eq!(referenced, vec![Field::new("field_2", "Field 2", FieldDatatype::Integer)]);
    }
}
