//! Widget-category classification for resolved schemas.
//!
//! Decides which template family applies to a field: constant-set
//! multi-selects, file arrays, and whether the default field label should
//! be rendered at all. Classifiers never fail; a schema that cannot be
//! resolved is simply not a match.

use serde_json::Value;

use crate::resolver::{needs_resolution, retrieve_schema};

/// Whether a schema pins exactly one value: a `const`, or an `enum` with a
/// single entry.
pub fn is_constant(schema: &Value) -> bool {
    to_constant(schema).is_some()
}

/// The single value a constant schema pins, if any. `const` wins over a
/// single-entry `enum`.
pub fn to_constant(schema: &Value) -> Option<&Value> {
    if let Some(constant) = schema.get("const") {
        return Some(constant);
    }
    match schema.get("enum").and_then(Value::as_array) {
        Some(values) if values.len() == 1 => Some(&values[0]),
        _ => None,
    }
}

/// Whether a schema enumerates its values: an `enum` array, or a
/// `oneOf`/`anyOf` where every branch is a constant.
pub fn is_select(schema: &Value, root_schema: &Value) -> bool {
    let Some(schema) = resolve_for_classification(schema, root_schema) else {
        return false;
    };

    if schema.get("enum").is_some_and(Value::is_array) {
        return true;
    }
    for key in ["oneOf", "anyOf"] {
        if let Some(branches) = schema.get(key).and_then(Value::as_array) {
            return !branches.is_empty() && branches.iter().all(is_constant);
        }
    }
    false
}

/// Whether a schema describes a multi-select: a unique-items array whose
/// items are drawn from a fixed constant set.
pub fn is_multiselect(schema: &Value, root_schema: &Value) -> bool {
    if schema.get("uniqueItems") != Some(&Value::Bool(true)) {
        return false;
    }
    match schema.get("items") {
        Some(items) if items.is_object() => is_select(items, root_schema),
        _ => false,
    }
}

/// Whether a schema describes an array of file uploads: items of type
/// `string` with format `data-url`, or an explicit `ui:widget: "files"`
/// override.
pub fn is_files_array(schema: &Value, ui_schema: &Value, root_schema: &Value) -> bool {
    if ui_schema.get("ui:widget").and_then(Value::as_str) == Some("files") {
        return true;
    }
    let Some(items) = schema.get("items") else {
        return false;
    };
    let Some(items) = resolve_for_classification(items, root_schema) else {
        return false;
    };
    items.get("type").and_then(Value::as_str) == Some("string")
        && items.get("format").and_then(Value::as_str) == Some("data-url")
}

/// Whether the default field label should be rendered.
///
/// Bare objects and plain arrays render their own titles; a `ui:field`
/// override is assumed to handle labelling itself; booleans only get a
/// label when a non-default widget is explicitly chosen.
pub fn get_display_label(schema: &Value, ui_schema: &Value, root_schema: &Value) -> bool {
    if ui_schema.get("ui:field").is_some() {
        return false;
    }

    let Some(schema) = resolve_for_classification(schema, root_schema) else {
        return false;
    };
    let widget = ui_schema.get("ui:widget").and_then(Value::as_str);

    match schema.get("type").and_then(Value::as_str) {
        Some("array") => {
            is_multiselect(&schema, root_schema)
                || is_files_array(&schema, ui_schema, root_schema)
                || widget.is_some()
        }
        Some("object") => false,
        Some("boolean") => widget.is_some(),
        _ => true,
    }
}

fn resolve_for_classification(schema: &Value, root_schema: &Value) -> Option<Value> {
    if !needs_resolution(schema) {
        return Some(schema.clone());
    }
    match retrieve_schema(schema, root_schema, None) {
        Ok(resolved) => Some(resolved),
        Err(e) => {
            tracing::warn!("schema could not be resolved for classification: {e}");
            None
        }
    }
}
