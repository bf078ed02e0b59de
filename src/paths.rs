//! Id and path schema construction.
//!
//! Builds the two addressing trees that mirror a resolved schema: the id
//! schema carries a DOM id per field (`$id`), the path schema a dotted
//! logical path (`$name`). Validation errors and change events are
//! correlated back to fields through these trees, so their structure must
//! match the resolved schema exactly for the current form data, including
//! array indices actually present in the data.

use serde_json::{Map, Value};

use crate::error::ResolveError;
use crate::resolver::{needs_resolution, retrieve_schema_with, MAX_DEPTH};
use crate::types::{IdOptions, ADDITIONAL_PROPERTY_FLAG, ID_KEY, NAME_KEY};
use crate::validator::{DraftValidator, Validator};

/// Build the id schema for a schema and form data snapshot.
///
/// Each node carries `$id`; children are keyed by property name or array
/// index. `id` overrides the root id (defaults to `options.prefix`).
/// Nodes still holding `$ref`/`allOf`/conditionals/dependencies are
/// resolved first, so properties contributed by satisfied dependencies
/// appear beside their trigger's siblings.
///
/// # Errors
///
/// Returns `ResolveError` for broken `$ref` targets or cyclic schemas.
pub fn to_id_schema(
    schema: &Value,
    id: Option<&str>,
    root_schema: &Value,
    form_data: Option<&Value>,
    options: &IdOptions,
) -> Result<Value, ResolveError> {
    to_id_schema_with(&DraftValidator, schema, id, root_schema, form_data, options)
}

/// [`to_id_schema`] with a caller-supplied validator.
pub fn to_id_schema_with(
    validator: &dyn Validator,
    schema: &Value,
    id: Option<&str>,
    root_schema: &Value,
    form_data: Option<&Value>,
    options: &IdOptions,
) -> Result<Value, ResolveError> {
    build_id_schema(
        validator,
        schema,
        id.unwrap_or(&options.prefix),
        root_schema,
        form_data,
        options,
        0,
    )
}

/// Build the path schema for a schema and form data snapshot.
///
/// Each node carries `$name`, the dotted path from the root (`""` at the
/// root itself). Array children use the indices present in the form data.
/// The separator is always `.`, independent of [`IdOptions`].
///
/// # Errors
///
/// Returns `ResolveError` for broken `$ref` targets or cyclic schemas.
pub fn to_path_schema(
    schema: &Value,
    name: &str,
    root_schema: &Value,
    form_data: Option<&Value>,
) -> Result<Value, ResolveError> {
    to_path_schema_with(&DraftValidator, schema, name, root_schema, form_data)
}

/// [`to_path_schema`] with a caller-supplied validator.
pub fn to_path_schema_with(
    validator: &dyn Validator,
    schema: &Value,
    name: &str,
    root_schema: &Value,
    form_data: Option<&Value>,
) -> Result<Value, ResolveError> {
    build_path_schema(validator, schema, name, root_schema, form_data, 0)
}

// --- Internal implementation ---

fn build_id_schema(
    validator: &dyn Validator,
    schema: &Value,
    id: &str,
    root_schema: &Value,
    form_data: Option<&Value>,
    options: &IdOptions,
    depth: usize,
) -> Result<Value, ResolveError> {
    let schema = resolve_node(validator, schema, root_schema, form_data, depth)?;

    let mut node = Map::new();
    node.insert(ID_KEY.to_string(), Value::String(id.to_string()));

    if has_additional_properties(&schema) {
        node.insert(ADDITIONAL_PROPERTY_FLAG.to_string(), Value::Bool(true));
    }

    for (key, child_schema, child_data) in child_fields(&schema, form_data) {
        let child_id = format!("{}{}{}", id, options.separator, key);
        let child = build_id_schema(
            validator,
            child_schema,
            &child_id,
            root_schema,
            child_data,
            options,
            depth + 1,
        )?;
        node.insert(key, child);
    }

    Ok(Value::Object(node))
}

fn build_path_schema(
    validator: &dyn Validator,
    schema: &Value,
    name: &str,
    root_schema: &Value,
    form_data: Option<&Value>,
    depth: usize,
) -> Result<Value, ResolveError> {
    let schema = resolve_node(validator, schema, root_schema, form_data, depth)?;

    let mut node = Map::new();
    node.insert(NAME_KEY.to_string(), Value::String(name.to_string()));

    if has_additional_properties(&schema) {
        node.insert(ADDITIONAL_PROPERTY_FLAG.to_string(), Value::Bool(true));
    }

    for (key, child_schema, child_data) in child_fields(&schema, form_data) {
        let child_name = if name.is_empty() {
            key.clone()
        } else {
            format!("{name}.{key}")
        };
        let child = build_path_schema(
            validator,
            child_schema,
            &child_name,
            root_schema,
            child_data,
            depth + 1,
        )?;
        node.insert(key, child);
    }

    Ok(Value::Object(node))
}

fn resolve_node(
    validator: &dyn Validator,
    schema: &Value,
    root_schema: &Value,
    form_data: Option<&Value>,
    depth: usize,
) -> Result<Value, ResolveError> {
    if depth >= MAX_DEPTH {
        let reference = schema
            .get("$ref")
            .and_then(Value::as_str)
            .unwrap_or("#")
            .to_string();
        return Err(ResolveError::DepthExceeded { reference });
    }
    if needs_resolution(schema) {
        retrieve_schema_with(validator, schema, root_schema, form_data)
    } else {
        Ok(schema.clone())
    }
}

fn has_additional_properties(schema: &Value) -> bool {
    matches!(
        schema.get("additionalProperties"),
        Some(Value::Object(_)) | Some(Value::Bool(true))
    )
}

/// The child fields of a resolved node for the current form data:
/// array indices `0..len`, declared properties, then free-form
/// additional-properties keys present in the data.
fn child_fields<'a>(
    schema: &'a Value,
    form_data: Option<&'a Value>,
) -> Vec<(String, &'a Value, Option<&'a Value>)> {
    // stands in for a missing item/additionalProperties schema; the
    // walkers treat it as an unconstrained leaf
    static EMPTY: Value = Value::Null;
    let mut children = Vec::new();

    if schema.get("type").and_then(Value::as_str) == Some("array") {
        // arrays are walked by the data actually present, not by
        // schema-declared length
        let Some(items) = form_data.and_then(Value::as_array) else {
            return children;
        };
        for (idx, item) in items.iter().enumerate() {
            let item_schema = match schema.get("items") {
                Some(Value::Array(tuple)) => tuple.get(idx).unwrap_or(&EMPTY),
                Some(single) if single.is_object() => single,
                _ => &EMPTY,
            };
            children.push((idx.to_string(), item_schema, Some(item)));
        }
        return children;
    }

    let properties = schema.get("properties").and_then(Value::as_object);
    let data = form_data.and_then(Value::as_object);

    if let Some(properties) = properties {
        for (name, prop_schema) in properties {
            children.push((
                name.clone(),
                prop_schema,
                data.and_then(|d| d.get(name)),
            ));
        }
    }

    if has_additional_properties(schema) {
        let additional_schema = match schema.get("additionalProperties") {
            Some(value) if value.is_object() => value,
            _ => &EMPTY,
        };
        if let Some(data) = data {
            for (key, value) in data {
                if properties.is_some_and(|p| p.contains_key(key)) {
                    continue;
                }
                children.push((key.clone(), additional_schema, Some(value)));
            }
        }
    }

    children
}
