//! Default form state computation.
//!
//! Walks a resolved schema and produces the default value for every field,
//! honoring `default`, `const`, single-value `enum`, and the
//! [`StateOptions`] policies for how deeply nested object/array defaults
//! are populated. Actual form data always wins over computed defaults.

use serde_json::{Map, Value};

use crate::error::ResolveError;
use crate::resolver::{needs_resolution, retrieve_schema_with};
use crate::types::{json_type_name, ArrayMinItems, ConstAsDefaults, EmptyObjectFields, StateOptions};
use crate::validator::{DraftValidator, Validator};

/// Compute the default form state for a schema and form data snapshot.
///
/// Pure defaults are computed from the resolved schema, then the given
/// form data is overlaid on top: present values win, `null` values take
/// the default (a key holding `null` is a newly added, not-yet-edited
/// field). Returns `None` when the schema yields no value at all.
///
/// Malformed form data (e.g. a primitive where an `additionalProperties`
/// object was expected) degrades with a warning; it never errors.
///
/// # Errors
///
/// Returns `ResolveError` only for broken schemas (missing `$ref` targets,
/// cyclic references).
pub fn compute_default_form_state(
    schema: &Value,
    form_data: Option<&Value>,
    root_schema: &Value,
    options: &StateOptions,
) -> Result<Option<Value>, ResolveError> {
    compute_default_form_state_with(&DraftValidator, schema, form_data, root_schema, options)
}

/// [`compute_default_form_state`] with a caller-supplied validator for
/// conditional branch selection during resolution.
pub fn compute_default_form_state_with(
    validator: &dyn Validator,
    schema: &Value,
    form_data: Option<&Value>,
    root_schema: &Value,
    options: &StateOptions,
) -> Result<Option<Value>, ResolveError> {
    let defaults = compute_defaults(
        validator,
        schema,
        None,
        root_schema,
        form_data,
        false,
        options,
        &[],
    )?;
    Ok(merge_defaults_with_form_data(defaults, form_data))
}

// --- Internal implementation ---

#[allow(clippy::too_many_arguments)]
fn compute_defaults(
    validator: &dyn Validator,
    raw_schema: &Value,
    parent_default: Option<&Value>,
    root_schema: &Value,
    form_data: Option<&Value>,
    required: bool,
    options: &StateOptions,
    ref_stack: &[String],
) -> Result<Option<Value>, ResolveError> {
    if !raw_schema.is_object() {
        return Ok(None);
    }

    // Track the $ref chain so recursive schemas terminate: once a ref
    // repeats, that subtree gets no default.
    let mut stack_storage;
    let mut stack: &[String] = ref_stack;
    let schema = if let Some(reference) = raw_schema.get("$ref").and_then(Value::as_str) {
        if ref_stack.iter().any(|seen| seen == reference) {
            return Ok(None);
        }
        stack_storage = ref_stack.to_vec();
        stack_storage.push(reference.to_string());
        stack = &stack_storage;
        retrieve_schema_with(validator, raw_schema, root_schema, form_data)?
    } else if needs_resolution(raw_schema) {
        retrieve_schema_with(validator, raw_schema, root_schema, form_data)?
    } else {
        raw_schema.clone()
    };

    // Defaults precedence: the schema's own default wins over the parent's,
    // merging when both are objects.
    let mut defaults: Option<Value> = match (parent_default, schema.get("default")) {
        (Some(parent), Some(own)) if parent.is_object() && own.is_object() => {
            Some(merge_data(parent, own))
        }
        (_, Some(own)) => Some(own.clone()),
        (Some(parent), None) => Some(parent.clone()),
        (None, None) => None,
    };

    if defaults.is_none() && options.const_as_defaults == ConstAsDefaults::Always {
        if let Some(constant) = schema.get("const") {
            defaults = Some(constant.clone());
        } else if let Some(values) = schema.get("enum").and_then(Value::as_array) {
            if values.len() == 1 {
                defaults = Some(values[0].clone());
            }
        }
    }

    if is_object_schema(&schema) {
        return compute_object_defaults(
            validator,
            &schema,
            defaults.as_ref(),
            root_schema,
            form_data,
            options,
            stack,
        )
        .map(Some);
    }

    if schema.get("type").and_then(Value::as_str) == Some("array") {
        return compute_array_defaults(
            validator,
            &schema,
            defaults.as_ref(),
            root_schema,
            form_data,
            required,
            options,
            stack,
        );
    }

    Ok(defaults)
}

fn is_object_schema(schema: &Value) -> bool {
    schema.get("type").and_then(Value::as_str) == Some("object")
        || schema.get("properties").is_some_and(Value::is_object)
}

fn compute_object_defaults(
    validator: &dyn Validator,
    schema: &Value,
    defaults: Option<&Value>,
    root_schema: &Value,
    form_data: Option<&Value>,
    options: &StateOptions,
    ref_stack: &[String],
) -> Result<Value, ResolveError> {
    let base = defaults.and_then(Value::as_object);
    let data = form_data.and_then(Value::as_object);
    let required_names: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let mut out = Map::new();
    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (name, prop_schema) in properties {
            if options.empty_object_fields == EmptyObjectFields::Skip {
                continue;
            }
            let child_required = required_names.contains(&name.as_str());
            if options.empty_object_fields == EmptyObjectFields::PopulateRequired
                && !child_required
            {
                continue;
            }
            let computed = compute_defaults(
                validator,
                prop_schema,
                base.and_then(|b| b.get(name)),
                root_schema,
                data.and_then(|d| d.get(name)),
                child_required,
                options,
                ref_stack,
            )?;
            if let Some(value) = computed {
                out.insert(name.clone(), value);
            }
        }
    }

    // Free-form keys present in the form data pick up the
    // additionalProperties schema's own default
    let additional = schema.get("additionalProperties");
    if let Some(additional) = additional {
        if additional.is_object() || additional == &Value::Bool(true) {
            if let Some(data) = data {
                let declared = schema.get("properties").and_then(Value::as_object);
                let empty = Value::Object(Map::new());
                let additional_schema = if additional.is_object() {
                    additional
                } else {
                    &empty
                };
                for (key, value) in data {
                    if declared.is_some_and(|p| p.contains_key(key)) {
                        continue;
                    }
                    let computed = compute_defaults(
                        validator,
                        additional_schema,
                        base.and_then(|b| b.get(key)),
                        root_schema,
                        Some(value),
                        false,
                        options,
                        ref_stack,
                    )?;
                    if let Some(value) = computed {
                        out.insert(key.clone(), value);
                    }
                }
            } else if let Some(data) = form_data {
                if !data.is_null() {
                    tracing::warn!(
                        "expected object form data for additionalProperties schema, got {}; treating as empty",
                        json_type_name(data)
                    );
                }
            }
        }
    }

    // Explicit defaults not covered by a declared property survive
    if let Some(base) = base {
        for (key, value) in base {
            out.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }

    Ok(Value::Object(out))
}

#[allow(clippy::too_many_arguments)]
fn compute_array_defaults(
    validator: &dyn Validator,
    schema: &Value,
    defaults: Option<&Value>,
    root_schema: &Value,
    form_data: Option<&Value>,
    required: bool,
    options: &StateOptions,
    ref_stack: &[String],
) -> Result<Option<Value>, ResolveError> {
    let base: &[Value] = defaults.and_then(Value::as_array).map_or(&[], |a| a);
    let data_items = form_data.and_then(Value::as_array);
    let empty = Value::Object(Map::new());

    let item_schema = |idx: usize| -> &Value {
        match schema.get("items") {
            // fixed-items tuple: one schema per index
            Some(Value::Array(tuple)) => tuple.get(idx).unwrap_or(&empty),
            Some(single) if single.is_object() => single,
            _ => &empty,
        }
    };

    let mut out: Vec<Value> = Vec::new();
    match data_items {
        Some(items) => {
            for (idx, item) in items.iter().enumerate() {
                let computed = compute_defaults(
                    validator,
                    item_schema(idx),
                    base.get(idx),
                    root_schema,
                    Some(item),
                    false,
                    options,
                    ref_stack,
                )?;
                out.push(computed.unwrap_or(Value::Null));
            }
        }
        None => out.extend(base.iter().cloned()),
    }

    let min_items = schema
        .get("minItems")
        .and_then(Value::as_u64)
        .unwrap_or(0) as usize;
    let populate = match options.array_min_items {
        ArrayMinItems::Always => true,
        ArrayMinItems::RequiredOnly => required,
    };
    if populate {
        while out.len() < min_items {
            let computed = compute_defaults(
                validator,
                item_schema(out.len()),
                None,
                root_schema,
                None,
                false,
                options,
                ref_stack,
            )?;
            out.push(computed.unwrap_or(Value::Null));
        }
    }

    if out.is_empty() && data_items.is_none() && defaults.is_none() {
        return Ok(None);
    }
    Ok(Some(Value::Array(out)))
}

/// Overlay actual form data on computed defaults.
///
/// Objects merge per key, arrays per index (extra computed defaults beyond
/// the form data length are appended so `minItems` padding survives), and
/// scalars take the form data value. A `null` takes the default when one
/// exists: a key holding `null` is a newly added field awaiting a value.
fn merge_defaults_with_form_data(
    defaults: Option<Value>,
    form_data: Option<&Value>,
) -> Option<Value> {
    let Some(data) = form_data else {
        return defaults;
    };
    let Some(defaults) = defaults else {
        return Some(data.clone());
    };

    match (defaults, data) {
        (Value::Object(defaults), Value::Object(data)) => {
            let mut out = defaults;
            for (key, data_value) in data {
                let default_value = out.get(key).cloned();
                if let Some(value) = merge_defaults_with_form_data(default_value, Some(data_value))
                {
                    out.insert(key.clone(), value);
                }
            }
            Some(Value::Object(out))
        }
        (Value::Array(defaults), Value::Array(data)) => {
            let mut out: Vec<Value> = data
                .iter()
                .enumerate()
                .map(|(idx, item)| {
                    merge_defaults_with_form_data(defaults.get(idx).cloned(), Some(item))
                        .unwrap_or(Value::Null)
                })
                .collect();
            if defaults.len() > data.len() {
                out.extend(defaults[data.len()..].iter().cloned());
            }
            Some(Value::Array(out))
        }
        (defaults, Value::Null) => Some(defaults),
        _ => Some(data.clone()),
    }
}

/// Plain data merge: objects recurse, everything else the right side wins.
fn merge_data(left: &Value, right: &Value) -> Value {
    let (Some(left_obj), Some(right_obj)) = (left.as_object(), right.as_object()) else {
        return right.clone();
    };
    let mut out = left_obj.clone();
    for (key, right_value) in right_obj {
        let merged = match out.get(key) {
            Some(left_value) => merge_data(left_value, right_value),
            None => right_value.clone(),
        };
        out.insert(key.clone(), merged);
    }
    Value::Object(out)
}
