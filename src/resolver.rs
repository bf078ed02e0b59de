//! Schema resolution - collapses `$ref`, `allOf`, conditionals, and
//! dependencies into a single effective schema for the current form data.
//!
//! Resolution is a recursive descent with one entry point,
//! [`retrieve_schema`]. Each keyword handler merges its contribution and
//! re-enters the descent, so keywords surfaced by a merge (a `then` branch
//! introducing a `$ref`, a dependency introducing an `allOf`) are picked up
//! on the next pass. A fixed recursion budget bounds cyclic `$ref` chains.
//!
//! Only the node passed in is resolved. Nested `properties`/`items` schemas
//! keep their own `$ref`s and conditionals until a caller asks for them,
//! so local-overrides-over-referenced semantics apply at each level
//! independently.

use serde_json::{json, Value};

use crate::error::ResolveError;
use crate::validator::{DraftValidator, Validator};

/// Recursion budget for one resolution pass. The schemas this crate is fed
/// are authored by hand and shallow; anything deeper is a `$ref` cycle.
pub(crate) const MAX_DEPTH: usize = 64;

/// Resolve a schema node against the current form data.
///
/// Collapses `$ref`, `allOf`, satisfied `dependencies`, and the active
/// `if`/`then`/`else` branch into one schema. Conditional branch selection
/// uses the default [`DraftValidator`]; use [`retrieve_schema_with`] to
/// supply the validator the surrounding system validates with.
///
/// `form_data` is the current value of the field this schema describes;
/// `None` means the field has no value yet.
///
/// # Errors
///
/// Returns `ResolveError::ReferenceNotFound` when a `$ref` target does not
/// exist in `root_schema`, `ResolveError::InvalidReference` for malformed
/// pointers, and `ResolveError::DepthExceeded` on cyclic `$ref` chains.
pub fn retrieve_schema(
    schema: &Value,
    root_schema: &Value,
    form_data: Option<&Value>,
) -> Result<Value, ResolveError> {
    retrieve_schema_with(&DraftValidator, schema, root_schema, form_data)
}

/// Resolve a schema node using a caller-supplied validator.
///
/// The validator decides which conditional branches apply; it must be the
/// same implementation the surrounding system validates form data with,
/// or the form will render fields the validator rejects.
pub fn retrieve_schema_with(
    validator: &dyn Validator,
    schema: &Value,
    root_schema: &Value,
    form_data: Option<&Value>,
) -> Result<Value, ResolveError> {
    resolve_schema(validator, schema, root_schema, form_data, 0)
}

/// Whether a node still carries keywords [`retrieve_schema`] would collapse.
pub fn needs_resolution(schema: &Value) -> bool {
    schema.as_object().is_some_and(|obj| {
        obj.contains_key("$ref")
            || obj.contains_key("dependencies")
            || obj.contains_key("allOf")
            || obj.contains_key("if")
    })
}

/// Look up a `$ref` pointer in the root schema.
///
/// Walks `#/a/b/c` segments key-by-key (array indices allowed), unescaping
/// JSON Pointer encoding (`~1` = `/`, `~0` = `~`) before each lookup.
/// Non-standard roots such as `#/components/schemas/...` resolve like any
/// other path.
///
/// # Errors
///
/// Returns `ResolveError::InvalidReference` for refs that are not
/// `#`-rooted or contain a bad `~` escape, and
/// `ResolveError::ReferenceNotFound` when a segment is missing.
pub fn find_schema_definition(
    reference: &str,
    root_schema: &Value,
) -> Result<Value, ResolveError> {
    let Some(fragment) = reference.strip_prefix('#') else {
        return Err(ResolveError::InvalidReference {
            reference: reference.to_string(),
        });
    };

    let path = fragment.trim_start_matches('/');
    let mut current = root_schema;
    if !path.is_empty() {
        for segment in path.split('/') {
            let key =
                unescape_segment(segment).ok_or_else(|| ResolveError::InvalidReference {
                    reference: reference.to_string(),
                })?;
            let next = match current {
                Value::Object(map) => map.get(&key),
                Value::Array(arr) => key.parse::<usize>().ok().and_then(|i| arr.get(i)),
                _ => None,
            };
            current = next.ok_or_else(|| ResolveError::ReferenceNotFound {
                reference: reference.to_string(),
            })?;
        }
    }
    Ok(current.clone())
}

/// Resolve a schema's `$ref` and merge its remaining local keys over the
/// referenced definition.
///
/// Local keys win, including `type`. A schema without `$ref` is returned
/// unchanged. The result may itself contain `$ref` (chained references);
/// recursion is the caller's responsibility so that local overrides apply
/// at each level independently.
pub fn resolve_reference(schema: &Value, root_schema: &Value) -> Result<Value, ResolveError> {
    let Some(reference) = schema.get("$ref").and_then(Value::as_str) else {
        return Ok(schema.clone());
    };

    let mut target = find_schema_definition(reference, root_schema)?;
    if let (Some(out), Some(local)) = (target.as_object_mut(), schema.as_object()) {
        for (key, value) in local {
            if key != "$ref" {
                out.insert(key.clone(), value.clone());
            }
        }
    }
    Ok(target)
}

// --- Internal implementation ---

fn resolve_schema(
    validator: &dyn Validator,
    schema: &Value,
    root_schema: &Value,
    form_data: Option<&Value>,
    depth: usize,
) -> Result<Value, ResolveError> {
    let Some(obj) = schema.as_object() else {
        // Boolean schemas pass through
        return Ok(schema.clone());
    };

    if depth >= MAX_DEPTH {
        let reference = obj
            .get("$ref")
            .and_then(Value::as_str)
            .unwrap_or("#")
            .to_string();
        return Err(ResolveError::DepthExceeded { reference });
    }

    if obj.get("$ref").is_some_and(Value::is_string) {
        let merged = resolve_reference(schema, root_schema)?;
        return resolve_schema(validator, &merged, root_schema, form_data, depth + 1);
    }

    if obj.get("dependencies").is_some_and(Value::is_object) {
        return resolve_dependencies(validator, schema, root_schema, form_data, depth);
    }

    if obj.contains_key("allOf") {
        return merge_all_of(validator, schema, root_schema, form_data, depth);
    }

    if obj.contains_key("if") {
        return resolve_condition(validator, schema, root_schema, form_data, depth);
    }

    Ok(schema.clone())
}

/// Evaluate `if`/`then`/`else` and merge the active branch.
fn resolve_condition(
    validator: &dyn Validator,
    schema: &Value,
    root_schema: &Value,
    form_data: Option<&Value>,
    depth: usize,
) -> Result<Value, ResolveError> {
    let obj = match schema.as_object() {
        Some(obj) => obj,
        None => return Ok(schema.clone()),
    };

    let matches = match obj.get("if") {
        Some(condition) => validator.is_valid(
            condition,
            form_data.unwrap_or(&Value::Null),
            root_schema,
        ),
        None => return Ok(schema.clone()),
    };

    let branch = if matches {
        obj.get("then")
    } else {
        obj.get("else")
    };

    let mut base = obj.clone();
    base.remove("if");
    base.remove("then");
    base.remove("else");
    let base = Value::Object(base);

    match branch {
        Some(branch) if branch.is_object() => {
            let resolved = resolve_schema(validator, branch, root_schema, form_data, depth + 1)?;
            let merged = merge_schemas(&base, &resolved);
            // the branch may have contributed allOf, dependencies, or a
            // nested conditional of its own
            resolve_schema(validator, &merged, root_schema, form_data, depth + 1)
        }
        _ => Ok(base),
    }
}

/// Apply `dependencies` entries triggered by the current form data.
///
/// Entries whose trigger key is absent from the form data are left in
/// place for the downstream validator. Triggered entries are consumed one
/// at a time: merging a dependency schema can introduce further
/// dependencies, which the recursion then picks up.
fn resolve_dependencies(
    validator: &dyn Validator,
    schema: &Value,
    root_schema: &Value,
    form_data: Option<&Value>,
    depth: usize,
) -> Result<Value, ResolveError> {
    if depth >= MAX_DEPTH {
        return Err(ResolveError::DepthExceeded {
            reference: "#".to_string(),
        });
    }

    let dependencies = schema
        .get("dependencies")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let data = form_data.and_then(Value::as_object);

    let triggered = dependencies
        .iter()
        .find(|(key, _)| data.is_some_and(|d| d.contains_key(key.as_str())));
    let Some((key, dependency)) = triggered else {
        // nothing (further) triggered; continue with the remaining keywords
        return resolve_after_dependencies(validator, schema, root_schema, form_data, depth);
    };

    let mut remaining = schema.clone();
    if let Some(deps) = remaining
        .as_object_mut()
        .and_then(|o| o.get_mut("dependencies"))
        .and_then(Value::as_object_mut)
    {
        deps.remove(key);
    }

    let applied = match dependency {
        // property dependency: the listed names become required
        Value::Array(names) => with_required(remaining, names),
        Value::Object(_) => with_dependent_schema(
            validator,
            &remaining,
            root_schema,
            form_data,
            key,
            dependency,
            depth,
        )?,
        other => {
            tracing::warn!(
                "ignoring dependency for {key}: expected array or schema, got {}",
                crate::types::json_type_name(other)
            );
            remaining
        }
    };

    resolve_dependencies(validator, &applied, root_schema, form_data, depth + 1)
}

fn resolve_after_dependencies(
    validator: &dyn Validator,
    schema: &Value,
    root_schema: &Value,
    form_data: Option<&Value>,
    depth: usize,
) -> Result<Value, ResolveError> {
    let Some(obj) = schema.as_object() else {
        return Ok(schema.clone());
    };

    if obj.contains_key("allOf") {
        return merge_all_of(validator, schema, root_schema, form_data, depth);
    }
    if obj.contains_key("if") {
        return resolve_condition(validator, schema, root_schema, form_data, depth);
    }
    Ok(schema.clone())
}

/// Merge a schema dependency into the schema.
///
/// `oneOf` dependencies are dynamic: the first branch whose constraint on
/// the trigger property validates against the form data is merged, with
/// the trigger property itself removed from the branch. First-match-wins
/// is deliberate; branches act as mutually exclusive selectors.
fn with_dependent_schema(
    validator: &dyn Validator,
    schema: &Value,
    root_schema: &Value,
    form_data: Option<&Value>,
    key: &str,
    dependency: &Value,
    depth: usize,
) -> Result<Value, ResolveError> {
    // a $ref dependency resolves before inspection
    let dependency = resolve_reference(dependency, root_schema)?;

    let Some(branches) = dependency.get("oneOf") else {
        let resolved = resolve_schema(validator, &dependency, root_schema, form_data, depth + 1)?;
        return Ok(merge_schemas(schema, &resolved));
    };
    let Some(branches) = branches.as_array() else {
        return Ok(schema.clone());
    };

    for branch in branches {
        let Some(constraint) = branch.get("properties").and_then(|p| p.get(key)) else {
            continue;
        };
        let selector = json!({
            "type": "object",
            "properties": { key: constraint }
        });
        if validator.is_valid(&selector, form_data.unwrap_or(&Value::Null), root_schema) {
            let mut dependent = branch.clone();
            if let Some(props) = dependent
                .as_object_mut()
                .and_then(|o| o.get_mut("properties"))
                .and_then(Value::as_object_mut)
            {
                props.remove(key);
            }
            let resolved =
                resolve_schema(validator, &dependent, root_schema, form_data, depth + 1)?;
            return Ok(merge_schemas(schema, &resolved));
        }
    }

    tracing::warn!("ignoring oneOf in dependencies of {key}: no subschema matches the form data");
    Ok(schema.clone())
}

/// Fold `allOf` members into the parent schema.
///
/// Each member is resolved first (its own `$ref`s, nested `allOf`, and
/// conditionals collapse depth-first), so independent conditional members
/// combine additively. Folding intersects `type`, deep-merges
/// `properties`, unions `required`, and takes last-write-wins for
/// everything else. An empty `type` intersection drops `type` from the
/// result and logs a warning; the schema is still returned.
fn merge_all_of(
    validator: &dyn Validator,
    schema: &Value,
    root_schema: &Value,
    form_data: Option<&Value>,
    depth: usize,
) -> Result<Value, ResolveError> {
    let Some(members) = schema.get("allOf").and_then(Value::as_array) else {
        return Ok(schema.clone());
    };

    let mut acc = schema.clone();
    if let Some(obj) = acc.as_object_mut() {
        obj.remove("allOf");
    }

    let mut type_conflict = false;
    for member in members {
        let resolved = resolve_schema(validator, member, root_schema, form_data, depth + 1)?;
        acc = fold_all_of_member(&acc, &resolved, &mut type_conflict);
    }

    // members may have contributed dependencies or a conditional
    resolve_schema(validator, &acc, root_schema, form_data, depth + 1)
}

fn fold_all_of_member(acc: &Value, member: &Value, type_conflict: &mut bool) -> Value {
    let (Some(acc_obj), Some(member_obj)) = (acc.as_object(), member.as_object()) else {
        return acc.clone();
    };

    let mut out = acc_obj.clone();
    for (key, value) in member_obj {
        match key.as_str() {
            "type" => {
                if *type_conflict {
                    continue;
                }
                match out.get("type").cloned() {
                    None => {
                        out.insert(key.clone(), value.clone());
                    }
                    Some(existing) => {
                        let intersection = intersect_types(&existing, value);
                        if intersection.is_empty() {
                            tracing::warn!(
                                "could not merge subschemas in allOf, type values could not be combined: {existing} and {value}"
                            );
                            out.remove("type");
                            *type_conflict = true;
                        } else if intersection.len() == 1 {
                            out.insert(key.clone(), Value::String(intersection[0].clone()));
                        } else {
                            out.insert(
                                key.clone(),
                                Value::Array(
                                    intersection.into_iter().map(Value::String).collect(),
                                ),
                            );
                        }
                    }
                }
            }
            "properties" => {
                let mut merged = out
                    .get("properties")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                if let Some(props) = value.as_object() {
                    for (name, prop) in props {
                        let combined = match merged.get(name) {
                            Some(existing) if existing.is_object() && prop.is_object() => {
                                merge_schemas(existing, prop)
                            }
                            _ => prop.clone(),
                        };
                        merged.insert(name.clone(), combined);
                    }
                }
                out.insert(key.clone(), Value::Object(merged));
            }
            "required" => {
                let existing = out
                    .get("required")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                out.insert(key.clone(), union_required(&existing, value));
            }
            _ => {
                out.insert(key.clone(), value.clone());
            }
        }
    }
    Value::Object(out)
}

/// Structural merge of two schema nodes: objects merge recursively,
/// `required` arrays union, anything else the right side wins.
pub(crate) fn merge_schemas(left: &Value, right: &Value) -> Value {
    let (Some(left_obj), Some(right_obj)) = (left.as_object(), right.as_object()) else {
        return right.clone();
    };

    let mut out = left_obj.clone();
    for (key, right_value) in right_obj {
        let merged = match out.get(key) {
            Some(left_value) if left_value.is_object() && right_value.is_object() => {
                merge_schemas(left_value, right_value)
            }
            Some(Value::Array(left_arr)) if key == "required" && right_value.is_array() => {
                union_required(left_arr, right_value)
            }
            _ => right_value.clone(),
        };
        out.insert(key.clone(), merged);
    }
    Value::Object(out)
}

fn with_required(mut schema: Value, names: &[Value]) -> Value {
    if let Some(obj) = schema.as_object_mut() {
        let existing = obj
            .get("required")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        obj.insert(
            "required".to_string(),
            union_required(&existing, &Value::Array(names.to_vec())),
        );
    }
    schema
}

fn union_required(existing: &[Value], incoming: &Value) -> Value {
    let mut out = existing.to_vec();
    if let Some(names) = incoming.as_array() {
        for name in names {
            if !out.contains(name) {
                out.push(name.clone());
            }
        }
    }
    Value::Array(out)
}

fn intersect_types(left: &Value, right: &Value) -> Vec<String> {
    let left = type_values(left);
    let right = type_values(right);
    left.into_iter().filter(|t| right.contains(t)).collect()
}

/// `type` values as a list, handling scalar and array forms.
fn type_values(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(arr) => arr
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect(),
        _ => vec![],
    }
}

/// Unescape one JSON Pointer segment. Returns `None` on a dangling or
/// unknown `~` escape.
fn unescape_segment(segment: &str) -> Option<String> {
    if !segment.contains('~') {
        return Some(segment.to_string());
    }
    let mut out = String::with_capacity(segment.len());
    let mut chars = segment.chars();
    while let Some(c) = chars.next() {
        if c != '~' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('~'),
            Some('1') => out.push('/'),
            _ => return None,
        }
    }
    Some(out)
}
