//! Form data validation and the pluggable validity check.
//!
//! The resolver consults a [`Validator`] when evaluating `if`/`then`/`else`
//! and schema dependencies. Resolution and validation must agree on those
//! conditionals, so the same implementation should back both; the default
//! [`DraftValidator`] uses the `jsonschema` crate for each.

use serde_json::{Map, Value};

use crate::error::{ResolveError, ValidateError, ValidationIssue};
use crate::resolver::retrieve_schema;
use crate::types::DEFINITION_KEYS;

/// Structural validity check used by the resolver.
///
/// Implementations must follow standard JSON Schema semantics: `properties`
/// constrains only keys that are present, so empty or absent form data
/// satisfies an `if` schema with no `required` clause. Conditional branch
/// selection depends on that behavior.
pub trait Validator {
    /// Returns true when `form_data` satisfies `schema`.
    ///
    /// `root_schema` supplies the definition containers that `$ref` pointers
    /// inside `schema` may target.
    fn is_valid(&self, schema: &Value, form_data: &Value, root_schema: &Value) -> bool;
}

/// Default [`Validator`] backed by the `jsonschema` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct DraftValidator;

impl Validator for DraftValidator {
    fn is_valid(&self, schema: &Value, form_data: &Value, root_schema: &Value) -> bool {
        let schema = with_root_definitions(schema, root_schema);
        match jsonschema::validator_for(&schema) {
            Ok(compiled) => compiled.is_valid(form_data),
            Err(e) => {
                tracing::warn!("treating unbuildable subschema as not matching: {e}");
                false
            }
        }
    }
}

/// Copy the root's definition containers into a subschema so that `$ref`
/// pointers inside it stay resolvable when compiled standalone.
///
/// The subschema's own containers win on conflict.
pub(crate) fn with_root_definitions(schema: &Value, root_schema: &Value) -> Value {
    let (Some(schema_obj), Some(root_obj)) = (schema.as_object(), root_schema.as_object()) else {
        return schema.clone();
    };

    let mut merged: Map<String, Value> = schema_obj.clone();
    for key in DEFINITION_KEYS {
        if let Some(defs) = root_obj.get(*key) {
            merged.entry((*key).to_string()).or_insert_with(|| defs.clone());
        }
    }
    Value::Object(merged)
}

/// Validate form data against a schema, resolving the schema first.
///
/// Resolves `$ref`/`allOf`/conditionals against the given form data, then
/// validates the data against the effective schema.
///
/// # Errors
///
/// Returns `ValidateError::Resolve` if schema resolution fails, or
/// `ValidateError::Invalid` if the form data doesn't match the schema.
pub fn validate(
    schema: &Value,
    form_data: &Value,
    root_schema: &Value,
) -> Result<(), ValidateError> {
    let resolved = retrieve_schema(schema, root_schema, Some(form_data))?;

    // Nested property schemas may still hold $refs; keep the definition
    // containers alongside so the compiled validator can follow them.
    let resolved = with_root_definitions(&resolved, root_schema);
    validate_form_data(&resolved, form_data)
}

/// Validate form data against an already-resolved schema.
///
/// Use this when you've already resolved the schema and want to validate
/// multiple form data snapshots against it.
pub fn validate_form_data(schema: &Value, form_data: &Value) -> Result<(), ValidateError> {
    let validator = jsonschema::validator_for(schema).map_err(|e| {
        ValidateError::Resolve(ResolveError::InvalidSchema {
            message: e.to_string(),
        })
    })?;

    let errors: Vec<ValidationIssue> = validator
        .iter_errors(form_data)
        .map(|e| ValidationIssue {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidateError::Invalid { errors })
    }
}
