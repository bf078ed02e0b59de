//! Core types for form schema resolution.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Containers searched for `$ref` targets at the schema root.
pub const DEFINITION_KEYS: &[&str] = &["definitions", "$defs"];

/// Key carrying the computed DOM id in an id schema node.
pub const ID_KEY: &str = "$id";

/// Key carrying the dotted logical path in a path schema node.
pub const NAME_KEY: &str = "$name";

/// Sentinel marking a node whose keys are free-form `additionalProperties`
/// entries rather than schema-declared properties.
pub const ADDITIONAL_PROPERTY_FLAG: &str = "__additional_property";

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// How object properties without form data are populated with defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EmptyObjectFields {
    /// Populate defaults for every property.
    #[default]
    PopulateAll,
    /// Populate defaults only for properties listed in `required`.
    PopulateRequired,
    /// Skip default population entirely.
    Skip,
}

/// When arrays are padded up to `minItems` with synthesized defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArrayMinItems {
    /// Pad every array with a `minItems` constraint.
    #[default]
    Always,
    /// Pad only arrays that are themselves required.
    RequiredOnly,
}

/// Whether `const` (and single-value `enum`) is treated as a literal `default`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConstAsDefaults {
    #[default]
    Always,
    Never,
}

/// Options for default form state computation.
///
/// Passed per call, never global. Defaults match the permissive behavior:
/// populate all fields, always pad to `minItems`, treat `const` as a default.
#[derive(Debug, Clone, Copy, Default)]
pub struct StateOptions {
    /// How object properties without form data are populated.
    pub empty_object_fields: EmptyObjectFields,
    /// When arrays are padded up to `minItems`.
    pub array_min_items: ArrayMinItems,
    /// Whether `const`/single-enum values act as defaults.
    pub const_as_defaults: ConstAsDefaults,
}

impl StateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty_object_fields(mut self, value: EmptyObjectFields) -> Self {
        self.empty_object_fields = value;
        self
    }

    pub fn array_min_items(mut self, value: ArrayMinItems) -> Self {
        self.array_min_items = value;
        self
    }

    pub fn const_as_defaults(mut self, value: ConstAsDefaults) -> Self {
        self.const_as_defaults = value;
        self
    }
}

/// Options for id schema construction.
#[derive(Debug, Clone)]
pub struct IdOptions {
    /// Id of the root field. Defaults to `"root"`.
    pub prefix: String,
    /// Separator between id segments. Defaults to `"_"`.
    ///
    /// Path schemas always use `.` regardless of this setting.
    pub separator: String,
}

impl Default for IdOptions {
    fn default() -> Self {
        Self {
            prefix: "root".to_string(),
            separator: "_".to_string(),
        }
    }
}

impl IdOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_type_names() {
        assert_eq!(json_type_name(&json!(null)), "null");
        assert_eq!(json_type_name(&json!(true)), "boolean");
        assert_eq!(json_type_name(&json!(1.5)), "number");
        assert_eq!(json_type_name(&json!("x")), "string");
        assert_eq!(json_type_name(&json!([])), "array");
        assert_eq!(json_type_name(&json!({})), "object");
    }

    #[test]
    fn state_options_builder() {
        let opts = StateOptions::new()
            .empty_object_fields(EmptyObjectFields::PopulateRequired)
            .array_min_items(ArrayMinItems::RequiredOnly)
            .const_as_defaults(ConstAsDefaults::Never);

        assert_eq!(opts.empty_object_fields, EmptyObjectFields::PopulateRequired);
        assert_eq!(opts.array_min_items, ArrayMinItems::RequiredOnly);
        assert_eq!(opts.const_as_defaults, ConstAsDefaults::Never);
    }

    #[test]
    fn state_options_defaults_are_permissive() {
        let opts = StateOptions::default();
        assert_eq!(opts.empty_object_fields, EmptyObjectFields::PopulateAll);
        assert_eq!(opts.array_min_items, ArrayMinItems::Always);
        assert_eq!(opts.const_as_defaults, ConstAsDefaults::Always);
    }

    #[test]
    fn id_options_defaults() {
        let opts = IdOptions::default();
        assert_eq!(opts.prefix, "root");
        assert_eq!(opts.separator, "_");
    }

    #[test]
    fn id_options_builder() {
        let opts = IdOptions::new().prefix("form").separator("-");
        assert_eq!(opts.prefix, "form");
        assert_eq!(opts.separator, "-");
    }
}
