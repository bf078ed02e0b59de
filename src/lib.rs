//! Form Schema Resolver
//!
//! Runtime resolution of JSON Schemas for schema-driven forms.
//!
//! Given a raw schema (which may contain `$ref`, `allOf`, `if`/`then`/`else`,
//! and `dependencies`) and the current form data, this library produces the
//! single effective schema describing exactly which fields to render, the
//! default form state for those fields, and parallel id/path trees for
//! correlating validation errors and change events back to fields.
//!
//! # Example
//!
//! ```
//! use form_schema::retrieve_schema;
//! use serde_json::json;
//!
//! let schema = json!({
//!     "type": "object",
//!     "properties": {
//!         "country": { "type": "string" }
//!     },
//!     "if": { "properties": { "country": { "const": "USA" } }, "required": ["country"] },
//!     "then": { "properties": { "zip": { "type": "string" } } },
//!     "else": { "properties": { "postal": { "type": "string" } } }
//! });
//!
//! let form_data = json!({ "country": "USA" });
//! let resolved = retrieve_schema(&schema, &schema, Some(&form_data)).unwrap();
//!
//! // The active branch is merged in; the inactive one is gone
//! assert!(resolved["properties"].get("zip").is_some());
//! assert!(resolved["properties"].get("postal").is_none());
//! ```
//!
//! # Determinism
//!
//! Resolution is a pure function of `(schema, root_schema, form_data)`: no
//! I/O, no shared state, freshly allocated output. The effective schema is
//! rebuilt from scratch for every form data snapshot, so a conditional
//! branch whose trigger turns false simply never appears — there is no
//! incremental patching to go stale.
//!
//! # Validator consistency
//!
//! Conditional branches are selected by a pluggable [`Validator`]. The same
//! implementation must back form data validation, or the form will render
//! fields the validator rejects (and vice versa). [`DraftValidator`] is the
//! default for both.

mod defaults;
mod display;
mod error;
mod loader;
mod paths;
mod resolver;
mod types;
mod validator;

pub use defaults::{compute_default_form_state, compute_default_form_state_with};
pub use display::{
    get_display_label, is_constant, is_files_array, is_multiselect, is_select, to_constant,
};
pub use error::{ResolveError, ValidateError, ValidationIssue};
pub use loader::{is_url, load_schema, load_schema_auto, load_schema_str};
pub use paths::{to_id_schema, to_id_schema_with, to_path_schema, to_path_schema_with};
pub use resolver::{
    find_schema_definition, needs_resolution, resolve_reference, retrieve_schema,
    retrieve_schema_with,
};
pub use types::{
    json_type_name, ArrayMinItems, ConstAsDefaults, EmptyObjectFields, IdOptions, StateOptions,
    ADDITIONAL_PROPERTY_FLAG, DEFINITION_KEYS, ID_KEY, NAME_KEY,
};
pub use validator::{validate, validate_form_data, DraftValidator, Validator};

#[cfg(feature = "remote")]
pub use loader::load_schema_url;
