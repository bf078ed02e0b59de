//! Integration tests for the schema resolution pipeline.

use form_schema::{resolve_reference, retrieve_schema, ResolveError};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

// === Reference Resolution Tests ===

mod references {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn local_keys_override_referenced_definition() {
        let root = json!({
            "definitions": {
                "addr": {
                    "type": "object",
                    "title": "Default",
                    "properties": { "city": { "type": "string" } }
                }
            }
        });
        let schema = json!({ "$ref": "#/definitions/addr", "title": "Custom" });

        let resolved = retrieve_schema(&schema, &root, None).unwrap();
        assert_eq!(resolved["title"], "Custom");
        assert_eq!(resolved["type"], "object");
        assert!(resolved["properties"].get("city").is_some());
    }

    #[test]
    fn ref_chain_resolves_through_intermediate_definitions() {
        let root = json!({
            "definitions": {
                "alias": { "$ref": "#/definitions/target", "title": "Alias" },
                "target": { "type": "string", "title": "Target", "maxLength": 10 }
            }
        });
        let schema = json!({ "$ref": "#/definitions/alias" });

        let resolved = retrieve_schema(&schema, &root, None).unwrap();
        // each level's local keys win over what it references
        assert_eq!(resolved["title"], "Alias");
        assert_eq!(resolved["type"], "string");
        assert_eq!(resolved["maxLength"], 10);
    }

    #[test]
    fn nonstandard_definition_roots_resolve() {
        let root = json!({
            "components": {
                "schemas": {
                    "Pet": { "type": "object", "properties": { "name": { "type": "string" } } }
                }
            }
        });
        let schema = json!({ "$ref": "#/components/schemas/Pet" });

        let resolved = retrieve_schema(&schema, &root, None).unwrap();
        assert!(resolved["properties"].get("name").is_some());
    }

    #[test]
    fn escaped_pointer_segments_resolve() {
        let root = json!({
            "definitions": {
                "with/slash": { "type": "string" },
                "with~tilde": { "type": "number" }
            }
        });

        let resolved =
            retrieve_schema(&json!({ "$ref": "#/definitions/with~1slash" }), &root, None).unwrap();
        assert_eq!(resolved["type"], "string");

        let resolved =
            retrieve_schema(&json!({ "$ref": "#/definitions/with~0tilde" }), &root, None).unwrap();
        assert_eq!(resolved["type"], "number");
    }

    #[test]
    fn missing_target_error_names_the_ref() {
        let root = json!({ "definitions": {} });
        let schema = json!({ "$ref": "#/definitions/nope" });

        let err = retrieve_schema(&schema, &root, None).unwrap_err();
        assert!(matches!(err, ResolveError::ReferenceNotFound { .. }));
        assert!(err.to_string().contains("#/definitions/nope"));
    }

    #[test]
    fn bad_pointer_escape_is_invalid() {
        let root = json!({ "definitions": {} });
        let schema = json!({ "$ref": "#/definitions/bad~3" });

        let err = retrieve_schema(&schema, &root, None).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidReference { .. }));
    }

    #[test]
    fn cyclic_refs_are_bounded() {
        let root = json!({
            "definitions": {
                "ping": { "$ref": "#/definitions/pong" },
                "pong": { "$ref": "#/definitions/ping" }
            }
        });
        let schema = json!({ "$ref": "#/definitions/ping" });

        let err = retrieve_schema(&schema, &root, None).unwrap_err();
        assert!(matches!(err, ResolveError::DepthExceeded { .. }));
    }

    #[test]
    fn resolve_reference_is_single_level() {
        // resolve_reference merges one level only; the chained ref survives
        // for the caller's merge loop
        let root = json!({
            "definitions": {
                "alias": { "$ref": "#/definitions/target" },
                "target": { "type": "string" }
            }
        });
        let schema = json!({ "$ref": "#/definitions/alias" });

        let resolved = resolve_reference(&schema, &root).unwrap();
        assert_eq!(resolved["$ref"], "#/definitions/target");
    }
}

// === allOf Merge Tests ===

mod all_of {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn properties_merge_and_required_unions() {
        let schema = json!({
            "allOf": [
                {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "level": { "type": "integer", "minimum": 0 }
                    },
                    "required": ["name"]
                },
                {
                    "type": "object",
                    "properties": {
                        "level": { "maximum": 10 },
                        "email": { "type": "string" }
                    },
                    "required": ["name", "email"]
                }
            ]
        });

        let resolved = retrieve_schema(&schema, &schema, None).unwrap();
        assert_eq!(resolved["required"], json!(["name", "email"]));
        // overlapping property schemas deep-merge
        assert_eq!(resolved["properties"]["level"]["minimum"], 0);
        assert_eq!(resolved["properties"]["level"]["maximum"], 10);
        assert_eq!(resolved["properties"]["level"]["type"], "integer");
    }

    #[test]
    fn incompatible_types_drop_type_without_error() {
        let schema = json!({
            "allOf": [{ "type": "string" }, { "type": "boolean" }]
        });

        let resolved = retrieve_schema(&schema, &schema, None).unwrap();
        assert_eq!(resolved, json!({}));
    }

    #[test]
    fn compatible_type_arrays_intersect() {
        let schema = json!({
            "allOf": [
                { "type": ["string", "null"] },
                { "type": ["string", "number"] }
            ]
        });

        let resolved = retrieve_schema(&schema, &schema, None).unwrap();
        assert_eq!(resolved["type"], "string");
    }

    #[test]
    fn parent_keys_participate_in_the_fold() {
        let schema = json!({
            "title": "Parent",
            "allOf": [{ "type": "object", "title": "Member" }]
        });

        let resolved = retrieve_schema(&schema, &schema, None).unwrap();
        // members fold onto the parent, so the member's title lands last
        assert_eq!(resolved["title"], "Member");
        assert_eq!(resolved["type"], "object");
    }

    #[test]
    fn member_refs_resolve_before_merging() {
        let root = json!({
            "definitions": {
                "base": {
                    "type": "object",
                    "properties": { "id": { "type": "string" } },
                    "required": ["id"]
                }
            }
        });
        let schema = json!({
            "allOf": [
                { "$ref": "#/definitions/base" },
                { "properties": { "label": { "type": "string" } } }
            ]
        });

        let resolved = retrieve_schema(&schema, &root, None).unwrap();
        assert!(resolved["properties"].get("id").is_some());
        assert!(resolved["properties"].get("label").is_some());
        assert_eq!(resolved["required"], json!(["id"]));
    }

    #[test]
    fn scalar_constraints_are_last_write_wins() {
        let schema = json!({
            "allOf": [
                { "type": "number", "minimum": 0, "maximum": 100 },
                { "minimum": 10 }
            ]
        });

        let resolved = retrieve_schema(&schema, &schema, None).unwrap();
        assert_eq!(resolved["minimum"], 10);
        assert_eq!(resolved["maximum"], 100);
    }
}

// === Conditional Tests ===

mod conditionals {
    use super::*;
    use pretty_assertions::assert_eq;

    fn country_schema() -> Value {
        json!({
            "type": "object",
            "properties": { "country": { "type": "string" } },
            "if": { "properties": { "country": { "const": "USA" } } },
            "then": { "properties": { "zip": { "type": "string" } } },
            "else": { "properties": { "postal": { "type": "string" } } }
        })
    }

    #[test]
    fn matching_data_selects_then() {
        let schema = country_schema();
        let data = json!({ "country": "USA" });

        let resolved = retrieve_schema(&schema, &schema, Some(&data)).unwrap();
        assert!(resolved["properties"].get("zip").is_some());
        assert!(resolved["properties"].get("postal").is_none());
    }

    #[test]
    fn non_matching_data_selects_else() {
        let schema = country_schema();
        let data = json!({ "country": "France" });

        let resolved = retrieve_schema(&schema, &schema, Some(&data)).unwrap();
        assert!(resolved["properties"].get("zip").is_none());
        assert!(resolved["properties"].get("postal").is_some());
    }

    #[test]
    fn empty_data_matches_vacuously() {
        // the if has no required clause, so empty data satisfies it and
        // the then branch applies
        let schema = country_schema();

        let resolved = retrieve_schema(&schema, &schema, Some(&json!({}))).unwrap();
        assert!(resolved["properties"].get("zip").is_some());
        assert!(resolved["properties"].get("postal").is_none());
    }

    #[test]
    fn conditional_keywords_are_consumed() {
        let schema = country_schema();
        let resolved = retrieve_schema(&schema, &schema, Some(&json!({}))).unwrap();

        assert!(resolved.get("if").is_none());
        assert!(resolved.get("then").is_none());
        assert!(resolved.get("else").is_none());
    }

    #[test]
    fn switching_data_removes_previous_branch() {
        let schema = country_schema();

        let usa = retrieve_schema(&schema, &schema, Some(&json!({ "country": "USA" }))).unwrap();
        assert!(usa["properties"].get("zip").is_some());

        // same schema, new data snapshot: the old branch is gone
        let france =
            retrieve_schema(&schema, &schema, Some(&json!({ "country": "France" }))).unwrap();
        assert!(france["properties"].get("zip").is_none());
        assert!(france["properties"].get("postal").is_some());
    }

    #[test]
    fn all_of_wrapped_conditionals_combine() {
        let schema = json!({
            "type": "object",
            "properties": {
                "pet": { "type": "string" },
                "employed": { "type": "boolean" }
            },
            "allOf": [
                {
                    "if": { "properties": { "pet": { "const": "dog" } }, "required": ["pet"] },
                    "then": { "properties": { "breed": { "type": "string" } } }
                },
                {
                    "if": { "properties": { "employed": { "const": true } }, "required": ["employed"] },
                    "then": { "properties": { "employer": { "type": "string" } } }
                }
            ]
        });

        let data = json!({ "pet": "dog", "employed": true });
        let resolved = retrieve_schema(&schema, &schema, Some(&data)).unwrap();
        assert!(resolved["properties"].get("breed").is_some());
        assert!(resolved["properties"].get("employer").is_some());

        let data = json!({ "pet": "dog" });
        let resolved = retrieve_schema(&schema, &schema, Some(&data)).unwrap();
        assert!(resolved["properties"].get("breed").is_some());
        assert!(resolved["properties"].get("employer").is_none());
    }

    #[test]
    fn then_branch_ref_resolves() {
        let root = json!({
            "definitions": {
                "us_address": {
                    "properties": {
                        "zip": { "type": "string", "pattern": "^[0-9]{5}$" }
                    },
                    "required": ["zip"]
                }
            }
        });
        let schema = json!({
            "type": "object",
            "if": { "properties": { "country": { "const": "USA" } }, "required": ["country"] },
            "then": { "$ref": "#/definitions/us_address" }
        });
        let data = json!({ "country": "USA" });

        let resolved = retrieve_schema(&schema, &root, Some(&data)).unwrap();
        assert_eq!(resolved["properties"]["zip"]["pattern"], "^[0-9]{5}$");
        assert_eq!(resolved["required"], json!(["zip"]));
    }
}

// === Dependency Tests ===

mod dependencies {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn property_dependency_adds_required() {
        let schema = json!({
            "type": "object",
            "properties": {
                "credit_card": { "type": "number" },
                "billing_address": { "type": "string" }
            },
            "dependencies": {
                "credit_card": ["billing_address"]
            }
        });

        let resolved =
            retrieve_schema(&schema, &schema, Some(&json!({ "credit_card": 1 }))).unwrap();
        assert_eq!(resolved["required"], json!(["billing_address"]));

        let resolved = retrieve_schema(&schema, &schema, Some(&json!({}))).unwrap();
        assert!(resolved.get("required").is_none());
    }

    #[test]
    fn dynamic_dependency_first_match_wins() {
        let schema = json!({
            "type": "object",
            "properties": { "a": { "type": "string", "enum": ["int", "bool"] } },
            "dependencies": {
                "a": {
                    "oneOf": [
                        {
                            "properties": {
                                "a": { "enum": ["int"] },
                                "b": { "type": "integer" }
                            }
                        },
                        {
                            "properties": {
                                "a": { "enum": ["bool"] },
                                "b": { "type": "boolean" }
                            }
                        }
                    ]
                }
            }
        });

        let resolved = retrieve_schema(&schema, &schema, Some(&json!({ "a": "bool" }))).unwrap();
        assert_eq!(resolved["properties"]["b"]["type"], "boolean");

        let resolved = retrieve_schema(&schema, &schema, Some(&json!({ "a": "int" }))).unwrap();
        assert_eq!(resolved["properties"]["b"]["type"], "integer");
    }

    #[test]
    fn dependency_chain_cascades() {
        // merging one dependency can trigger the next
        let schema = json!({
            "type": "object",
            "properties": { "a": { "type": "string" } },
            "dependencies": {
                "a": {
                    "properties": { "b": { "type": "string" } },
                    "dependencies": {
                        "b": { "properties": { "c": { "type": "string" } } }
                    }
                }
            }
        });
        let data = json!({ "a": "x", "b": "y" });

        let resolved = retrieve_schema(&schema, &schema, Some(&data)).unwrap();
        assert!(resolved["properties"].get("b").is_some());
        assert!(resolved["properties"].get("c").is_some());
    }

    #[test]
    fn schema_dependency_via_ref() {
        let root = json!({
            "definitions": {
                "billing": {
                    "properties": { "billing_address": { "type": "string" } },
                    "required": ["billing_address"]
                }
            }
        });
        let schema = json!({
            "type": "object",
            "properties": { "credit_card": { "type": "number" } },
            "dependencies": {
                "credit_card": { "$ref": "#/definitions/billing" }
            }
        });

        let resolved =
            retrieve_schema(&schema, &root, Some(&json!({ "credit_card": 1 }))).unwrap();
        assert!(resolved["properties"].get("billing_address").is_some());
        assert_eq!(resolved["required"], json!(["billing_address"]));
    }

    #[test]
    fn clearing_trigger_removes_contribution() {
        let schema = json!({
            "type": "object",
            "properties": { "credit_card": { "type": "number" } },
            "dependencies": {
                "credit_card": {
                    "properties": { "billing_address": { "type": "string" } }
                }
            }
        });

        let on = retrieve_schema(&schema, &schema, Some(&json!({ "credit_card": 1 }))).unwrap();
        assert!(on["properties"].get("billing_address").is_some());

        let off = retrieve_schema(&schema, &schema, Some(&json!({ "name": "x" }))).unwrap();
        assert!(off["properties"].get("billing_address").is_none());
    }
}

// === Pipeline Property Tests ===

mod pipeline {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn resolution_is_idempotent() {
        let root = json!({
            "definitions": {
                "addr": { "type": "object", "properties": { "city": { "type": "string" } } }
            }
        });
        let schema = json!({
            "allOf": [
                { "$ref": "#/definitions/addr" },
                { "required": ["city"] }
            ],
            "if": { "properties": { "city": { "const": "Springfield" } } },
            "then": { "properties": { "state": { "type": "string" } } }
        });
        let data = json!({ "city": "Springfield" });

        let once = retrieve_schema(&schema, &root, Some(&data)).unwrap();
        let twice = retrieve_schema(&once, &root, Some(&data)).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn input_schema_is_not_mutated() {
        let schema = json!({
            "type": "object",
            "properties": { "a": { "type": "string" } },
            "dependencies": { "a": ["b"] },
            "if": { "properties": { "a": { "const": "x" } } },
            "then": { "properties": { "c": { "type": "string" } } }
        });
        let before = schema.clone();
        let data = json!({ "a": "x" });

        let _ = retrieve_schema(&schema, &schema, Some(&data)).unwrap();
        assert_eq!(schema, before);
    }

    #[test]
    fn deeply_combined_keywords_resolve_together() {
        // a ref into an allOf whose member has a conditional that pulls in
        // a dependency-bearing branch
        let root = json!({
            "definitions": {
                "form": {
                    "allOf": [
                        {
                            "type": "object",
                            "properties": { "kind": { "type": "string" } }
                        },
                        {
                            "if": { "properties": { "kind": { "const": "card" } }, "required": ["kind"] },
                            "then": {
                                "properties": { "card_number": { "type": "string" } },
                                "dependencies": {
                                    "card_number": ["expiry"]
                                }
                            }
                        }
                    ]
                }
            }
        });
        let schema = json!({ "$ref": "#/definitions/form" });
        let data = json!({ "kind": "card", "card_number": "4111" });

        let resolved = retrieve_schema(&schema, &root, Some(&data)).unwrap();
        assert!(resolved["properties"].get("card_number").is_some());
        assert_eq!(resolved["required"], json!(["expiry"]));
    }
}
