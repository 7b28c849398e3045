// SPDX-License-Identifier: MIT
//! Shallow JSON-Schema validation of tool arguments against the schema a
//! tool declares via [`crate::Tool::parameters_schema`]. Only the subset of
//! schema actually used by this workspace's tools is checked: `required`
//! presence and each declared property's top-level `type`. Nested object
//! and array shapes are left to the tool's own deserialization.

use serde_json::Value;

/// A single schema failure, located by JSON Pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    pub pointer: String,
    pub message: String,
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn matches_declared_type(declared: &str, value: &Value) -> bool {
    match declared {
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        other => type_name(value) == other,
    }
}

/// Validates `args` against `schema`. Returns the first violation found, in
/// `required`-then-`properties` order, matching the order arguments would
/// naturally be checked by hand.
pub fn validate_args(schema: &Value, args: &Value) -> Option<SchemaViolation> {
    let declared_type = schema.get("type").and_then(Value::as_str);
    if declared_type == Some("object") && !args.is_object() {
        return Some(SchemaViolation {
            pointer: String::new(),
            message: "arguments must be a JSON object".to_string(),
        });
    }

    let Some(obj) = args.as_object() else {
        return None;
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for field in required {
            let Some(field) = field.as_str() else { continue };
            if !obj.contains_key(field) {
                return Some(SchemaViolation {
                    pointer: format!("/{field}"),
                    message: format!("missing required argument: {field}"),
                });
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (field, prop_schema) in properties {
            let Some(value) = obj.get(field) else { continue };
            let Some(declared) = prop_schema.get("type").and_then(Value::as_str) else { continue };
            if !matches_declared_type(declared, value) {
                return Some(SchemaViolation {
                    pointer: format!("/{field}"),
                    message: format!("{field}: expected {declared}, got {}", type_name(value)),
                });
            }
        }
    }

    None
}
