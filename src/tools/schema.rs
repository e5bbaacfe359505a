//! Argument validation against tool parameter schemas.
//!
//! Tools describe their parameters with the object subset of JSON Schema
//! (`type: "object"`, `properties`, `required`, per-property `type` and
//! `enum`). Validation runs before any network call, so a bad argument set
//! never costs an upstream request.

use serde_json::Value;

use crate::tools::tool::ToolError;

/// Validate `arguments` against a tool's parameter schema.
///
/// Checks, in order: arguments form a JSON object, every `required`
/// property is present, and every provided property that the schema
/// declares matches its declared `type` and (if any) `enum`. Undeclared
/// extra properties are accepted. The first violation is reported with the
/// offending field name.
pub fn validate_arguments(schema: &Value, arguments: &Value) -> Result<(), ToolError> {
    let Some(args) = arguments.as_object() else {
        return Err(ToolError::Schema {
            field: "arguments".to_string(),
            message: format!("expected a JSON object, got {}", type_name(arguments)),
        });
    };

    let empty = serde_json::Map::new();
    let properties = schema
        .get("properties")
        .and_then(|v| v.as_object())
        .unwrap_or(&empty);

    if let Some(required) = schema.get("required").and_then(|v| v.as_array()) {
        for name in required.iter().filter_map(|v| v.as_str()) {
            if !args.contains_key(name) {
                return Err(ToolError::Schema {
                    field: name.to_string(),
                    message: "missing required field".to_string(),
                });
            }
        }
    }

    for (name, value) in args {
        let Some(declared) = properties.get(name) else {
            continue;
        };

        if let Some(expected) = declared.get("type").and_then(|v| v.as_str()) {
            if !type_matches(expected, value) {
                return Err(ToolError::Schema {
                    field: name.clone(),
                    message: format!("expected {}, got {}", expected, type_name(value)),
                });
            }
        }

        if let Some(allowed) = declared.get("enum").and_then(|v| v.as_array()) {
            if !allowed.contains(value) {
                return Err(ToolError::Schema {
                    field: name.clone(),
                    message: format!("value {} is not one of the allowed values", value),
                });
            }
        }
    }

    Ok(())
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        // Unknown type keyword: don't reject what we don't understand.
        _ => true,
    }
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

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "symbol": { "type": "string" },
                "range": { "type": "string", "enum": ["1d", "5d", "1mo"] },
                "limit": { "type": "integer" }
            },
            "required": ["symbol"]
        })
    }

    #[test]
    fn test_valid_arguments() {
        let args = json!({"symbol": "AAPL", "range": "5d", "limit": 10});
        assert!(validate_arguments(&sample_schema(), &args).is_ok());
    }

    #[test]
    fn test_missing_required_field_names_it() {
        let args = json!({"range": "1d"});
        let err = validate_arguments(&sample_schema(), &args).unwrap_err();
        match err {
            ToolError::Schema { field, message } => {
                assert_eq!(field, "symbol");
                assert!(message.contains("missing"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_wrong_type_names_field() {
        let args = json!({"symbol": 42});
        let err = validate_arguments(&sample_schema(), &args).unwrap_err();
        match err {
            ToolError::Schema { field, .. } => assert_eq!(field, "symbol"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_enum_violation() {
        let args = json!({"symbol": "AAPL", "range": "2y"});
        let err = validate_arguments(&sample_schema(), &args).unwrap_err();
        match err {
            ToolError::Schema { field, .. } => assert_eq!(field, "range"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_integer_rejects_float() {
        let args = json!({"symbol": "AAPL", "limit": 2.5});
        let err = validate_arguments(&sample_schema(), &args).unwrap_err();
        match err {
            ToolError::Schema { field, .. } => assert_eq!(field, "limit"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_non_object_arguments() {
        let err = validate_arguments(&sample_schema(), &json!("AAPL")).unwrap_err();
        match err {
            ToolError::Schema { field, message } => {
                assert_eq!(field, "arguments");
                assert!(message.contains("object"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_extra_fields_accepted() {
        let args = json!({"symbol": "AAPL", "trace_id": "abc"});
        assert!(validate_arguments(&sample_schema(), &args).is_ok());
    }

    #[test]
    fn test_empty_schema_accepts_any_object() {
        let schema = json!({"type": "object"});
        assert!(validate_arguments(&schema, &json!({"anything": true})).is_ok());
    }
}
