//! Validate tool call arguments against a tool's JSON Schema before execution.

use serde_json::Value;

/// Validate tool arguments against a JSON Schema.
///
/// Checks the top-level type, required fields, declared property types and `enum`
/// membership. Keywords outside that set are ignored. Returns a description of the
/// first violation found.
pub fn validate_arguments(args: &Value, schema: &Value) -> Result<(), String> {
    if let Some(schema_type) = schema.get("type").and_then(|v| v.as_str()) {
        if schema_type == "object" && !args.is_object() {
            return Err(format!(
                "expected object arguments, got {}",
                json_type_name(args)
            ));
        }
    }

    let Some(obj) = args.as_object() else {
        return Ok(());
    };

    if let Some(required) = schema.get("required").and_then(|v| v.as_array()) {
        for name in required.iter().filter_map(|field| field.as_str()) {
            if !obj.contains_key(name) {
                return Err(format!("missing required field '{name}'"));
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(|v| v.as_object()) {
        for (key, value) in obj {
            let Some(prop_schema) = properties.get(key) else {
                continue;
            };
            if let Some(expected_type) = prop_schema.get("type").and_then(|v| v.as_str()) {
                if !value_matches_type(value, expected_type) {
                    return Err(format!(
                        "field '{}' expected type '{}', got {}",
                        key,
                        expected_type,
                        json_type_name(value)
                    ));
                }
            }
            if let (Some(minimum), Some(number)) = (
                prop_schema.get("minimum").and_then(|v| v.as_f64()),
                value.as_f64(),
            ) {
                if number < minimum {
                    return Err(format!("field '{}' must be at least {}", key, prop_schema["minimum"]));
                }
            }
            if let Some(allowed) = prop_schema.get("enum").and_then(|v| v.as_array()) {
                if !allowed.contains(value) {
                    return Err(format!("field '{}' must be one of {}", key, Value::from(allowed.clone())));
                }
            }
        }
    }

    Ok(())
}

fn value_matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        // 1.0 is an integer as far as JSON Schema is concerned
        "integer" => value.is_i64() || value.is_u64() || value.as_f64().is_some_and(|n| n.fract() == 0.0),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
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
    use super::*;
    use serde_json::json;

    fn vote_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "proposalId": { "type": "integer", "minimum": 1 },
                "support": { "type": "boolean" }
            },
            "required": ["proposalId", "support"]
        })
    }

    #[test]
    fn accepts_matching_arguments() {
        let args = json!({ "proposalId": 2, "support": false });
        assert!(validate_arguments(&args, &vote_schema()).is_ok());
    }

    #[test]
    fn rejects_non_object_args_when_schema_expects_object() {
        let err = validate_arguments(&json!("vote yes"), &vote_schema()).unwrap_err();
        assert!(err.contains("expected object"));
    }

    #[test]
    fn rejects_missing_required_field() {
        let err = validate_arguments(&json!({ "proposalId": 1 }), &vote_schema()).unwrap_err();
        assert_eq!(err, "missing required field 'support'");
    }

    #[test]
    fn rejects_wrong_property_type() {
        let args = json!({ "proposalId": "one", "support": true });
        let err = validate_arguments(&args, &vote_schema()).unwrap_err();
        assert!(err.contains("'proposalId' expected type 'integer', got string"));
    }

    #[test]
    fn integer_rejects_fractional_numbers() {
        let args = json!({ "proposalId": 1.5, "support": true });
        assert!(validate_arguments(&args, &vote_schema()).is_err());
    }

    #[test]
    fn integer_accepts_whole_floats() {
        let args = json!({ "proposalId": 3.0, "support": true });
        assert!(validate_arguments(&args, &vote_schema()).is_ok());
    }

    #[test]
    fn rejects_value_below_minimum() {
        let args = json!({ "proposalId": -1, "support": true });
        let err = validate_arguments(&args, &vote_schema()).unwrap_err();
        assert_eq!(err, "field 'proposalId' must be at least 1");
        assert!(validate_arguments(&json!({ "proposalId": 0, "support": true }), &vote_schema()).is_err());
    }

    #[test]
    fn rejects_value_outside_enum() {
        let schema = json!({
            "type": "object",
            "properties": { "order": { "type": "string", "enum": ["asc", "desc"] } }
        });
        assert!(validate_arguments(&json!({ "order": "asc" }), &schema).is_ok());
        let err = validate_arguments(&json!({ "order": "up" }), &schema).unwrap_err();
        assert!(err.contains("must be one of"));
    }

    #[test]
    fn ignores_undeclared_properties() {
        let args = json!({ "proposalId": 1, "support": true, "note": 3 });
        assert!(validate_arguments(&args, &vote_schema()).is_ok());
    }
}
