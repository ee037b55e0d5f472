//! Structural validation of tool call arguments against the declared schema.

use serde_json::Value;

use crate::error::MedicError;

/// Check `args` against a tool's JSON Schema.
///
/// Covers the top-level object shape, required fields, property types and
/// string enums. Every violation is reported, not only the first, so the
/// model can fix all of them in one retry. Integer fields accept whole
/// floats.
pub fn validate_arguments(args: &Value, schema: &Value) -> Result<(), MedicError> {
    let expects_object = schema.get("type").and_then(Value::as_str) == Some("object");
    let Some(obj) = args.as_object() else {
        if expects_object {
            return Err(MedicError::InvalidArgument(format!(
                "expected object arguments, got {}",
                json_type_name(args)
            )));
        }
        return Ok(());
    };

    let mut problems = Vec::new();

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        problems.extend(
            required
                .iter()
                .filter_map(Value::as_str)
                .filter(|name| obj.get(*name).map_or(true, Value::is_null))
                .map(|name| format!("missing required field '{name}'")),
        );
    }

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (key, value) in obj {
            let Some(prop) = properties.get(key) else {
                continue;
            };
            if let Some(expected) = prop.get("type").and_then(Value::as_str) {
                if !value.is_null() && !matches_type(value, expected) {
                    problems.push(format!(
                        "field '{key}' expected type '{expected}', got {}",
                        json_type_name(value)
                    ));
                    continue;
                }
            }
            if let Some(allowed) = prop.get("enum").and_then(Value::as_array) {
                if !allowed.contains(value) {
                    problems.push(format!("field '{key}' must be one of {}", Value::from(allowed.clone())));
                }
            }
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(MedicError::InvalidArgument(problems.join("; ")))
    }
}

fn matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => {
            value.is_i64() || value.is_u64() || value.as_f64().is_some_and(|f| f.fract() == 0.0)
        }
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
