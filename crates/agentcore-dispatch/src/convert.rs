//! Argument conversion (§4.3 "Argument conversion", §4.2.2 multi-tool path
//! step 2, §9 "Ordered-map preservation via escaped-JSON unwrap").
//!
//! Each tool declares an input type. If it is a mapping, the parsed
//! arguments are passed through directly. Otherwise the conversion goes
//! through an ordered-JSON round trip that preserves key order (this crate
//! enables `serde_json`'s `preserve_order` feature transitively through the
//! workspace so a `serde_json::Map` literally is an insertion-ordered map,
//! avoiding the teacher's escaped-JSON-unwrap workaround entirely — the
//! re-architecture the spec's design notes call for).

use serde_json::Value;

use agentcore_core::error::AgentCoreError;

/// Parse a tool call's raw JSON argument text into an ordered `Value`,
/// failing with `ToolArgConvert` on malformed JSON.
pub fn parse_arguments(tool_name: &str, raw: &str) -> Result<Value, AgentCoreError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(trimmed).map_err(|e| AgentCoreError::ToolArgConvert {
        tool: tool_name.to_string(),
        reason: e.to_string(),
    })
}

/// Fill every field named in `required` (or, for a `oneOf` schema, the union
/// of each variant's required fields) that is absent from `arguments` with
/// an empty string, mutating in place. Only applies when `arguments` is a
/// JSON object; a non-object argument value is left untouched.
pub fn fill_missing_required(arguments: &mut Value, schema: &Value) {
    let Value::Object(ref mut map) = arguments else {
        return;
    };
    for field in required_fields(schema) {
        map.entry(field).or_insert_with(|| Value::String(String::new()));
    }
}

/// Collect the `required` field names from a JSON schema, including the
/// union across `oneOf` variants when the schema itself has no top-level
/// `required` list.
fn required_fields(schema: &Value) -> Vec<String> {
    let mut fields = Vec::new();
    if let Some(arr) = schema.get("required").and_then(Value::as_array) {
        fields.extend(arr.iter().filter_map(|v| v.as_str().map(str::to_string)));
    }
    if let Some(variants) = schema.get("oneOf").and_then(Value::as_array) {
        for variant in variants {
            if let Some(arr) = variant.get("required").and_then(Value::as_array) {
                for v in arr {
                    if let Some(s) = v.as_str() {
                        if !fields.iter().any(|f| f == s) {
                            fields.push(s.to_string());
                        }
                    }
                }
            }
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_object_arguments() {
        let v = parse_arguments("t", r#"{"a":1,"b":2}"#).unwrap();
        assert_eq!(v, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn empty_arguments_become_empty_object() {
        let v = parse_arguments("t", "").unwrap();
        assert_eq!(v, json!({}));
    }

    #[test]
    fn malformed_json_is_tool_arg_convert_error() {
        let err = parse_arguments("t", "{not json").unwrap_err();
        assert!(matches!(err, AgentCoreError::ToolArgConvert { .. }));
    }

    #[test]
    fn fills_missing_required_fields_with_empty_string() {
        let schema = json!({"required": ["a", "b"]});
        let mut args = json!({"a": "present"});
        fill_missing_required(&mut args, &schema);
        assert_eq!(args, json!({"a": "present", "b": ""}));
    }

    #[test]
    fn fills_union_of_one_of_required_fields() {
        let schema = json!({
            "oneOf": [
                {"required": ["x"]},
                {"required": ["y", "x"]},
            ]
        });
        let mut args = json!({});
        fill_missing_required(&mut args, &schema);
        assert_eq!(args, json!({"x": "", "y": ""}));
    }

    #[test]
    fn key_order_is_preserved_through_round_trip() {
        let raw = r#"{"z":1,"a":2,"m":3}"#;
        let v = parse_arguments("t", raw).unwrap();
        let keys: Vec<&String> = v.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }
}
