//! Normalization of tool names and input schemas.

use serde_json::{json, Map, Value};

/// Keys some servers emit that model providers reject in function schemas.
const STRIPPED_KEYS: [&str; 2] = ["$schema", "title"];

/// Normalizes a server-supplied input schema into the shape model providers
/// accept for function parameters.
///
/// A missing or non-object schema becomes an empty object schema that
/// forbids extra properties. Otherwise `$schema` and `title` are removed
/// and `type`/`properties` are filled in only when absent; every other key
/// is kept untouched.
pub fn sanitize_schema(schema: Option<Value>) -> Value {
    let Some(Value::Object(mut map)) = schema else {
        return json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false,
        });
    };

    for key in STRIPPED_KEYS {
        map.remove(key);
    }
    map.entry("type")
        .or_insert_with(|| Value::String("object".to_string()));
    map.entry("properties")
        .or_insert_with(|| Value::Object(Map::new()));
    Value::Object(map)
}

/// Strips decoration some models append to a tool name, e.g.
/// `read_file{"path": ...}` or `search=foo`, leaving the bare name.
pub fn sanitize_tool_name(raw: &str) -> &str {
    raw.split(['{', '='])
        .next()
        .unwrap_or(raw)
        .trim()
}
