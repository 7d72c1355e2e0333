use serde_json::{Map, Value};

/// Keys starting with `$` are query operators and never valid field names.
pub fn is_operator_key(key: &str) -> bool {
    key.starts_with('$')
}

/// Strip operator keys from untrusted input, recursing into nested objects
/// and arrays. Scalars pass through unchanged.
pub fn sanitize(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(sanitize_map(map)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize).collect()),
        other => other,
    }
}

pub fn sanitize_map(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter()
        .filter(|(key, _)| !is_operator_key(key))
        .map(|(key, value)| (key, sanitize(value)))
        .collect()
}
