//! Form bodies in Stripe's bracket notation.
//!
//! Nested objects become `parent[child]=value` and arrays become
//! `parent[0][child]=value`. Nulls are omitted.

use serde_json::Value;

/// Form pairs for `(name, value)` entries, in order.
pub fn form_pairs<'a>(entries: impl IntoIterator<Item = (&'a str, &'a Value)>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (name, value) in entries {
        push(&mut pairs, name.to_string(), value);
    }
    pairs
}

fn push(pairs: &mut Vec<(String, String)>, key: String, value: &Value) {
    match value {
        Value::Null => {}
        Value::String(s) => pairs.push((key, s.clone())),
        Value::Bool(b) => pairs.push((key, b.to_string())),
        Value::Number(n) => pairs.push((key, n.to_string())),
        Value::Object(map) => {
            for (child, nested) in map {
                push(pairs, format!("{}[{}]", key, child), nested);
            }
        }
        Value::Array(items) => {
            for (index, nested) in items.iter().enumerate() {
                push(pairs, format!("{}[{}]", key, index), nested);
            }
        }
    }
}
