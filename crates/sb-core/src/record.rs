//! Record representation.
//!
//! External records are keyed by external field name and internal records
//! by platform field id; both are JSON objects. A key that is absent means
//! "not provided", while a key holding `null` is an explicit null and is
//! carried through coercion in both directions.

use serde_json::Value;

use crate::metadata::ID_FIELD;

/// A flat record: field name to value.
pub type Record = serde_json::Map<String, Value>;

/// Render an identifier-like value as a string (`"001"`, `42` -> `"42"`).
pub fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map.get(ID_FIELD).and_then(value_to_id),
        _ => None,
    }
}

/// Bare identifier of a reference value: `{"uesio/core.id": x}` unwraps to
/// `x`, scalars pass through, anything else becomes null.
pub fn unwrap_reference(value: &Value) -> Value {
    match value {
        Value::Object(map) => map.get(ID_FIELD).cloned().unwrap_or(Value::Null),
        Value::String(_) | Value::Number(_) | Value::Null => value.clone(),
        _ => Value::Null,
    }
}

/// Build a record from `(key, value)` pairs.
pub fn record<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Value)>) -> Record {
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_to_id() {
        assert_eq!(value_to_id(&json!("abc")), Some("abc".to_string()));
        assert_eq!(value_to_id(&json!(123)), Some("123".to_string()));
        assert_eq!(value_to_id(&json!({ID_FIELD: "001"})), Some("001".to_string()));
        assert_eq!(value_to_id(&json!("")), None);
        assert_eq!(value_to_id(&Value::Null), None);
    }

    #[test]
    fn test_unwrap_reference() {
        assert_eq!(unwrap_reference(&json!({ID_FIELD: "001", "x": 1})), json!("001"));
        assert_eq!(unwrap_reference(&json!("001")), json!("001"));
        assert_eq!(unwrap_reference(&json!({"x": 1})), Value::Null);
        assert_eq!(unwrap_reference(&json!([1])), Value::Null);
    }
}
