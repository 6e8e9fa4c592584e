//! Nested value access for MAP/STRUCT fields.

use serde_json::{Map, Value};

/// Split a `a->b->c` or `a.b.c` path into its keys.
pub fn split_path(path: &str) -> Vec<String> {
    let parts: Vec<&str> = if path.contains("->") {
        path.split("->").collect()
    } else {
        path.split('.').collect()
    };
    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Value at `path`, or `None` if any level is missing or not an object.
pub fn get_path<'a>(value: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.as_object()?.get(key))
}

/// Set the value at `path`, creating (or replacing non-object) intermediate levels.
pub fn set_path(target: &mut Map<String, Value>, path: &[String], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut current = target;
    for key in parents {
        let slot = current
            .entry(key.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        current = match slot {
            Value::Object(map) => map,
            _ => return,
        };
    }
    current.insert(last.clone(), value);
}
