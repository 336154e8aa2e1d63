use std::collections::{BTreeMap, HashSet};

use serde_json::Value;

/// Strips every field named in `exclude` (recursively, at any depth) and rebuilds every object
/// as a `BTreeMap` so key order never depends on insertion order. Arrays keep their order —
/// sequence matters for event logs, only map-key order is incidental.
pub fn canonicalize(value: &Value, exclude: &HashSet<String>) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted: BTreeMap<String, Value> = BTreeMap::new();
            for (key, val) in map {
                if exclude.contains(key) {
                    continue;
                }
                sorted.insert(key.clone(), canonicalize(val, exclude));
            }
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(|item| canonicalize(item, exclude)).collect()),
        other => other.clone(),
    }
}

pub fn default_excluded_fields() -> HashSet<String> {
    ["ts", "received_at"].into_iter().map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn strips_excluded_fields_at_any_depth() {
        let value = json!({"ts": 123, "a": 1, "nested": {"ts": 456, "b": 2}});
        let excluded = default_excluded_fields();
        let canon = canonicalize(&value, &excluded);
        assert_eq!(canon, json!({"a": 1, "nested": {"b": 2}}));
    }

    #[test]
    fn key_order_does_not_affect_canonical_form() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        let excluded = HashSet::new();
        assert_eq!(canonicalize(&a, &excluded), canonicalize(&b, &excluded));
    }

    #[test]
    fn array_order_is_preserved() {
        let value = json!([1, 2, 3]);
        let excluded = HashSet::new();
        assert_eq!(canonicalize(&value, &excluded), json!([1, 2, 3]));
    }
}
