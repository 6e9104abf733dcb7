//! Schema file maintenance.
//!
//! Variables are discovered incrementally (graphics sizes, item spacing, ...)
//! and merged into the project's `variables.json`:
//! - **Array**: concatenated onto the existing array.
//! - **Object**: merged key by key, recursively.
//! - **Scalar**: replaced by the new value.

use std::path::Path;

use serde_json::{json, Value};

use crate::parse::SchemaError;

/// Merge `overlay` into `base` by value kind.
pub fn merge_values(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                let merged = match base.remove(&key) {
                    Some(existing) => merge_entry(existing, value),
                    None => value,
                };
                base.insert(key, merged);
            }
            Value::Object(base)
        }
        (_, overlay) => overlay,
    }
}

/// Merge one conflicting key.
fn merge_entry(existing: Value, value: Value) -> Value {
    match (existing, value) {
        (Value::Array(mut existing), Value::Array(extra)) => {
            existing.extend(extra);
            Value::Array(existing)
        }
        (existing @ Value::Object(_), value @ Value::Object(_)) => merge_values(existing, value),
        (_, value) => value,
    }
}

/// Merge `additions` into the JSON file at `path`, rewriting it pretty-printed.
pub fn merge_into_file(path: impl AsRef<Path>, additions: Value) -> Result<(), SchemaError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let current: Value = if text.trim().is_empty() {
        json!({})
    } else {
        serde_json::from_str(&text)?
    };
    let merged = merge_values(current, additions);
    std::fs::write(path, serde_json::to_string_pretty(&merged)?)?;
    Ok(())
}

/// Create the schema file if missing and make sure all four categories exist.
pub fn ensure_schema_file(path: impl AsRef<Path>) -> Result<(), SchemaError> {
    let path = path.as_ref();
    if !path.exists() {
        std::fs::write(path, "{}")?;
    }
    let template = json!({
        "booleans": [],
        "numbers": {},
        "enums": {},
        "choices": []
    });
    merge_into_file(path, template)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrays_concatenate() {
        let merged = merge_values(json!({"booleans": ["A"]}), json!({"booleans": ["B"]}));
        assert_eq!(merged, json!({"booleans": ["A", "B"]}));
    }

    #[test]
    fn test_objects_merge_recursively() {
        let merged = merge_values(
            json!({"numbers": {"x": [0, 1, 1]}}),
            json!({"numbers": {"y": [2, 3, 0]}}),
        );
        assert_eq!(merged, json!({"numbers": {"x": [0, 1, 1], "y": [2, 3, 0]}}));
    }

    #[test]
    fn test_scalars_replace() {
        let merged = merge_values(json!({"seed": 1, "keep": true}), json!({"seed": 2}));
        assert_eq!(merged, json!({"seed": 2, "keep": true}));
    }

    #[test]
    fn test_new_keys_are_added() {
        let merged = merge_values(json!({}), json!({"enums": {"style": ["a"]}}));
        assert_eq!(merged, json!({"enums": {"style": ["a"]}}));
    }
}
