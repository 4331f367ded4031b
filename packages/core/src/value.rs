// ABOUTME: Parameter tree value type and table-shaped flattening
// ABOUTME: User-supplied parameters are an open, JSON-compatible tree; flattening is additive

use serde_json::{Map, Value};

/// The parameter tree a caller attaches to an [`crate::types::ExecutionRequest`].
///
/// This is deliberately just a JSON object: primitives, arrays, and
/// string-keyed maps nested arbitrarily deep. `serde_json::Value` already
/// models exactly that, so there is no separate value type to keep in sync
/// with serde's.
pub type ParameterTree = Map<String, Value>;

/// Returns true if every value in `map` is a JSON primitive (not an array or
/// object).
fn is_table_shaped(map: &Map<String, Value>) -> bool {
    map.values()
        .all(|v| !matches!(v, Value::Object(_) | Value::Array(_)))
}

/// Flatten table-shaped nested maps into `parent_child` keys, alongside the
/// original nested form.
///
/// Only one level of nesting is flattened (the common "options" sub-object
/// shape build args and runner configs use); deeper nesting is left as-is
/// since it no longer has an unambiguous flat key.
pub fn flatten_parameters(tree: &ParameterTree) -> ParameterTree {
    let mut flattened = tree.clone();

    for (key, value) in tree {
        if let Value::Object(nested) = value {
            if is_table_shaped(nested) {
                for (child_key, child_value) in nested {
                    let flat_key = format!("{key}_{child_key}");
                    flattened.entry(flat_key).or_insert_with(|| child_value.clone());
                }
            }
        }
    }

    flattened
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flattens_table_shaped_nested_maps() {
        let mut tree = Map::new();
        tree.insert("db".to_string(), json!({"host": "localhost", "port": 5432}));
        tree.insert("name".to_string(), json!("my-app"));

        let flat = flatten_parameters(&tree);

        assert_eq!(flat.get("db_host"), Some(&json!("localhost")));
        assert_eq!(flat.get("db_port"), Some(&json!(5432)));
        // original nested form is preserved
        assert_eq!(flat.get("db"), Some(&json!({"host": "localhost", "port": 5432})));
        assert_eq!(flat.get("name"), Some(&json!("my-app")));
    }

    #[test]
    fn leaves_non_table_shaped_maps_alone() {
        let mut tree = Map::new();
        tree.insert(
            "nested".to_string(),
            json!({"list": [1, 2, 3], "deep": {"a": 1}}),
        );

        let flat = flatten_parameters(&tree);

        assert!(!flat.contains_key("nested_list"));
        assert!(!flat.contains_key("nested_deep"));
    }

    #[test]
    fn does_not_overwrite_existing_flat_key() {
        let mut tree = Map::new();
        tree.insert("db_host".to_string(), json!("explicit"));
        tree.insert("db".to_string(), json!({"host": "from-nesting"}));

        let flat = flatten_parameters(&tree);

        assert_eq!(flat.get("db_host"), Some(&json!("explicit")));
    }
}
