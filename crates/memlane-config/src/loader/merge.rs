//! Deep merge for JSON config layers.

use serde_json::Value;

/// Lay `top` over `base`: objects merge key by key, anything else replaces.
pub(super) fn overlay(base: &mut Value, top: &Value) {
    if let (Value::Object(base_map), Value::Object(top_map)) = (&mut *base, top) {
        for (key, value) in top_map {
            overlay(base_map.entry(key.clone()).or_insert(Value::Null), value);
        }
        return;
    }
    *base = top.clone();
}

#[cfg(test)]
mod tests {
    use super::overlay;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    /// Nested blocks keep keys the upper layer does not mention.
    #[test]
    fn nested_keys_survive() {
        let mut base = json!({ "search": { "max_results": 5, "keyword_weight": 0.3 } });
        overlay(&mut base, &json!({ "search": { "max_results": 8 }, "qa": { "recent_count": 1 } }));
        assert_eq!(
            base,
            json!({
                "search": { "max_results": 8, "keyword_weight": 0.3 },
                "qa": { "recent_count": 1 }
            })
        );
    }

    /// Non-object values are replaced, not combined.
    #[test]
    fn scalars_and_arrays_replace() {
        let mut base = json!({ "store": { "data_dir": "/a" }, "tags": [1, 2] });
        overlay(&mut base, &json!({ "store": "flat", "tags": [3] }));
        assert_eq!(base, json!({ "store": "flat", "tags": [3] }));
    }
}
