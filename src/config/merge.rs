//! Configuration merge logic
//!
//! - Objects: deep-merge by key
//! - Scalars: override (last wins)

use serde_json::Value;

/// Deep merge two JSON values.
///
/// - Objects: deep-merge by key (recursive)
/// - Anything else: overlay wins, including `null`
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Merge layers in order (first is base, last has highest precedence)
pub fn merge_layers(layers: Vec<Value>) -> Value {
    layers.into_iter().fold(Value::Null, deep_merge)
}

/// Build a nested object from a dotted path, e.g. `tail.poll_interval_ms`.
pub fn nest(path: &str, value: Value) -> Value {
    path.rsplit('.').fold(value, |inner, key| {
        let mut map = serde_json::Map::new();
        map.insert(key.to_string(), inner);
        Value::Object(map)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_section_deep_merge() {
        let base = json!({
            "backend": {"base_url": "http://a", "request_timeout_seconds": 10}
        });
        let overlay = json!({"backend": {"base_url": "http://b"}});
        let result = deep_merge(base, overlay);

        assert_eq!(result["backend"]["base_url"], "http://b");
        assert_eq!(result["backend"]["request_timeout_seconds"], 10);
    }

    #[test]
    fn test_overlay_adds_sections() {
        let result = deep_merge(json!({"backend": {}}), json!({"tail": {"poll_interval_ms": 1}}));
        assert!(result["backend"].is_object());
        assert_eq!(result["tail"]["poll_interval_ms"], 1);
    }

    #[test]
    fn test_merge_layers_last_wins() {
        let result = merge_layers(vec![
            json!({"tail": {"poll_interval_ms": 5000, "max_consecutive_failures": 5}}),
            json!({"tail": {"poll_interval_ms": 2000}}),
            json!({"tail": {"poll_interval_ms": 250}}),
        ]);
        assert_eq!(result["tail"]["poll_interval_ms"], 250);
        assert_eq!(result["tail"]["max_consecutive_failures"], 5);
    }

    #[test]
    fn test_nest() {
        assert_eq!(
            nest("tail.poll_interval_ms", json!(100)),
            json!({"tail": {"poll_interval_ms": 100}})
        );
        assert_eq!(nest("flat", json!(true)), json!({"flat": true}));
    }
}
