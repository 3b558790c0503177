//! Deep merge of JSON layers.

use serde_json::Value;

/// Merge `overlay` into `base`, recursing through objects.
///
/// `locked` mirrors the requirements layer at the same depth: a key that is
/// locked to a non-object value keeps whatever `base` already holds.
pub(super) fn merge_layer(base: &mut Value, overlay: &Value, locked: Option<&Value>) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            let locked_map = match locked {
                Some(Value::Object(map)) => Some(map),
                Some(_) => return,
                None => None,
            };
            for (key, value) in overlay_map {
                let nested = locked_map.and_then(|map| map.get(key));
                if nested.is_some_and(|lock| !lock.is_object()) {
                    continue;
                }
                let slot = base_map.entry(key.clone()).or_insert(Value::Null);
                merge_layer(slot, value, nested);
            }
        }
        (slot, value) => {
            if locked.is_none() {
                *slot = value.clone();
            }
        }
    }
}
