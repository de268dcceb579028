//! Deep merge of JSON context maps.

use serde_json::{Map, Value};

/// Merge `src` into `dst`.
///
/// Nested objects are merged key by key. Any other value in `src` replaces the value in
/// `dst`.
pub fn deep_merge(dst: &mut Map<String, Value>, src: Map<String, Value>) {
    for (key, value) in src {
        match value {
            Value::Object(incoming) => {
                if let Some(Value::Object(existing)) = dst.get_mut(&key) {
                    deep_merge(existing, incoming);
                } else {
                    dst.insert(key, Value::Object(incoming));
                }
            }
            value => {
                dst.insert(key, value);
            }
        }
    }
}
