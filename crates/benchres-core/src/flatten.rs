//! Flattener: nested store documents into single-level dotted-path maps.
//!
//! Arrays are opaque leaves: they are rendered to their JSON text rather
//! than expanded, so `{"a": {"b": [1, 2]}}` becomes `{"a.b": "[1,2]"}`.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A flattened document, keyed by dotted path.
pub type FlatDocument = BTreeMap<String, Value>;

/// Flatten one document. Empty nested objects contribute no keys.
pub fn flatten(document: &Map<String, Value>) -> FlatDocument {
    let mut out = FlatDocument::new();
    flatten_into(&mut out, "", document);
    out
}

fn flatten_into(out: &mut FlatDocument, prefix: &str, map: &Map<String, Value>) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(inner) => flatten_into(out, &path, inner),
            Value::Array(_) => {
                out.insert(path, Value::String(value.to_string()));
            }
            leaf => {
                out.insert(path, leaf.clone());
            }
        }
    }
}

/// Render a flattened leaf as the text written to CSV. `null` has no text.
pub fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}
