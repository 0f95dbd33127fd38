//! Dictionary helpers over JSON objects.
//!
//! Anything that is not a JSON object behaves as an empty dictionary.

use serde_json::Value;

/// Keys of a JSON object, in the object's iteration order.
#[must_use]
pub fn keys(value: &Value) -> Vec<&str> {
    value
        .as_object()
        .map(|map| map.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

/// Values of a JSON object, in the object's iteration order.
#[must_use]
pub fn values(value: &Value) -> Vec<&Value> {
    value
        .as_object()
        .map(|map| map.values().collect())
        .unwrap_or_default()
}

/// Whether a JSON object has no entries.
#[must_use]
pub fn is_empty(value: &Value) -> bool {
    value.as_object().is_none_or(|map| map.is_empty())
}
