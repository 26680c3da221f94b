//! # Context Sanitization
//!
//! Strips sensitive keys and truncates oversized string fields from a context
//! map before it is stored, written to disk or exported.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::types::ContextMap;

/// Maximum number of characters kept from a string field
pub const MAX_FIELD_LENGTH: usize = 1000;

/// Appended to a string field that was cut at `MAX_FIELD_LENGTH`
pub const TRUNCATION_MARKER: &str = "... [truncated]";

// Keys are matched exactly and case-sensitively
static SENSITIVE_KEYS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    let keys = ["apiKey", "password", "token", "sessionToken"];
    HashSet::from_iter(keys.iter().copied())
});

/// Returns a sanitized copy of `context`. Never fails.
pub fn sanitize_context(context: &ContextMap) -> ContextMap {
    context
        .iter()
        .filter(|(key, _)| !is_sensitive_key(key))
        .map(|(key, value)| (key.clone(), sanitize_value(value)))
        .collect()
}

/// Determines if a context key must be dropped
pub fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEYS.contains(key)
}

fn sanitize_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(truncate_field(s)),
        Value::Object(map) => Value::Object(sanitize_context(map)),
        Value::Array(items) => Value::Array(items.iter().map(sanitize_value).collect()),
        other => other.clone(),
    }
}

/// Cuts `value` to `MAX_FIELD_LENGTH` characters plus the marker
pub fn truncate_field(value: &str) -> String {
    match value.char_indices().nth(MAX_FIELD_LENGTH) {
        Some((cut, _)) => format!("{}{}", &value[..cut], TRUNCATION_MARKER),
        None => value.to_string(),
    }
}
