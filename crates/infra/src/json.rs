//! JSON helpers
//!
//! Thin wrappers over `serde_json` that report failures as
//! `ProbeError::Serialization`, plus dotted-path lookup and deep merge for
//! asserting on and composing payloads.

use std::path::Path;

use restprobe_domain::{ProbeError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// Compact JSON.
///
/// # Errors
/// Returns `ProbeError::Serialization` if `value` cannot be serialized.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Indented JSON.
///
/// # Errors
/// Returns `ProbeError::Serialization` if `value` cannot be serialized.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// # Errors
/// Returns `ProbeError::Serialization` if `json` is invalid for `T`.
pub fn from_json<T: DeserializeOwned>(json: &str) -> Result<T> {
    Ok(serde_json::from_str(json)?)
}

/// Parse a JSON object into a map.
///
/// # Errors
/// Returns `ProbeError::Serialization` if `json` is not an object.
pub fn from_json_to_map(json: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(json)? {
        Value::Object(map) => Ok(map),
        other => Err(ProbeError::Serialization(format!(
            "expected a JSON object, found {}",
            type_name(&other)
        ))),
    }
}

/// Parse a JSON array into a list of `T`.
///
/// # Errors
/// Returns `ProbeError::Serialization` if `json` is not an array or an
/// element is invalid for `T`.
pub fn from_json_to_list<T: DeserializeOwned>(json: &str) -> Result<Vec<T>> {
    match serde_json::from_str::<Value>(json)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(ProbeError::from))
            .collect(),
        other => Err(ProbeError::Serialization(format!(
            "expected a JSON array, found {}",
            type_name(&other)
        ))),
    }
}

/// Read and deserialize a JSON file.
///
/// # Errors
/// Returns `ProbeError::Config` if the file cannot be read, or
/// `ProbeError::Serialization` if its contents are invalid for `T`.
pub fn from_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        ProbeError::Config(format!("Failed to read JSON file {}: {e}", path.display()))
    })?;
    from_json(&contents)
}

/// Write `value` as indented JSON.
///
/// # Errors
/// Returns `ProbeError::Serialization` if serialization fails, or
/// `ProbeError::Config` if the file cannot be written.
pub fn write_pretty_json_file<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    let json = to_pretty_json(value)?;
    std::fs::write(path, json).map_err(|e| {
        ProbeError::Config(format!("Failed to write JSON file {}: {e}", path.display()))
    })
}

#[must_use]
pub fn is_valid_json(json: &str) -> bool {
    serde_json::from_str::<Value>(json).is_ok()
}

/// Look up a dotted path. Array elements are addressed by index
/// (`data.0.email`). An empty path returns `value` itself.
///
/// ```
/// use restprobe_infra::json::value_at;
/// use serde_json::json;
///
/// let body = json!({"data": [{"email": "george.bluth@reqres.in"}]});
/// assert_eq!(value_at(&body, "data.0.email"), Some(&json!("george.bluth@reqres.in")));
/// assert_eq!(value_at(&body, "data.1"), None);
/// ```
#[must_use]
pub fn value_at<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Deep-merge `patch` into `base`.
///
/// Objects merge key by key; any other value in `patch` replaces the one in
/// `base`, and `null` in `patch` removes the key.
pub fn merge_json(base: &mut Value, patch: Value) {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            for (key, value) in patch_map {
                if value.is_null() {
                    base_map.remove(&key);
                } else {
                    merge_json(base_map.entry(key).or_insert(Value::Null), value);
                }
            }
        }
        (base, patch) => *base = patch,
    }
}

const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
