//! Outbound request specification

use std::collections::BTreeMap;

use serde_json::Value;

use crate::constants::CONTENT_TYPE_JSON;

/// Header set with case-insensitive names; inserting an existing name
/// replaces its value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    // lowercased name -> (name as first written, value)
    entries: BTreeMap<String, (String, String)>,
}

impl Headers {
    /// Empty header set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a header. Returns the previous value, if any.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let key = name.to_ascii_lowercase();
        let value = value.into();
        match self.entries.get_mut(&key) {
            Some(entry) => Some(std::mem::replace(&mut entry.1, value)),
            None => {
                self.entries.insert(key, (name, value));
                None
            }
        }
    }

    /// Value for `name`, compared case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(&name.to_ascii_lowercase()).map(|(_, v)| v.as_str())
    }

    /// Whether `name` is set, compared case-insensitively.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    /// Remove `name`, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.remove(&name.to_ascii_lowercase()).map(|(_, v)| v)
    }

    /// Number of distinct header names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when no headers are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(name, value)` pairs, ordered by lowercased name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.values().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Serialized as JSON text.
    Json(Value),
    /// Sent as-is.
    Text(String),
    /// URL-encoded `name=value` pairs, in order.
    Form(Vec<(String, String)>),
}

/// Fully-formed description of one outbound call, minus method and path.
///
/// Built fresh for every call and never reused, so auth headers always reflect
/// the token state at build time.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub base_uri: String,
    pub headers: Headers,
    /// Mirrors the `Content-Type` header.
    pub content_type: String,
    pub query: Vec<(String, String)>,
    /// Values for `{name}` placeholders in the request path.
    pub path_params: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl RequestSpec {
    /// JSON request against `base_uri` with no headers.
    #[must_use]
    pub fn new(base_uri: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            headers: Headers::new(),
            content_type: CONTENT_TYPE_JSON.to_string(),
            query: Vec::new(),
            path_params: Vec::new(),
            body: None,
        }
    }

    /// Join the base URI and a path with exactly one slash between them.
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        if path.is_empty() {
            return self.base_uri.clone();
        }
        format!("{}/{}", self.base_uri.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    /// The `Authorization` header, if one was set.
    #[must_use]
    pub fn authorization(&self) -> Option<&str> {
        self.headers.get("authorization")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_names_are_case_insensitive_last_write_wins() {
        let mut headers = Headers::new();
        assert_eq!(headers.insert("X-Trace", "1"), None);
        assert_eq!(headers.insert("x-trace", "2"), Some("1".to_string()));

        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("X-TRACE"), Some("2"));
        // First spelling is kept for the wire.
        assert_eq!(headers.iter().next(), Some(("X-Trace", "2")));
    }

    #[test]
    fn header_remove_and_collect() {
        let mut headers: Headers = [("Accept", "a"), ("Cookie", "c")].into_iter().collect();
        assert!(headers.contains("cookie"));
        assert_eq!(headers.remove("COOKIE"), Some("c".into()));
        assert!(!headers.contains("cookie"));
        assert!(!headers.is_empty());
    }

    #[test]
    fn url_join_normalizes_slashes() {
        let spec = RequestSpec::new("https://reqres.in/api/");
        assert_eq!(spec.url_for("/users/2"), "https://reqres.in/api/users/2");
        assert_eq!(spec.url_for("users"), "https://reqres.in/api/users");
        assert_eq!(spec.url_for(""), "https://reqres.in/api/");
    }

    #[test]
    fn defaults_to_json() {
        let spec = RequestSpec::new("http://x");
        assert_eq!(spec.content_type, "application/json");
        assert!(spec.authorization().is_none());
        assert!(spec.body.is_none());
        assert!(spec.path_params.is_empty());
    }
}
