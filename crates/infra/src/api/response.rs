//! Captured HTTP response

use std::time::Duration;

use restprobe_core::{classify, ResponseOutcome};
use restprobe_domain::{Headers, ProbeError, ResponseClass, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::json;

/// Status, headers, content type and raw body of one response.
///
/// Classification is never implicit: call [`ApiResponse::outcome`],
/// [`ApiResponse::matches`] or [`ApiResponse::expect_class`].
#[derive(Debug, Clone)]
pub struct ApiResponse {
    method: String,
    url: String,
    status: u16,
    headers: Headers,
    content_type: Option<String>,
    body: String,
    elapsed: Duration,
}

impl ApiResponse {
    /// Assemble a response from already-read parts.
    ///
    /// The content type is taken from the `Content-Type` header.
    #[must_use]
    pub fn new(
        method: impl Into<String>,
        url: impl Into<String>,
        status: u16,
        headers: Headers,
        body: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        let content_type = headers.get("content-type").map(str::to_string);
        Self {
            method: method.into(),
            url: url.into(),
            status,
            headers,
            content_type,
            body: body.into(),
            elapsed,
        }
    }

    /// Copy reqwest's header map into case-insensitive [`Headers`]; repeated
    /// headers are joined with `", "`.
    pub(crate) fn collect_headers(map: &reqwest::header::HeaderMap) -> Headers {
        let mut headers = Headers::new();
        for (name, value) in map {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            let joined = match headers.get(name.as_str()) {
                Some(existing) => format!("{existing}, {value}"),
                None => value,
            };
            headers.insert(name.as_str(), joined);
        }
        headers
    }

    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Case-insensitive header lookup.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Raw body as text (lossy UTF-8).
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Wall time from sending the request to reading the full body.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Deserialize the body.
    ///
    /// # Errors
    /// Returns `ProbeError::Serialization` if the body is not valid JSON for
    /// `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        json::from_json(&self.body)
    }

    /// Parse the body as an untyped JSON value.
    ///
    /// # Errors
    /// Returns `ProbeError::Serialization` if the body is not valid JSON.
    pub fn json_value(&self) -> Result<Value> {
        json::from_json(&self.body)
    }

    /// Value at a dotted path in the JSON body (`data.id`, `data.0.email`).
    ///
    /// # Errors
    /// Returns `ProbeError::Serialization` if the body is not valid JSON.
    pub fn value_at(&self, path: &str) -> Result<Option<Value>> {
        Ok(json::value_at(&self.json_value()?, path).cloned())
    }

    /// Classification input for this response.
    #[must_use]
    pub fn outcome(&self) -> ResponseOutcome {
        classify(self.status, self.content_type.as_deref())
    }

    #[must_use]
    pub fn matches(&self, class: ResponseClass) -> bool {
        self.outcome().matches(class)
    }

    /// Assert this response belongs to `class`.
    ///
    /// # Errors
    /// Returns `ProbeError::ClassificationMismatch` otherwise.
    pub fn expect_class(&self, class: ResponseClass) -> Result<&Self> {
        self.outcome().expect(class).map_err(|err| {
            tracing::warn!(
                method = %self.method,
                url = %self.url,
                status = self.status,
                expected = %class,
                "Response classification mismatch"
            );
            err
        })?;
        Ok(self)
    }

    /// Assert an exact status code.
    ///
    /// # Errors
    /// Returns `ProbeError::InvalidInput` naming expected and actual status.
    pub fn expect_status(&self, status: u16) -> Result<&Self> {
        if self.status == status {
            return Ok(self);
        }
        Err(ProbeError::InvalidInput(format!(
            "{} {} returned status {}, expected {status}",
            self.method, self.url, self.status
        )))
    }
}
