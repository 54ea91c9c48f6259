//! Per-call request options

use std::time::Duration;

use restprobe_domain::{AuthMode, Headers, RequestBody};
use serde_json::Value;

/// Adjustments applied on top of the configured defaults for one call.
///
/// Everything is optional; `RequestOptions::default()` changes nothing.
///
/// ```
/// use std::time::Duration;
///
/// use restprobe_core::RequestOptions;
/// use restprobe_domain::AuthMode;
///
/// let options = RequestOptions::new()
///     .auth(AuthMode::None)
///     .header("X-Trace-Id", "abc")
///     .query("page", "2")
///     .path_param("id", "2")
///     .timeout(Duration::from_secs(5));
/// assert_eq!(options.query.len(), 1);
/// assert_eq!(options.path_params.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    /// Auth mode for this call instead of `auth.type`.
    pub auth: Option<AuthMode>,
    /// Extra headers; these override builder defaults of the same name.
    pub headers: Headers,
    pub query: Vec<(String, String)>,
    /// Values for `{name}` placeholders in the path.
    pub path_params: Vec<(String, String)>,
    /// Replaces the default `application/json` content type.
    pub content_type: Option<String>,
    pub body: Option<RequestBody>,
    /// Replaces `api.timeout` for this call.
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn auth(mut self, mode: AuthMode) -> Self {
        self.auth = Some(mode);
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Fill the `{name}` placeholder of the request path with `value`.
    #[must_use]
    pub fn path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    #[must_use]
    pub fn json_body(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    #[must_use]
    pub fn text_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Text(body.into()));
        self
    }

    /// Append a URL-encoded form field, replacing any non-form body.
    ///
    /// Unless a content type is set explicitly, the request is sent as
    /// `application/x-www-form-urlencoded`.
    #[must_use]
    pub fn form_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let field = (name.into(), value.into());
        match &mut self.body {
            Some(RequestBody::Form(fields)) => fields.push(field),
            _ => self.body = Some(RequestBody::Form(vec![field])),
        }
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
