//! Request dispatcher
//!
//! One method per HTTP verb. Every call builds a fresh request spec from the
//! current configuration snapshot and token state, sends it once, and
//! returns the captured [`ApiResponse`]. Status codes are never turned into
//! errors here; callers classify explicitly.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Method;
use restprobe_core::{BearerTokenSource, RequestOptions, RequestSpecBuilder};
use restprobe_domain::{AuthMode, ProbeError, RequestBody, RequestSpec, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};
use url::{form_urlencoded, Url};

use super::response::ApiResponse;
use crate::config::ConfigSource;
use crate::errors::InfraError;
use crate::http::HttpClient;

/// Sends requests built from configuration and the current token.
///
/// Holds no mutable state: the token source is only read, so a call that
/// times out or is cancelled leaves nothing half-updated.
#[derive(Clone)]
pub struct Dispatcher {
    http: HttpClient,
    config: Arc<ConfigSource>,
    tokens: Option<Arc<dyn BearerTokenSource>>,
    auth: Option<AuthMode>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("env", &self.config.env())
            .field("auth", &self.auth)
            .field("has_token_source", &self.tokens.is_some())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Create a dispatcher over `config`, sending through `http`.
    #[must_use]
    pub fn new(config: Arc<ConfigSource>, http: HttpClient) -> Self {
        Self { http, config, tokens: None, auth: None }
    }

    /// Attach the token source used for `bearer` requests.
    #[must_use]
    pub fn with_token_source(mut self, tokens: Arc<dyn BearerTokenSource>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// A dispatcher that uses `mode` instead of `auth.type` for every call.
    ///
    /// `RequestOptions::auth` still wins for an individual call.
    #[must_use]
    pub fn with_auth(&self, mode: AuthMode) -> Self {
        Self { auth: Some(mode), ..self.clone() }
    }

    #[instrument(skip(self), fields(path = %path))]
    pub async fn get(&self, path: &str) -> Result<ApiResponse> {
        self.send(Method::GET, path, None, RequestOptions::default()).await
    }

    /// GET with per-call options (query parameters, headers, auth override).
    #[instrument(skip(self, options), fields(path = %path))]
    pub async fn get_with(&self, path: &str, options: RequestOptions) -> Result<ApiResponse> {
        self.send(Method::GET, path, None, options).await
    }

    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<ApiResponse> {
        self.send(Method::POST, path, Some(serde_json::to_value(body)?), RequestOptions::default())
            .await
    }

    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn put<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<ApiResponse> {
        self.send(Method::PUT, path, Some(serde_json::to_value(body)?), RequestOptions::default())
            .await
    }

    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn patch<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<ApiResponse> {
        self.send(Method::PATCH, path, Some(serde_json::to_value(body)?), RequestOptions::default())
            .await
    }

    /// POST `fields` as an `application/x-www-form-urlencoded` body.
    #[instrument(skip(self, fields), fields(path = %path))]
    pub async fn post_form(&self, path: &str, fields: &[(&str, &str)]) -> Result<ApiResponse> {
        let options = fields
            .iter()
            .fold(RequestOptions::default(), |options, (name, value)| options.form_field(*name, *value));
        self.send(Method::POST, path, None, options).await
    }

    #[instrument(skip(self), fields(path = %path))]
    pub async fn delete(&self, path: &str) -> Result<ApiResponse> {
        self.send(Method::DELETE, path, None, RequestOptions::default()).await
    }

    /// Send one request.
    ///
    /// `body`, when given, replaces `options.body`. `{name}` placeholders in
    /// `path` are filled from `options.path_params`. The timeout is
    /// `options.timeout`, falling back to `api.timeout`, and covers sending
    /// the request and reading the full body.
    ///
    /// # Errors
    /// - `ProbeError::TokenExpired` / `ProbeError::Config` from request
    ///   building (see [`RequestSpecBuilder::build_with`])
    /// - `ProbeError::Timeout` when the call exceeds its timeout
    /// - `ProbeError::Transport` on network failure
    /// - `ProbeError::InvalidInput` if the URL or a header is malformed, or
    ///   a path parameter is missing or unused
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        mut options: RequestOptions,
    ) -> Result<ApiResponse> {
        if let Some(body) = body {
            options.body = Some(RequestBody::Json(body));
        }

        let settings = self.config.current();
        let mode = self.auth.unwrap_or_else(|| settings.auth_mode());
        let timeout = options.timeout.unwrap_or_else(|| settings.api_timeout());

        let mut builder = RequestSpecBuilder::new(settings);
        if let Some(tokens) = &self.tokens {
            builder = builder.with_token_source(Arc::clone(tokens));
        }
        let spec = builder.build_with(mode, &options)?;
        let url = spec.url_for(&expand_path(path, &spec.path_params)?);

        debug!(%method, url = %url, auth = %options.auth.unwrap_or(mode), "Dispatching request");

        let parsed = Url::parse(&url).map_err(InfraError::from)?;
        let started = Instant::now();
        let request = self.to_reqwest(method.clone(), parsed, spec);
        let response = self.http.send(request, timeout).await?;

        let status = response.status().as_u16();
        let headers = ApiResponse::collect_headers(response.headers());
        let remaining = timeout.saturating_sub(started.elapsed());
        let bytes = match tokio::time::timeout(remaining, response.bytes()).await {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(err)) => return Err(InfraError::from(err).into()),
            Err(_) => return Err(ProbeError::Timeout(timeout)),
        };
        let elapsed = started.elapsed();

        debug!(%method, url = %url, status, elapsed_ms = elapsed_ms(elapsed), "Response received");

        Ok(ApiResponse::new(
            method.as_str(),
            url,
            status,
            headers,
            String::from_utf8_lossy(&bytes).into_owned(),
            elapsed,
        ))
    }

    fn to_reqwest(&self, method: Method, url: Url, spec: RequestSpec) -> reqwest::RequestBuilder {
        let mut request = self.http.request(method, url);
        for (name, value) in spec.headers.iter() {
            request = request.header(name, value);
        }
        if !spec.query.is_empty() {
            request = request.query(&spec.query);
        }
        match spec.body {
            Some(RequestBody::Json(value)) => request.body(value.to_string()),
            Some(RequestBody::Text(text)) => request.body(text),
            // Encoded here rather than with `.form()`, which would overwrite
            // an explicit Content-Type.
            Some(RequestBody::Form(fields)) => {
                request.body(form_urlencoded::Serializer::new(String::new()).extend_pairs(fields).finish())
            }
            None => request,
        }
    }

    /// Configuration this dispatcher reads.
    #[must_use]
    pub fn config(&self) -> &Arc<ConfigSource> {
        &self.config
    }
}

/// Replace each `{name}` in `path` with its percent-encoded value.
fn expand_path(path: &str, params: &[(String, String)]) -> Result<String> {
    let mut expanded = path.to_string();
    for (name, value) in params {
        let placeholder = format!("{{{name}}}");
        if !expanded.contains(&placeholder) {
            return Err(ProbeError::InvalidInput(format!(
                "path parameter '{name}' does not appear in '{path}'"
            )));
        }
        // byte_serialize writes spaces as '+', which a path would keep literally.
        let encoded = form_urlencoded::byte_serialize(value.as_bytes()).collect::<String>().replace('+', "%20");
        expanded = expanded.replace(&placeholder, &encoded);
    }
    if let Some(start) = expanded.find('{') {
        if let Some(len) = expanded[start..].find('}') {
            return Err(ProbeError::InvalidInput(format!(
                "no value for path parameter '{}' in '{path}'",
                &expanded[start + 1..start + len]
            )));
        }
    }
    Ok(expanded)
}

fn elapsed_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
    }

    #[test]
    fn expand_path_fills_and_encodes_placeholders() {
        assert_eq!(expand_path("/users/{id}", &params(&[("id", "2")])).unwrap(), "/users/2");
        assert_eq!(
            expand_path("/users/{id}/notes/{note}", &params(&[("note", "a b/c"), ("id", "7")])).unwrap(),
            "/users/7/notes/a%20b%2Fc"
        );
        assert_eq!(expand_path("/users", &[]).unwrap(), "/users");
    }

    #[test]
    fn expand_path_rejects_missing_and_unused_params() {
        let err = expand_path("/users/{id}", &[]).unwrap_err();
        assert!(matches!(err, ProbeError::InvalidInput(msg) if msg.contains("'id'")));

        let err = expand_path("/users", &params(&[("id", "2")])).unwrap_err();
        assert!(matches!(err, ProbeError::InvalidInput(msg) if msg.contains("does not appear")));
    }
}
