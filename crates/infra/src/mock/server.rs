//! wiremock-backed stub server
//!
//! Stubs are keyed by method and URL, where the URL is a path with an
//! optional query string compared exactly (`/users?page=2`).

use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use regex::Regex;
use reqwest::Method;
use restprobe_domain::constants::CONTENT_TYPE_JSON;
use restprobe_domain::{ExpectedCount, MockServerSettings, ProbeError, Result};
use serde::Serialize;
use tracing::{debug, info};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Match, Mock, MockBuilder, Request, Respond, ResponseTemplate};

/// A local HTTP server serving canned responses.
///
/// Created stopped. [`MockServer::start`] binds the configured port
/// (`0` picks an ephemeral one); stubbing and verification fail with
/// `ProbeError::MockServer` while stopped.
pub struct MockServer {
    port: u16,
    inner: RwLock<Option<Arc<wiremock::MockServer>>>,
}

impl std::fmt::Debug for MockServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockServer")
            .field("configured_port", &self.port)
            .field("running", &self.is_running())
            .finish()
    }
}

impl MockServer {
    #[must_use]
    pub const fn new(port: u16) -> Self {
        Self { port, inner: RwLock::new(None) }
    }

    #[must_use]
    pub const fn from_settings(settings: MockServerSettings) -> Self {
        Self::new(settings.port)
    }

    /// Bind and start serving. No-op if already running.
    ///
    /// # Errors
    /// Returns `ProbeError::MockServer` if the port cannot be bound.
    pub async fn start(&self) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }

        let listener = TcpListener::bind(("127.0.0.1", self.port)).map_err(|e| {
            ProbeError::MockServer(format!("Failed to bind mock server port {}: {e}", self.port))
        })?;
        let server = wiremock::MockServer::builder().listener(listener).start().await;
        info!(port = server.address().port(), "Mock server started");

        let mut slot = self.inner.write();
        // Another caller may have started one while we were binding.
        if slot.is_none() {
            *slot = Some(Arc::new(server));
        }
        Ok(())
    }

    /// Stop serving. No-op if not running.
    pub fn stop(&self) {
        if let Some(server) = self.inner.write().take() {
            info!(port = server.address().port(), "Mock server stopped");
        }
    }

    /// Remove every stub and forget recorded requests.
    pub async fn reset(&self) {
        if let Some(server) = self.running() {
            server.reset().await;
            debug!("Mock server stubs reset");
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.read().is_some()
    }

    /// Bound port while running.
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.running().map(|server| server.address().port())
    }

    /// `http://127.0.0.1:<port>` while running.
    #[must_use]
    pub fn base_url(&self) -> Option<String> {
        self.running().map(|server| server.uri())
    }

    /// Respond to `method url` with `status` and a JSON `body`.
    ///
    /// # Errors
    /// Returns `ProbeError::MockServer` if the server is not running.
    pub async fn stub(&self, method: Method, url: &str, status: u16, body: &str) -> Result<()> {
        self.mount(given(&method, url), json_response(status, body)).await
    }

    /// Like [`MockServer::stub`], serializing `body`.
    ///
    /// # Errors
    /// Returns `ProbeError::Serialization` if `body` cannot be serialized, or
    /// `ProbeError::MockServer` if the server is not running.
    pub async fn stub_json<T: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        status: u16,
        body: &T,
    ) -> Result<()> {
        let body = serde_json::to_string(body)?;
        self.stub(method, url, status, &body).await
    }

    /// Respond after `delay`.
    ///
    /// # Errors
    /// Returns `ProbeError::MockServer` if the server is not running.
    pub async fn stub_with_delay(
        &self,
        method: Method,
        url: &str,
        status: u16,
        body: &str,
        delay: Duration,
    ) -> Result<()> {
        self.mount(given(&method, url), json_response(status, body).set_delay(delay)).await
    }

    /// Respond with `500` and the plain-text body `Simulated fault: <fault>`.
    ///
    /// # Errors
    /// Returns `ProbeError::MockServer` if the server is not running.
    pub async fn stub_with_fault(&self, method: Method, url: &str, fault: &str) -> Result<()> {
        let template = ResponseTemplate::new(500).set_body_string(format!("Simulated fault: {fault}"));
        self.mount(given(&method, url), template).await
    }

    /// Respond only when the whole request body matches `pattern`.
    ///
    /// # Errors
    /// Returns `ProbeError::InvalidInput` if `pattern` is not a valid regex,
    /// or `ProbeError::MockServer` if the server is not running.
    pub async fn stub_with_body_matching(
        &self,
        method: Method,
        url: &str,
        pattern: &str,
        status: u16,
        body: &str,
    ) -> Result<()> {
        let matcher = BodyMatches::new(pattern)?;
        self.mount(given(&method, url).and(matcher), json_response(status, body)).await
    }

    /// Respond when the request path is `url_path` and every query parameter in
    /// `params` is present with the given value.
    ///
    /// # Errors
    /// Returns `ProbeError::MockServer` if the server is not running.
    pub async fn stub_with_query_params(
        &self,
        method: Method,
        url_path: &str,
        params: &[(&str, &str)],
        status: u16,
        body: &str,
    ) -> Result<()> {
        let mut builder = Mock::given(self::method(method.as_str())).and(path(url_path));
        for (key, value) in params {
            builder = builder.and(query_param(*key, *value));
        }
        self.mount(builder, json_response(status, body)).await
    }

    /// Respond only when every header in `headers` is present with the given
    /// value.
    ///
    /// # Errors
    /// Returns `ProbeError::MockServer` if the server is not running.
    pub async fn stub_with_headers(
        &self,
        method: Method,
        url: &str,
        headers: &[(&str, &str)],
        status: u16,
        body: &str,
    ) -> Result<()> {
        let mut builder = given(&method, url);
        for (name, value) in headers {
            builder = builder.and(header(*name, *value));
        }
        self.mount(builder, json_response(status, body)).await
    }

    /// Respond to `GET url` with a body computed per request.
    ///
    /// `transform` receives the incoming request and `template` and returns
    /// the body to send with `status` and a JSON content type.
    ///
    /// # Errors
    /// Returns `ProbeError::InvalidInput` for any method other than `GET`,
    /// or `ProbeError::MockServer` if the server is not running.
    pub async fn stub_with_response_transformation<F>(
        &self,
        method: Method,
        url: &str,
        status: u16,
        template: &str,
        transform: F,
    ) -> Result<()>
    where
        F: Fn(&Request, &str) -> String + Send + Sync + 'static,
    {
        if method != Method::GET {
            return Err(ProbeError::InvalidInput(format!(
                "Response transformation supports GET only, got {method}"
            )));
        }
        let server = self.require_running()?;
        let responder = Transformed { status, template: template.to_string(), transform };
        given(&method, url).respond_with(responder).mount(&server).await;
        Ok(())
    }

    /// Assert at least one `method url` request was received.
    ///
    /// # Errors
    /// Returns `ProbeError::Verification` if none was, or
    /// `ProbeError::MockServer` if the server is not running.
    pub async fn verify_request(&self, method: Method, url: &str) -> Result<()> {
        let actual = self.count(&method, url).await?;
        if actual == 0 {
            return Err(verification(&method, url, ExpectedCount::AtLeastOnce, actual));
        }
        Ok(())
    }

    /// Assert exactly `expected` `method url` requests were received.
    ///
    /// # Errors
    /// Returns `ProbeError::Verification` on a different count, or
    /// `ProbeError::MockServer` if the server is not running.
    pub async fn verify_request_count(&self, method: Method, url: &str, expected: usize) -> Result<()> {
        let actual = self.count(&method, url).await?;
        if actual != expected {
            return Err(verification(&method, url, ExpectedCount::Exactly(expected), actual));
        }
        Ok(())
    }

    /// Number of received requests matching `method url`.
    ///
    /// # Errors
    /// Returns `ProbeError::MockServer` if the server is not running.
    pub async fn count(&self, method: &Method, url: &str) -> Result<usize> {
        let server = self.require_running()?;
        let requests = server.received_requests().await.ok_or_else(|| {
            ProbeError::MockServer("request recording is disabled".to_string())
        })?;
        let key = UrlEquals::new(url);
        Ok(requests
            .iter()
            .filter(|req| req.method.as_str() == method.as_str() && key.matches(req))
            .count())
    }

    async fn mount(&self, builder: MockBuilder, template: ResponseTemplate) -> Result<()> {
        let server = self.require_running()?;
        builder.respond_with(template).mount(&server).await;
        Ok(())
    }

    fn running(&self) -> Option<Arc<wiremock::MockServer>> {
        self.inner.read().clone()
    }

    fn require_running(&self) -> Result<Arc<wiremock::MockServer>> {
        self.running().ok_or_else(|| ProbeError::MockServer("mock server is not running".to_string()))
    }
}

fn given(verb: &Method, url: &str) -> MockBuilder {
    Mock::given(method(verb.as_str())).and(UrlEquals::new(url))
}

fn json_response(status: u16, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_raw(body.as_bytes().to_vec(), CONTENT_TYPE_JSON)
}

fn verification(method: &Method, url: &str, expected: ExpectedCount, actual: usize) -> ProbeError {
    ProbeError::Verification { method: method.to_string(), url: url.to_string(), expected, actual }
}

/// Path plus exact query string (absent query matches only no query).
#[derive(Debug, Clone)]
struct UrlEquals {
    path: String,
    query: Option<String>,
}

impl UrlEquals {
    fn new(url: &str) -> Self {
        match url.split_once('?') {
            Some((path, query)) => Self { path: path.to_string(), query: Some(query.to_string()) },
            None => Self { path: url.to_string(), query: None },
        }
    }
}

impl Match for UrlEquals {
    fn matches(&self, request: &Request) -> bool {
        request.url.path() == self.path && request.url.query() == self.query.as_deref()
    }
}

/// Whole-body regex match.
#[derive(Debug, Clone)]
struct BodyMatches(Regex);

impl BodyMatches {
    fn new(pattern: &str) -> Result<Self> {
        Regex::new(&format!("^(?s:{pattern})$"))
            .map(Self)
            .map_err(|e| ProbeError::InvalidInput(format!("Invalid body pattern {pattern:?}: {e}")))
    }
}

impl Match for BodyMatches {
    fn matches(&self, request: &Request) -> bool {
        std::str::from_utf8(&request.body).is_ok_and(|body| self.0.is_match(body))
    }
}

/// Response whose body is rebuilt from each request.
struct Transformed<F> {
    status: u16,
    template: String,
    transform: F,
}

impl<F> Respond for Transformed<F>
where
    F: Fn(&Request, &str) -> String + Send + Sync + 'static,
{
    fn respond(&self, request: &Request) -> ResponseTemplate {
        json_response(self.status, &(self.transform)(request, &self.template))
    }
}
