use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use restprobe_domain::constants::KEY_HTTP_HEADER_PREFIX;
use restprobe_domain::{HttpSettings, ProbeError};
use tracing::debug;

use crate::errors::InfraError;

/// HTTP client with per-call timeout support.
///
/// Each call is attempted exactly once; callers own any retry policy.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: ReqwestClient,
}

impl HttpClient {
    /// Start building a new HTTP client.
    #[must_use]
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    ///
    /// # Errors
    /// Returns `ProbeError::Transport` if the TLS backend cannot be
    /// initialised.
    pub fn new() -> Result<Self, ProbeError> {
        Self::builder().build()
    }

    /// Build a client from the `http.*` settings.
    ///
    /// # Errors
    /// Returns `ProbeError::Config` naming the key when an `http.header.*`
    /// entry is not a valid header, or `ProbeError::Transport` if the client
    /// cannot be built.
    pub fn from_settings(settings: &HttpSettings) -> Result<Self, ProbeError> {
        let mut builder = Self::builder().accept_invalid_certs(settings.relaxed_https);
        if let Some(timeout) = settings.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(agent) = &settings.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        if !settings.default_headers.is_empty() {
            builder = builder.default_headers(header_map(&settings.default_headers)?);
        }
        builder.build()
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Execute the provided request builder, bounded by `timeout`.
    ///
    /// The timeout covers the whole exchange up to the response headers;
    /// reading the body is the caller's concern.
    ///
    /// # Errors
    /// - `ProbeError::Timeout` if no response arrives within `timeout`
    /// - `ProbeError::Transport` on connection or protocol failure
    /// - `ProbeError::InvalidInput` if the request cannot be built
    pub async fn send(
        &self,
        builder: RequestBuilder,
        timeout: Duration,
    ) -> Result<Response, ProbeError> {
        let request = builder.build().map_err(|err| ProbeError::from(InfraError::from(err)))?;

        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%method, %url, ?timeout, "sending HTTP request");

        match tokio::time::timeout(timeout, self.client.execute(request)).await {
            Ok(Ok(response)) => {
                debug!(%method, %url, status = %response.status(), "received HTTP response");
                Ok(response)
            }
            Ok(Err(err)) => {
                debug!(%method, %url, error = %err, "HTTP request failed");
                Err(InfraError::from(err).into())
            }
            Err(_) => {
                debug!(%method, %url, ?timeout, "HTTP request timed out");
                Err(ProbeError::Timeout(timeout))
            }
        }
    }
}

fn header_map(headers: &std::collections::BTreeMap<String, String>) -> Result<HeaderMap, ProbeError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let invalid = |err: &dyn std::fmt::Display| {
            ProbeError::Config(format!("Invalid '{KEY_HTTP_HEADER_PREFIX}{name}': {err}"))
        };
        let header = HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(&e))?;
        let value = HeaderValue::from_str(value).map_err(|e| invalid(&e))?;
        map.insert(header, value);
    }
    Ok(map)
}

/// Builder for [`HttpClient`].
#[derive(Debug, Default)]
pub struct HttpClientBuilder {
    connect_timeout: Option<Duration>,
    user_agent: Option<String>,
    default_headers: Option<reqwest::header::HeaderMap>,
    accept_invalid_certs: bool,
}

impl HttpClientBuilder {
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    #[must_use]
    pub fn default_headers(mut self, headers: reqwest::header::HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    /// Allow self-signed certificates, e.g. for local test environments.
    #[must_use]
    pub fn accept_invalid_certs(mut self, enabled: bool) -> Self {
        self.accept_invalid_certs = enabled;
        self
    }

    /// # Errors
    /// Returns `ProbeError::Transport` if the client cannot be built.
    pub fn build(self) -> Result<HttpClient, ProbeError> {
        let mut builder = ReqwestClient::builder().no_proxy();

        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        if let Some(headers) = self.default_headers {
            builder = builder.default_headers(headers);
        }

        if self.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().map_err(|err| {
            ProbeError::Transport(format!("failed to build HTTP client: {err}"))
        })?;

        Ok(HttpClient { client })
    }
}
