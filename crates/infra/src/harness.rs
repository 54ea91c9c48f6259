//! Harness composition root
//!
//! Wires configuration, the token manager, the dispatcher and the optional
//! mock server together. Nothing here is global: each test suite builds its
//! own `Harness` and passes the parts it needs by `Arc`.

use std::sync::Arc;

use restprobe_common::TokenManager;
use restprobe_core::{BearerTokenSource, StaticBearerToken};
use restprobe_domain::{ProbeError, Result, Settings};
use tracing::{debug, info};

use crate::api::Dispatcher;
use crate::config::ConfigSource;
use crate::http::HttpClient;
use crate::mock::MockServer;
use crate::observability;
use crate::services::UserService;

/// Everything a test suite needs to talk to the API under test.
#[derive(Debug, Clone)]
pub struct Harness {
    pub config: Arc<ConfigSource>,
    /// Present when `jwt.secret` is configured.
    pub tokens: Option<Arc<TokenManager>>,
    pub dispatcher: Dispatcher,
    /// Present when `mock.server.enabled` is true. Not started yet.
    pub mock_server: Option<Arc<MockServer>>,
}

impl Harness {
    /// Load configuration for `RESTPROBE_ENV` and build the harness.
    ///
    /// # Errors
    /// Returns `ProbeError::Config` if loading or wiring fails.
    pub fn load() -> Result<Self> {
        Self::new(ConfigSource::load()?)
    }

    /// # Errors
    /// Returns `ProbeError::Config` if the token manager or HTTP client
    /// cannot be built.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        Self::new(ConfigSource::from_settings(settings))
    }

    /// Build the harness over an already-loaded configuration.
    ///
    /// The bearer token source is the token manager when `jwt.secret` is set
    /// (seeded with `auth.bearer.token` if present), otherwise a fixed
    /// `auth.bearer.token`, otherwise none.
    ///
    /// # Errors
    /// Returns `ProbeError::Config` if the token manager or HTTP client
    /// cannot be built.
    pub fn new(config: ConfigSource) -> Result<Self> {
        let config = Arc::new(config);
        let settings = config.current();

        let tokens = build_token_manager(&settings)?;
        let source: Option<Arc<dyn BearerTokenSource>> = match (&tokens, settings.bearer_token()) {
            (Some(manager), _) => Some(Arc::clone(manager) as Arc<dyn BearerTokenSource>),
            (None, Some(raw)) => Some(Arc::new(StaticBearerToken::new(raw))),
            (None, None) => None,
        };

        let mut dispatcher = Dispatcher::new(Arc::clone(&config), HttpClient::from_settings(settings.http())?);
        if let Some(source) = source {
            dispatcher = dispatcher.with_token_source(source);
        }

        let mock = settings.mock_server();
        let mock_server = mock.enabled.then(|| Arc::new(MockServer::from_settings(mock)));

        info!(
            env = %settings.env(),
            base_uri = %settings.base_uri(),
            auth = %settings.auth_mode(),
            tokens = tokens.is_some(),
            mock_server = mock_server.is_some(),
            "Harness ready"
        );

        Ok(Self { config, tokens, dispatcher, mock_server })
    }

    /// Install the tracing subscriber from `log.level` / `log.format`.
    ///
    /// # Errors
    /// See [`observability::init_tracing`].
    pub fn init_tracing(&self) -> Result<()> {
        observability::init_tracing(self.config.current().log())
    }

    /// Start the mock server, if configured.
    ///
    /// # Errors
    /// Returns `ProbeError::MockServer` if the port cannot be bound.
    pub async fn start(&self) -> Result<()> {
        if let Some(server) = &self.mock_server {
            server.start().await?;
        }
        Ok(())
    }

    /// Stop the mock server, if running.
    pub fn stop(&self) {
        if let Some(server) = &self.mock_server {
            server.stop();
        }
    }

    /// Current configuration snapshot.
    #[must_use]
    pub fn settings(&self) -> Arc<Settings> {
        self.config.current()
    }

    /// The token manager.
    ///
    /// # Errors
    /// Returns `ProbeError::Config` when `jwt.secret` is not configured.
    pub fn token_manager(&self) -> Result<&Arc<TokenManager>> {
        self.tokens
            .as_ref()
            .ok_or_else(|| ProbeError::Config("jwt.secret is not configured".to_string()))
    }

    /// The running mock server.
    ///
    /// # Errors
    /// Returns `ProbeError::MockServer` if it is disabled or not started.
    pub fn mock(&self) -> Result<&Arc<MockServer>> {
        match &self.mock_server {
            Some(server) if server.is_running() => Ok(server),
            Some(_) => Err(ProbeError::MockServer("mock server is not started".to_string())),
            None => Err(ProbeError::MockServer("mock.server.enabled is false".to_string())),
        }
    }

    #[must_use]
    pub fn users(&self) -> UserService {
        UserService::new(self.dispatcher.clone())
    }
}

fn build_token_manager(settings: &Settings) -> Result<Option<Arc<TokenManager>>> {
    if settings.jwt().secret.is_none() {
        return Ok(None);
    }
    let manager = TokenManager::from_settings(settings.jwt())?;
    if let Some(raw) = settings.bearer_token() {
        debug!("Seeding current token from configuration");
        manager.set(raw);
    }
    Ok(Some(Arc::new(manager)))
}
