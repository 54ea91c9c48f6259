//! Request specification builder
//!
//! Turns configuration plus the current auth state into a [`RequestSpec`].
//! No network I/O happens here; the only external read is the bearer token
//! source, consulted at build time so a spec always reflects the token as it
//! was when the call was prepared.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use restprobe_domain::constants::{
    CONTENT_TYPE_FORM, CONTENT_TYPE_JSON, KEY_API_KEY_ENABLED, KEY_BASIC_USERNAME, KEY_BEARER_TOKEN, KEY_COOKIE_NAME,
    KEY_JWT_SECRET,
};
use restprobe_domain::{AuthMode, ProbeError, RequestBody, RequestSpec, Result, Settings};
use tracing::debug;

use super::options::RequestOptions;
use crate::auth::BearerTokenSource;

const AUTHORIZATION: &str = "Authorization";

/// Builds one [`RequestSpec`] per call.
///
/// Cheap to construct: it holds the settings snapshot and token source by
/// `Arc`.
#[derive(Clone)]
pub struct RequestSpecBuilder {
    settings: Arc<Settings>,
    tokens: Option<Arc<dyn BearerTokenSource>>,
}

impl std::fmt::Debug for RequestSpecBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSpecBuilder")
            .field("base_uri", &self.settings.base_uri())
            .field("auth_mode", &self.settings.auth_mode())
            .field("has_token_source", &self.tokens.is_some())
            .finish()
    }
}

impl RequestSpecBuilder {
    /// Builder over a settings snapshot, with no bearer token source.
    #[must_use]
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings, tokens: None }
    }

    /// Attach the token source used for `bearer` requests.
    #[must_use]
    pub fn with_token_source(mut self, tokens: Arc<dyn BearerTokenSource>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Build a spec for the configured `auth.type`.
    ///
    /// # Errors
    /// See [`RequestSpecBuilder::build_with`].
    pub fn build(&self) -> Result<RequestSpec> {
        self.build_with(self.settings.auth_mode(), &RequestOptions::default())
    }

    /// Build a spec for an explicit auth mode.
    ///
    /// # Errors
    /// See [`RequestSpecBuilder::build_with`].
    pub fn build_for(&self, mode: AuthMode) -> Result<RequestSpec> {
        self.build_with(mode, &RequestOptions::default())
    }

    /// Build a spec for `mode`, then apply `options`.
    ///
    /// `options.auth`, when set, takes precedence over `mode`. Option headers
    /// are applied last, so they override the defaults (including
    /// `Authorization` and `Content-Type`); `spec.content_type` always
    /// matches the header that is sent.
    ///
    /// # Errors
    /// - `ProbeError::TokenExpired` for `bearer` when the current token is
    ///   missing or expired
    /// - `ProbeError::Config` when the mode's credentials are not configured,
    ///   or for `apikey` while `api.key.enabled` is false
    pub fn build_with(&self, mode: AuthMode, options: &RequestOptions) -> Result<RequestSpec> {
        let mode = options.auth.unwrap_or(mode);
        let mut spec = RequestSpec::new(self.settings.base_uri());

        if let Some(content_type) = &options.content_type {
            spec.content_type.clone_from(content_type);
        } else if matches!(options.body, Some(RequestBody::Form(_))) {
            spec.content_type = CONTENT_TYPE_FORM.to_string();
        }
        spec.headers.insert("Content-Type", spec.content_type.clone());
        spec.headers.insert("Accept", CONTENT_TYPE_JSON);

        self.apply_auth(mode, &mut spec)?;

        for (name, value) in options.headers.iter() {
            spec.headers.insert(name, value);
        }
        if let Some(content_type) = spec.headers.get("content-type") {
            spec.content_type = content_type.to_string();
        }
        spec.query.extend(options.query.iter().cloned());
        spec.path_params.extend(options.path_params.iter().cloned());
        spec.body.clone_from(&options.body);

        debug!(
            base_uri = %spec.base_uri,
            auth = %mode,
            headers = spec.headers.len(),
            "Built request spec"
        );
        Ok(spec)
    }

    fn apply_auth(&self, mode: AuthMode, spec: &mut RequestSpec) -> Result<()> {
        match mode {
            AuthMode::None => {}
            AuthMode::Bearer => {
                let tokens = self.tokens.as_ref().ok_or_else(|| {
                    ProbeError::Config(format!(
                        "bearer auth requested but no token source is configured ('{KEY_JWT_SECRET}' or '{KEY_BEARER_TOKEN}')"
                    ))
                })?;
                if tokens.is_current_expired() {
                    return Err(ProbeError::TokenExpired(
                        "current token is missing or expired; generate or renew it first".into(),
                    ));
                }
                let value = tokens.authorization_header_value().map_err(|e| match e {
                    ProbeError::NoToken => {
                        ProbeError::TokenExpired("current token was cleared".into())
                    }
                    other => other,
                })?;
                spec.headers.insert(AUTHORIZATION, value);
            }
            AuthMode::Basic => {
                let creds = self.settings.basic().ok_or_else(|| {
                    ProbeError::Config(format!("basic auth requested but '{KEY_BASIC_USERNAME}' is not configured"))
                })?;
                let encoded = STANDARD.encode(format!("{}:{}", creds.username, creds.password));
                spec.headers.insert(AUTHORIZATION, format!("Basic {encoded}"));
            }
            AuthMode::Cookie => {
                let cookie = self.settings.cookie().ok_or_else(|| {
                    ProbeError::Config(format!("cookie auth requested but '{KEY_COOKIE_NAME}' is not configured"))
                })?;
                spec.headers.insert("Cookie", format!("{}={}", cookie.name, cookie.value));
            }
            AuthMode::ApiKey => {
                let api_key = self.settings.api_key();
                if !api_key.enabled {
                    return Err(ProbeError::Config(format!(
                        "apikey auth requested but '{KEY_API_KEY_ENABLED}' is false"
                    )));
                }
                // Header and value are guaranteed present when enabled.
                if let (Some(header), Some(value)) = (&api_key.header, &api_key.value) {
                    spec.headers.insert(header.as_str(), value.as_str());
                }
            }
        }
        Ok(())
    }

    /// Settings snapshot this builder reads.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}
