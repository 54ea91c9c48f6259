//! Harness settings
//!
//! [`Settings`] is the validated, immutable view of a loaded properties
//! source. Validation happens once in [`Settings::from_properties`]; a missing
//! required key is reported there, never at first use.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::{
    DEFAULT_API_TIMEOUT_MS, DEFAULT_AUTH_TYPE, DEFAULT_JWT_EXPIRATION_MS, DEFAULT_LOG_LEVEL,
    DEFAULT_MOCK_SERVER_PORT, DEFAULT_RENEWAL_WINDOW_MS, KEY_API_KEY_ENABLED, KEY_API_KEY_HEADER,
    KEY_API_KEY_VALUE, KEY_API_TIMEOUT, KEY_AUTH_TYPE, KEY_BASE_URI, KEY_BASE_URL,
    KEY_BASIC_PASSWORD, KEY_BASIC_USERNAME, KEY_BEARER_TOKEN, KEY_COOKIE_NAME, KEY_COOKIE_VALUE,
    KEY_HTTP_CONNECT_TIMEOUT, KEY_HTTP_HEADER_PREFIX, KEY_HTTP_RELAXED_HTTPS, KEY_HTTP_USER_AGENT,
    KEY_JWT_EXPIRATION, KEY_JWT_RENEWAL_WINDOW, KEY_JWT_SECRET, KEY_LOG_FORMAT, KEY_LOG_LEVEL,
    KEY_MOCK_SERVER_ENABLED, KEY_MOCK_SERVER_PORT, MAX_JWT_LIFETIME_SECS, MIN_JWT_SECRET_BYTES,
};
use crate::errors::{ProbeError, Result};

/// Raw key/value pairs as read from a configuration source.
pub type Properties = BTreeMap<String, String>;

/// How outbound requests authenticate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// No credentials.
    None,
    /// `Authorization: Basic` from `auth.basic.*`.
    Basic,
    /// `Authorization: Bearer` from the current token.
    Bearer,
    /// `Cookie` header from `auth.cookie.*`.
    Cookie,
    /// Custom header from `api.key.*`.
    #[serde(rename = "apikey")]
    ApiKey,
}

impl AuthMode {
    /// Stable lowercase name, as written in `auth.type`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Basic => "basic",
            Self::Bearer => "bearer",
            Self::Cookie => "cookie",
            Self::ApiKey => "apikey",
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMode {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "basic" => Ok(Self::Basic),
            "bearer" | "jwt" => Ok(Self::Bearer),
            "cookie" => Ok(Self::Cookie),
            "apikey" | "api_key" | "api-key" => Ok(Self::ApiKey),
            other => Err(ProbeError::Config(format!(
                "Invalid {KEY_AUTH_TYPE} '{other}' (expected none|basic|bearer|cookie|apikey)"
            ))),
        }
    }
}

/// Username/password pair for HTTP Basic auth.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Cookie presented on every cookie-authenticated request.
#[derive(Clone, PartialEq, Eq)]
pub struct CookieCredentials {
    pub name: String,
    pub value: String,
}

impl fmt::Debug for CookieCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieCredentials")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .finish()
    }
}

/// API key header settings.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ApiKeySettings {
    pub enabled: bool,
    pub header: Option<String>,
    pub value: Option<String>,
}

impl fmt::Debug for ApiKeySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeySettings")
            .field("enabled", &self.enabled)
            .field("header", &self.header)
            .field("value", &self.value.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Token signing settings.
#[derive(Clone, PartialEq, Eq)]
pub struct JwtSettings {
    /// HMAC secret; at least 32 bytes when present.
    pub secret: Option<String>,
    /// Lifetime of issued tokens, whole seconds, at least one second.
    pub lifetime: Duration,
    /// Interval before expiry in which a token is due for renewal.
    pub renewal_window: Duration,
}

impl fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("lifetime", &self.lifetime)
            .field("renewal_window", &self.renewal_window)
            .finish()
    }
}

/// Embedded mock server settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockServerSettings {
    pub enabled: bool,
    /// `0` binds an ephemeral port.
    pub port: u16,
}

/// Transport settings applied when the HTTP client is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpSettings {
    /// TCP connect timeout from `http.connect.timeout`; reqwest's default when unset.
    pub connect_timeout: Option<Duration>,
    pub user_agent: Option<String>,
    /// Accept self-signed or otherwise invalid certificates.
    pub relaxed_https: bool,
    /// Headers sent on every request, from `http.header.<name>` keys.
    pub default_headers: BTreeMap<String, String>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// `EnvFilter` directive, e.g. `info` or `restprobe_infra=debug`.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self { level: DEFAULT_LOG_LEVEL.to_string(), format: LogFormat::Pretty }
    }
}

/// Validated harness settings.
#[derive(Clone)]
pub struct Settings {
    env: String,
    base_uri: String,
    auth_mode: AuthMode,
    basic: Option<BasicCredentials>,
    bearer_token: Option<String>,
    cookie: Option<CookieCredentials>,
    api_key: ApiKeySettings,
    jwt: JwtSettings,
    api_timeout: Duration,
    mock_server: MockServerSettings,
    http: HttpSettings,
    log: LogSettings,
    properties: Properties,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("env", &self.env)
            .field("base_uri", &self.base_uri)
            .field("auth_mode", &self.auth_mode)
            .field("basic", &self.basic)
            .field("cookie", &self.cookie)
            .field("api_key", &self.api_key)
            .field("jwt", &self.jwt)
            .field("api_timeout", &self.api_timeout)
            .field("mock_server", &self.mock_server)
            .field("http", &self.http)
            .finish_non_exhaustive()
    }
}

impl Settings {
    /// Validate raw properties into settings.
    ///
    /// # Errors
    /// Returns `ProbeError::Config` naming the offending key when a required
    /// key is missing or a value cannot be parsed.
    pub fn from_properties(env: impl Into<String>, properties: Properties) -> Result<Self> {
        let lookup = |key: &str| -> Option<String> {
            properties.get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
        };

        let base_uri = lookup(KEY_BASE_URI).or_else(|| lookup(KEY_BASE_URL)).ok_or_else(|| {
            ProbeError::Config(format!(
                "Missing required key '{KEY_BASE_URI}' (or '{KEY_BASE_URL}')"
            ))
        })?;
        check_base_uri(&base_uri)?;

        let auth_mode: AuthMode =
            lookup(KEY_AUTH_TYPE).as_deref().unwrap_or(DEFAULT_AUTH_TYPE).parse()?;

        let basic = match (lookup(KEY_BASIC_USERNAME), lookup(KEY_BASIC_PASSWORD)) {
            (Some(username), Some(password)) => Some(BasicCredentials { username, password }),
            _ => None,
        };
        let cookie = match (lookup(KEY_COOKIE_NAME), lookup(KEY_COOKIE_VALUE)) {
            (Some(name), Some(value)) => Some(CookieCredentials { name, value }),
            _ => None,
        };
        let bearer_token = lookup(KEY_BEARER_TOKEN);

        let api_key = ApiKeySettings {
            enabled: parse_bool(KEY_API_KEY_ENABLED, lookup(KEY_API_KEY_ENABLED).as_deref(), false)?,
            header: lookup(KEY_API_KEY_HEADER),
            value: lookup(KEY_API_KEY_VALUE),
        };

        let secret = lookup(KEY_JWT_SECRET);
        if let Some(secret) = &secret {
            if secret.len() < MIN_JWT_SECRET_BYTES {
                return Err(ProbeError::Config(format!(
                    "'{KEY_JWT_SECRET}' must be at least {MIN_JWT_SECRET_BYTES} bytes for HS256, got {}",
                    secret.len()
                )));
            }
        }
        let lifetime_ms =
            parse_u64(KEY_JWT_EXPIRATION, lookup(KEY_JWT_EXPIRATION).as_deref(), DEFAULT_JWT_EXPIRATION_MS)?;
        if lifetime_ms < 1000 {
            return Err(ProbeError::Config(format!(
                "'{KEY_JWT_EXPIRATION}' must be at least 1000 ms, got {lifetime_ms}"
            )));
        }
        if lifetime_ms / 1000 > MAX_JWT_LIFETIME_SECS {
            return Err(ProbeError::Config(format!(
                "'{KEY_JWT_EXPIRATION}' must be at most {MAX_JWT_LIFETIME_SECS} s, got {lifetime_ms} ms"
            )));
        }
        let renewal_ms = parse_u64(
            KEY_JWT_RENEWAL_WINDOW,
            lookup(KEY_JWT_RENEWAL_WINDOW).as_deref(),
            DEFAULT_RENEWAL_WINDOW_MS,
        )?;
        let jwt = JwtSettings {
            secret,
            // Token timestamps have second resolution.
            lifetime: Duration::from_secs(lifetime_ms / 1000),
            renewal_window: Duration::from_millis(renewal_ms),
        };

        let timeout_ms =
            parse_u64(KEY_API_TIMEOUT, lookup(KEY_API_TIMEOUT).as_deref(), DEFAULT_API_TIMEOUT_MS)?;
        if timeout_ms == 0 {
            return Err(ProbeError::Config(format!("'{KEY_API_TIMEOUT}' must be greater than 0")));
        }

        let port = match lookup(KEY_MOCK_SERVER_PORT) {
            Some(raw) => raw.parse::<u16>().map_err(|e| {
                ProbeError::Config(format!("Invalid '{KEY_MOCK_SERVER_PORT}' value '{raw}': {e}"))
            })?,
            None => DEFAULT_MOCK_SERVER_PORT,
        };
        let mock_server = MockServerSettings {
            enabled: parse_bool(
                KEY_MOCK_SERVER_ENABLED,
                lookup(KEY_MOCK_SERVER_ENABLED).as_deref(),
                false,
            )?,
            port,
        };

        let http = HttpSettings {
            connect_timeout: lookup(KEY_HTTP_CONNECT_TIMEOUT)
                .map(|raw| parse_u64(KEY_HTTP_CONNECT_TIMEOUT, Some(raw.as_str()), 0))
                .transpose()?
                .map(Duration::from_millis),
            user_agent: lookup(KEY_HTTP_USER_AGENT),
            relaxed_https: parse_bool(
                KEY_HTTP_RELAXED_HTTPS,
                lookup(KEY_HTTP_RELAXED_HTTPS).as_deref(),
                false,
            )?,
            default_headers: properties
                .iter()
                .filter_map(|(key, value)| {
                    let name = key.strip_prefix(KEY_HTTP_HEADER_PREFIX)?;
                    (!name.is_empty()).then(|| (name.to_string(), value.trim().to_string()))
                })
                .collect(),
        };

        let log = LogSettings {
            level: lookup(KEY_LOG_LEVEL).unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            format: match lookup(KEY_LOG_FORMAT).map(|f| f.to_ascii_lowercase()).as_deref() {
                None | Some("pretty" | "text") => LogFormat::Pretty,
                Some("json") => LogFormat::Json,
                Some(other) => {
                    return Err(ProbeError::Config(format!(
                        "Invalid '{KEY_LOG_FORMAT}' value '{other}' (expected pretty|json)"
                    )))
                }
            },
        };

        let settings = Self {
            env: env.into(),
            base_uri,
            auth_mode,
            basic,
            bearer_token,
            cookie,
            api_key,
            jwt,
            api_timeout: Duration::from_millis(timeout_ms),
            mock_server,
            http,
            log,
            properties,
        };
        settings.check_auth_requirements()?;
        Ok(settings)
    }

    fn check_auth_requirements(&self) -> Result<()> {
        if self.api_key.enabled && (self.api_key.header.is_none() || self.api_key.value.is_none()) {
            return Err(ProbeError::Config(format!(
                "'{KEY_API_KEY_ENABLED}' is true but '{KEY_API_KEY_HEADER}' or '{KEY_API_KEY_VALUE}' is missing"
            )));
        }

        match self.auth_mode {
            AuthMode::None => Ok(()),
            AuthMode::Basic if self.basic.is_none() => Err(missing_for(
                AuthMode::Basic,
                &[KEY_BASIC_USERNAME, KEY_BASIC_PASSWORD],
            )),
            AuthMode::Cookie if self.cookie.is_none() => {
                Err(missing_for(AuthMode::Cookie, &[KEY_COOKIE_NAME, KEY_COOKIE_VALUE]))
            }
            AuthMode::Bearer if self.jwt.secret.is_none() && self.bearer_token.is_none() => {
                Err(ProbeError::Config(format!(
                    "{KEY_AUTH_TYPE}=bearer requires {KEY_JWT_SECRET} or {KEY_BEARER_TOKEN}"
                )))
            }
            AuthMode::ApiKey if !self.api_key.enabled => Err(ProbeError::Config(format!(
                "{KEY_AUTH_TYPE}=apikey requires '{KEY_API_KEY_ENABLED}=true'"
            ))),
            _ => Ok(()),
        }
    }

    /// Environment name this configuration was selected for (e.g. `qa`).
    #[must_use]
    pub fn env(&self) -> &str {
        &self.env
    }

    #[must_use]
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// Default auth mode from `auth.type`.
    #[must_use]
    pub const fn auth_mode(&self) -> AuthMode {
        self.auth_mode
    }

    #[must_use]
    pub const fn basic(&self) -> Option<&BasicCredentials> {
        self.basic.as_ref()
    }

    /// Static bearer token from `auth.bearer.token`, if configured.
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        self.bearer_token.as_deref()
    }

    #[must_use]
    pub const fn cookie(&self) -> Option<&CookieCredentials> {
        self.cookie.as_ref()
    }

    #[must_use]
    pub const fn api_key(&self) -> &ApiKeySettings {
        &self.api_key
    }

    #[must_use]
    pub const fn jwt(&self) -> &JwtSettings {
        &self.jwt
    }

    /// Per-request timeout from `api.timeout`.
    #[must_use]
    pub const fn api_timeout(&self) -> Duration {
        self.api_timeout
    }

    #[must_use]
    pub const fn mock_server(&self) -> MockServerSettings {
        self.mock_server
    }

    #[must_use]
    pub const fn http(&self) -> &HttpSettings {
        &self.http
    }

    #[must_use]
    pub const fn log(&self) -> &LogSettings {
        &self.log
    }

    /// Raw lookup of any key, including ones the harness does not interpret.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Raw lookup with a caller-supplied default.
    #[must_use]
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// All raw properties.
    #[must_use]
    pub const fn properties(&self) -> &Properties {
        &self.properties
    }
}

/// `base.uri` must be an absolute `http` or `https` URL.
fn check_base_uri(raw: &str) -> Result<()> {
    let url = Url::parse(raw)
        .map_err(|e| ProbeError::Config(format!("Invalid '{KEY_BASE_URI}' value '{raw}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ProbeError::Config(format!(
            "Invalid '{KEY_BASE_URI}' value '{raw}': unsupported scheme '{other}'"
        ))),
    }
}

fn missing_for(mode: AuthMode, keys: &[&str]) -> ProbeError {
    ProbeError::Config(format!("{KEY_AUTH_TYPE}={mode} requires {}", keys.join(" and ")))
}

/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive).
fn parse_bool(key: &str, raw: Option<&str>, default: bool) -> Result<bool> {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(ProbeError::Config(format!("Invalid boolean for '{key}': '{other}'"))),
    }
}

fn parse_u64(key: &str, raw: Option<&str>, default: u64) -> Result<u64> {
    raw.map_or(Ok(default), |value| {
        value
            .parse::<u64>()
            .map_err(|e| ProbeError::Config(format!("Invalid value for '{key}': '{value}' ({e})")))
    })
}
