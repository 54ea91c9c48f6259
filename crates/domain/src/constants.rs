//! Harness constants
//!
//! Configuration key names and their defaults. Keys use the dotted
//! properties naming; environment overrides use `RESTPROBE_` plus the key
//! upper-cased with dots replaced by underscores.

// Configuration keys
pub const KEY_BASE_URI: &str = "base.uri";
pub const KEY_BASE_URL: &str = "base.url";
pub const KEY_AUTH_TYPE: &str = "auth.type";
pub const KEY_BASIC_USERNAME: &str = "auth.basic.username";
pub const KEY_BASIC_PASSWORD: &str = "auth.basic.password";
pub const KEY_BEARER_TOKEN: &str = "auth.bearer.token";
pub const KEY_COOKIE_NAME: &str = "auth.cookie.name";
pub const KEY_COOKIE_VALUE: &str = "auth.cookie.value";
pub const KEY_API_KEY_ENABLED: &str = "api.key.enabled";
pub const KEY_API_KEY_HEADER: &str = "api.key.header";
pub const KEY_API_KEY_VALUE: &str = "api.key.value";
pub const KEY_JWT_SECRET: &str = "jwt.secret";
pub const KEY_JWT_EXPIRATION: &str = "jwt.expiration";
pub const KEY_JWT_RENEWAL_WINDOW: &str = "jwt.renewal.window";
pub const KEY_API_TIMEOUT: &str = "api.timeout";
pub const KEY_MOCK_SERVER_PORT: &str = "mock.server.port";
pub const KEY_MOCK_SERVER_ENABLED: &str = "mock.server.enabled";
pub const KEY_LOG_LEVEL: &str = "log.level";
pub const KEY_LOG_FORMAT: &str = "log.format";
pub const KEY_HTTP_CONNECT_TIMEOUT: &str = "http.connect.timeout";
pub const KEY_HTTP_USER_AGENT: &str = "http.user.agent";
pub const KEY_HTTP_RELAXED_HTTPS: &str = "http.relaxed.https";
/// Prefix for default headers, e.g. `http.header.X-Suite=smoke`.
pub const KEY_HTTP_HEADER_PREFIX: &str = "http.header.";

// Defaults
pub const DEFAULT_ENV: &str = "qa";
pub const DEFAULT_AUTH_TYPE: &str = "none";
pub const DEFAULT_JWT_EXPIRATION_MS: u64 = 3_600_000;
pub const DEFAULT_RENEWAL_WINDOW_MS: u64 = 300_000;
pub const DEFAULT_API_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MOCK_SERVER_PORT: u16 = 8080;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Upper bound for `jwt.expiration`: 100 years.
pub const MAX_JWT_LIFETIME_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// HS256 keys shorter than 256 bits are rejected.
pub const MIN_JWT_SECRET_BYTES: usize = 32;

// Environment
pub const ENV_SELECTOR: &str = "RESTPROBE_ENV";
pub const ENV_OVERRIDE_PREFIX: &str = "RESTPROBE_";

// Media types
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";
