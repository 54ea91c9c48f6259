//! Token manager with renewal support
//!
//! Manages the bearer token lifecycle:
//! - Issue HS256 tokens with a configured lifetime
//! - Validate signatures and judge expiry against an injectable clock
//! - Renew the current token before (or after) it expires
//! - Provide the `Authorization` header value for the current token

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use restprobe_domain::constants::{MAX_JWT_LIFETIME_SECS, MIN_JWT_SECRET_BYTES};
use restprobe_domain::{ClaimValue, Claims, JwtSettings, ProbeError, Token, RESERVED_CLAIMS};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::codec::TokenCodec;
use crate::time::{whole_seconds, Clock, SystemClock};

/// Error type for token manager operations
#[derive(Debug, Error)]
pub enum TokenManagerError {
    /// `renew` was called with no current token
    #[error("No current token to renew")]
    NoCurrentToken,

    /// The current token could not be parsed during renewal
    #[error("Failed to renew token: {0}")]
    Renewal(String),

    /// No token available for the authorization header
    #[error("No token available")]
    NoToken,

    /// Signing key or lifetime rejected at construction
    #[error("Invalid token configuration: {0}")]
    Config(String),

    /// Caller tried to set a reserved claim
    #[error("Claim '{0}' is reserved")]
    ReservedClaim(String),

    /// JWT encoding failed
    #[error("Failed to sign token: {0}")]
    Signing(String),

    /// Signature or structure check failed
    #[error("Malformed token: {0}")]
    Malformed(String),
}

impl From<TokenManagerError> for ProbeError {
    fn from(err: TokenManagerError) -> Self {
        match err {
            TokenManagerError::NoCurrentToken => Self::NoCurrentToken,
            TokenManagerError::Renewal(msg) => Self::Renewal(msg),
            TokenManagerError::NoToken => Self::NoToken,
            TokenManagerError::Config(msg) => Self::Config(msg),
            TokenManagerError::ReservedClaim(_) => Self::InvalidInput(err.to_string()),
            TokenManagerError::Signing(msg) | TokenManagerError::Malformed(msg) => Self::Token(msg),
        }
    }
}

/// Default renewal window: renew when less than 5 minutes remain.
pub const DEFAULT_RENEWAL_WINDOW: Duration = Duration::from_secs(300);

/// Issues and tracks HS256 bearer tokens.
///
/// The signing key is derived once at construction. The current-token slot is
/// guarded by a read/write lock: `generate`, `set`, `clear` and `renew` hold
/// the write lock for their whole read-check-write sequence, so two concurrent
/// renewals cannot overwrite each other's result. Predicates only clone the
/// current string under the read lock and decode outside it.
pub struct TokenManager {
    codec: TokenCodec,
    lifetime: chrono::Duration,
    renewal_window: chrono::Duration,
    clock: Arc<dyn Clock>,
    current: RwLock<Option<String>>,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("lifetime", &self.lifetime)
            .field("renewal_window", &self.renewal_window)
            .field("has_current", &self.current.read().is_some())
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    /// Create a token manager using the system clock.
    ///
    /// # Arguments
    /// * `secret` - HMAC secret, at least 32 bytes
    /// * `lifetime` - Lifetime of issued tokens; truncated to whole seconds,
    ///   between one second and 100 years
    /// * `renewal_window` - `needs_renewal` turns true when less than this
    ///   remains
    ///
    /// # Errors
    /// Returns `TokenManagerError::Config` for a short secret or a lifetime
    /// outside that range.
    pub fn new(
        secret: &[u8],
        lifetime: Duration,
        renewal_window: Duration,
    ) -> Result<Self, TokenManagerError> {
        if secret.len() < MIN_JWT_SECRET_BYTES {
            return Err(TokenManagerError::Config(format!(
                "secret must be at least {MIN_JWT_SECRET_BYTES} bytes, got {}",
                secret.len()
            )));
        }
        if lifetime.as_secs() > MAX_JWT_LIFETIME_SECS {
            return Err(TokenManagerError::Config(format!(
                "lifetime must be at most {MAX_JWT_LIFETIME_SECS} seconds, got {}",
                lifetime.as_secs()
            )));
        }
        let lifetime = to_chrono(Duration::from_secs(lifetime.as_secs()))?;
        if lifetime < chrono::Duration::seconds(1) {
            return Err(TokenManagerError::Config("lifetime must be at least 1 second".into()));
        }

        Ok(Self {
            codec: TokenCodec::new(secret),
            lifetime,
            renewal_window: to_chrono(renewal_window)?,
            clock: Arc::new(SystemClock),
            current: RwLock::new(None),
        })
    }

    /// Create a token manager from the `jwt.*` settings.
    ///
    /// # Errors
    /// Returns `TokenManagerError::Config` when `jwt.secret` is absent or
    /// rejected by [`TokenManager::new`].
    pub fn from_settings(settings: &JwtSettings) -> Result<Self, TokenManagerError> {
        let secret = settings
            .secret
            .as_deref()
            .ok_or_else(|| TokenManagerError::Config("jwt.secret is not configured".into()))?;
        Self::new(secret.as_bytes(), settings.lifetime, settings.renewal_window)
    }

    /// Replace the clock used for issuing and expiry checks.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Issue a token for `subject` carrying `username` and `role` claims, and
    /// make it current.
    ///
    /// # Errors
    /// Returns `TokenManagerError::Signing` if encoding fails.
    pub fn generate(&self, subject: &str, role: &str) -> Result<Token, TokenManagerError> {
        let mut claims = Claims::new();
        claims.insert("username".into(), ClaimValue::from(subject));
        claims.insert("role".into(), ClaimValue::from(role));
        self.generate_with_claims(subject, claims)
    }

    /// Issue a token with custom claims and make it current.
    ///
    /// # Errors
    /// Returns `TokenManagerError::ReservedClaim` if `claims` contains `sub`,
    /// `iat` or `exp`, or `TokenManagerError::Signing` if encoding fails.
    pub fn generate_with_claims(
        &self,
        subject: &str,
        claims: Claims,
    ) -> Result<Token, TokenManagerError> {
        if let Some(reserved) = RESERVED_CLAIMS.iter().find(|name| claims.contains_key(**name)) {
            return Err(TokenManagerError::ReservedClaim((*reserved).to_string()));
        }

        let mut slot = self.current.write();
        let token = self.issue(subject, claims, whole_seconds(self.clock.now()))?;
        *slot = Some(token.as_str().to_string());

        info!(subject, expires_at = %token.expires_at(), "Issued token");
        Ok(token)
    }

    fn issue(
        &self,
        subject: &str,
        claims: Claims,
        issued_at: DateTime<Utc>,
    ) -> Result<Token, TokenManagerError> {
        let expires_at = issued_at.checked_add_signed(self.lifetime).ok_or_else(|| {
            TokenManagerError::Signing(format!("expiry for a token issued at {issued_at} is out of range"))
        })?;
        self.codec.encode(subject, claims, issued_at, expires_at)
    }

    /// Check signature and structure. Never errors; expiry is not considered.
    #[must_use]
    pub fn validate(&self, token: &str) -> bool {
        match self.codec.decode(token) {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Token failed validation");
                false
            }
        }
    }

    /// Decode a token this manager signed.
    ///
    /// # Errors
    /// Returns `TokenManagerError::Malformed` on a bad signature or structure.
    pub fn extract_claims(&self, token: &str) -> Result<Token, TokenManagerError> {
        self.codec.decode(token)
    }

    /// Subject of a token this manager signed.
    ///
    /// # Errors
    /// Returns `TokenManagerError::Malformed` on a bad signature or structure.
    pub fn extract_username(&self, token: &str) -> Result<String, TokenManagerError> {
        Ok(self.codec.decode(token)?.subject().to_string())
    }

    /// `role` claim of a token this manager signed, if present.
    ///
    /// # Errors
    /// Returns `TokenManagerError::Malformed` on a bad signature or structure.
    pub fn extract_role(&self, token: &str) -> Result<Option<String>, TokenManagerError> {
        Ok(self.codec.decode(token)?.role().map(str::to_string))
    }

    /// `true` if the token's expiry is at or before now, or it fails to parse.
    #[must_use]
    pub fn is_expired(&self, token: &str) -> bool {
        self.codec.decode(token).map_or(true, |t| t.is_expired_at(self.clock.now()))
    }

    /// Valid signature and not expired.
    #[must_use]
    pub fn is_token_valid(&self, token: &str) -> bool {
        self.codec.decode(token).is_ok_and(|t| !t.is_expired_at(self.clock.now()))
    }

    /// `true` if there is no current token or it has expired.
    #[must_use]
    pub fn is_current_expired(&self) -> bool {
        self.current_token().map_or(true, |raw| self.is_expired(&raw))
    }

    /// Time until the current token expires; negative once expired.
    ///
    /// `None` when there is no current token or it cannot be parsed.
    #[must_use]
    pub fn time_until_expiration(&self) -> Option<chrono::Duration> {
        let raw = self.current_token()?;
        let token = self.codec.decode(&raw).ok()?;
        Some(token.time_until_expiry(self.clock.now()))
    }

    /// `true` iff the current token is unexpired and expires within the
    /// renewal window.
    #[must_use]
    pub fn needs_renewal(&self) -> bool {
        self.time_until_expiration()
            .is_some_and(|remaining| remaining > chrono::Duration::zero() && remaining < self.renewal_window)
    }

    /// Re-issue the current token with the same subject and claims.
    ///
    /// The new token is issued at `max(now, old_iat + 1s)`, so its expiry is
    /// always strictly later than the old one. The old token value is left
    /// untouched and stays verifiable until its own expiry.
    ///
    /// # Errors
    /// Returns `TokenManagerError::NoCurrentToken` if no token is set, or
    /// `TokenManagerError::Renewal` if the current token cannot be parsed.
    pub fn renew(&self) -> Result<Token, TokenManagerError> {
        let mut slot = self.current.write();
        let raw = slot.as_deref().ok_or(TokenManagerError::NoCurrentToken)?;
        let old = self.codec.decode(raw).map_err(|e| TokenManagerError::Renewal(e.to_string()))?;

        let now = whole_seconds(self.clock.now());
        let next_second = old
            .issued_at()
            .checked_add_signed(chrono::Duration::seconds(1))
            .ok_or_else(|| TokenManagerError::Renewal("issued-at is out of range".into()))?;
        let issued_at = now.max(next_second);
        let token = self
            .issue(old.subject(), old.claims().clone(), issued_at)
            .map_err(|e| TokenManagerError::Renewal(e.to_string()))?;
        *slot = Some(token.as_str().to_string());

        info!(
            subject = token.subject(),
            previous_expiry = %old.expires_at(),
            expires_at = %token.expires_at(),
            "Renewed token"
        );
        Ok(token)
    }

    /// Current token in compact form.
    #[must_use]
    pub fn current_token(&self) -> Option<String> {
        self.current.read().clone()
    }

    /// Make `token` current. It is not validated here; predicates report an
    /// unparsable token as expired.
    pub fn set(&self, token: impl Into<String>) {
        *self.current.write() = Some(token.into());
        debug!("Current token replaced");
    }

    /// Drop the current token.
    pub fn clear(&self) {
        *self.current.write() = None;
        info!("Token cleared");
    }

    /// `"Bearer <token>"` for the current token.
    ///
    /// # Errors
    /// Returns `TokenManagerError::NoToken` when no token is set.
    pub fn authorization_header_value(&self) -> Result<String, TokenManagerError> {
        self.current
            .read()
            .as_deref()
            .map(|raw| format!("Bearer {raw}"))
            .ok_or(TokenManagerError::NoToken)
    }

    /// Lifetime of issued tokens.
    #[must_use]
    pub const fn lifetime(&self) -> chrono::Duration {
        self.lifetime
    }

    /// Remaining lifetime below which `needs_renewal` is true.
    #[must_use]
    pub const fn renewal_window(&self) -> chrono::Duration {
        self.renewal_window
    }
}

fn to_chrono(duration: Duration) -> Result<chrono::Duration, TokenManagerError> {
    chrono::Duration::from_std(duration)
        .map_err(|e| TokenManagerError::Config(format!("duration out of range: {e}")))
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::token_manager.
    use super::*;
    use crate::testing::MockClock;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn create_test_manager() -> (TokenManager, MockClock) {
        let clock = MockClock::new();
        let manager = TokenManager::new(SECRET, Duration::from_secs(3600), DEFAULT_RENEWAL_WINDOW)
            .expect("token manager")
            .with_clock(Arc::new(clock.clone()));
        (manager, clock)
    }

    #[test]
    fn test_rejects_short_secret() {
        let err = TokenManager::new(b"short", Duration::from_secs(60), DEFAULT_RENEWAL_WINDOW)
            .unwrap_err();
        assert!(matches!(err, TokenManagerError::Config(_)));
    }

    #[test]
    fn test_rejects_sub_second_lifetime() {
        let err = TokenManager::new(SECRET, Duration::from_millis(500), DEFAULT_RENEWAL_WINDOW)
            .unwrap_err();
        assert!(matches!(err, TokenManagerError::Config(_)));
    }

    #[test]
    fn test_rejects_lifetime_beyond_calendar_range() {
        let err = TokenManager::new(
            SECRET,
            Duration::from_millis(100_000_000_000_000_000),
            DEFAULT_RENEWAL_WINDOW,
        )
        .unwrap_err();
        assert!(matches!(err, TokenManagerError::Config(msg) if msg.contains("at most")));
    }

    #[test]
    fn test_issue_near_end_of_time_errors_instead_of_panicking() {
        let last_second = whole_seconds(DateTime::<Utc>::MAX_UTC);
        let clock = MockClock::at(last_second - chrono::Duration::hours(1));
        let manager = TokenManager::new(SECRET, Duration::from_secs(3600), DEFAULT_RENEWAL_WINDOW)
            .unwrap()
            .with_clock(Arc::new(clock.clone()));

        // Expiry lands exactly on the last representable second.
        let token = manager.generate("alice", "admin").unwrap();
        assert_eq!(token.expires_at(), last_second);

        // One second later no longer fits.
        assert!(matches!(manager.renew(), Err(TokenManagerError::Renewal(_))));
        clock.advance(Duration::from_secs(1));
        assert!(matches!(manager.generate("alice", "admin"), Err(TokenManagerError::Signing(_))));
        assert_eq!(manager.current_token().as_deref(), Some(token.as_str()));
    }

    #[test]
    fn test_from_settings_requires_secret() {
        let settings = JwtSettings {
            secret: None,
            lifetime: Duration::from_secs(60),
            renewal_window: DEFAULT_RENEWAL_WINDOW,
        };
        assert!(matches!(
            TokenManager::from_settings(&settings),
            Err(TokenManagerError::Config(_))
        ));
    }

    #[test]
    fn test_new_manager_has_no_current_token() {
        let (manager, _) = create_test_manager();
        assert!(manager.current_token().is_none());
        assert!(manager.is_current_expired());
        assert!(!manager.needs_renewal());
        assert!(manager.time_until_expiration().is_none());
    }

    #[test]
    fn test_generate_sets_current_and_expiry() {
        let (manager, clock) = create_test_manager();
        let token = manager.generate("alice", "admin").unwrap();

        assert_eq!(manager.current_token().as_deref(), Some(token.as_str()));
        assert_eq!(token.issued_at(), clock.now());
        assert_eq!(token.expires_at() - token.issued_at(), chrono::Duration::seconds(3600));
        assert_eq!(token.claim("username"), Some(&ClaimValue::from("alice")));
        assert_eq!(token.role(), Some("admin"));
    }

    #[test]
    fn test_generate_rejects_reserved_claims() {
        let (manager, _) = create_test_manager();
        for name in RESERVED_CLAIMS {
            let mut claims = Claims::new();
            claims.insert(name.to_string(), ClaimValue::from(1_i64));
            let err = manager.generate_with_claims("alice", claims).unwrap_err();
            assert!(matches!(err, TokenManagerError::ReservedClaim(n) if n == name));
        }
        assert!(manager.current_token().is_none());
    }

    #[test]
    fn test_expiry_follows_clock() {
        let (manager, clock) = create_test_manager();
        let token = manager.generate("alice", "admin").unwrap();
        assert!(!manager.is_expired(token.as_str()));

        clock.advance(Duration::from_secs(3599));
        assert!(!manager.is_expired(token.as_str()));
        assert!(manager.is_token_valid(token.as_str()));

        clock.advance(Duration::from_secs(1));
        assert!(manager.is_expired(token.as_str()));
        assert!(manager.is_current_expired());
        assert!(!manager.is_token_valid(token.as_str()));
        // Signature is still fine.
        assert!(manager.validate(token.as_str()));
    }

    #[test]
    fn test_needs_renewal_window() {
        let (manager, clock) = create_test_manager();
        manager.generate("alice", "admin").unwrap();
        assert!(!manager.needs_renewal());

        clock.advance(Duration::from_secs(3600 - 300));
        // Exactly five minutes left is not inside the window.
        assert!(!manager.needs_renewal());

        clock.advance(Duration::from_secs(1));
        assert!(manager.needs_renewal());

        clock.advance(Duration::from_secs(299));
        assert!(manager.is_current_expired());
        assert!(!manager.needs_renewal());
    }

    #[test]
    fn test_renew_without_token() {
        let (manager, _) = create_test_manager();
        assert!(matches!(manager.renew(), Err(TokenManagerError::NoCurrentToken)));
    }

    #[test]
    fn test_renew_unparsable_current() {
        let (manager, _) = create_test_manager();
        manager.set("garbage");
        assert!(matches!(manager.renew(), Err(TokenManagerError::Renewal(_))));
        assert!(manager.is_current_expired());
        assert!(!manager.needs_renewal());
    }

    #[test]
    fn test_renew_immediately_extends_expiry() {
        let (manager, _) = create_test_manager();
        let first = manager.generate("alice", "admin").unwrap();
        let second = manager.renew().unwrap();

        assert!(second.expires_at() > first.expires_at());
        assert_eq!(second.subject(), "alice");
        assert_eq!(second.claims(), first.claims());
        assert_ne!(second.as_str(), first.as_str());
        assert_eq!(manager.current_token().as_deref(), Some(second.as_str()));
        // Old token value is independently valid.
        assert!(manager.is_token_valid(first.as_str()));
    }

    #[test]
    fn test_renew_after_expiry() {
        let (manager, clock) = create_test_manager();
        let first = manager.generate("bob", "viewer").unwrap();
        clock.advance(Duration::from_secs(7200));
        assert!(manager.is_current_expired());

        let renewed = manager.renew().unwrap();
        assert_eq!(renewed.issued_at(), clock.now());
        assert!(renewed.expires_at() > first.expires_at());
        assert!(!manager.is_current_expired());
    }

    #[test]
    fn test_authorization_header() {
        let (manager, _) = create_test_manager();
        assert!(matches!(manager.authorization_header_value(), Err(TokenManagerError::NoToken)));

        let token = manager.generate("u", "r").unwrap();
        let header = manager.authorization_header_value().unwrap();
        assert_eq!(header, format!("Bearer {}", token.as_str()));

        manager.clear();
        assert!(manager.authorization_header_value().is_err());
        assert!(manager.is_current_expired());
    }

    #[test]
    fn test_extract_helpers() {
        let (manager, _) = create_test_manager();
        let token = manager.generate("alice", "admin").unwrap();
        assert_eq!(manager.extract_username(token.as_str()).unwrap(), "alice");
        assert_eq!(manager.extract_role(token.as_str()).unwrap().as_deref(), Some("admin"));
        assert!(manager.extract_claims("nope").is_err());
    }

    #[test]
    fn test_set_foreign_token_counts_as_expired() {
        let (manager, _) = create_test_manager();
        let other = TokenManager::new(
            b"ffffffffffffffffffffffffffffffff",
            Duration::from_secs(3600),
            DEFAULT_RENEWAL_WINDOW,
        )
        .unwrap();
        let foreign = other.generate("mallory", "admin").unwrap();

        manager.set(foreign.as_str());
        assert!(!manager.validate(foreign.as_str()));
        assert!(manager.is_current_expired());
        // Header is still produced: set does not validate.
        assert!(manager.authorization_header_value().is_ok());
    }

    #[test]
    fn test_error_conversion() {
        assert!(matches!(ProbeError::from(TokenManagerError::NoToken), ProbeError::NoToken));
        assert!(matches!(
            ProbeError::from(TokenManagerError::NoCurrentToken),
            ProbeError::NoCurrentToken
        ));
        assert!(matches!(
            ProbeError::from(TokenManagerError::ReservedClaim("sub".into())),
            ProbeError::InvalidInput(_)
        ));
    }
}
