//! Port interfaces for bearer credentials
//!
//! The request builder only needs to ask "is there a usable token, and what
//! header does it produce". Keeping that behind a trait lets the builder be
//! tested with a fixed token and keeps it unaware of signing keys.

use restprobe_common::TokenManager;
use restprobe_domain::{ProbeError, Result};

/// Source of the bearer token presented on authenticated requests.
pub trait BearerTokenSource: Send + Sync {
    /// `true` when there is no current token or it has expired.
    fn is_current_expired(&self) -> bool;

    /// `"Bearer <token>"` for the current token.
    fn authorization_header_value(&self) -> Result<String>;
}

impl BearerTokenSource for TokenManager {
    fn is_current_expired(&self) -> bool {
        Self::is_current_expired(self)
    }

    fn authorization_header_value(&self) -> Result<String> {
        Ok(Self::authorization_header_value(self)?)
    }
}

/// A fixed token taken verbatim from configuration (`auth.bearer.token`).
///
/// Opaque to the harness: it is never parsed, so it never reports expiry.
#[derive(Clone)]
pub struct StaticBearerToken(String);

impl StaticBearerToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticBearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticBearerToken(<redacted>)")
    }
}

impl BearerTokenSource for StaticBearerToken {
    fn is_current_expired(&self) -> bool {
        self.0.is_empty()
    }

    fn authorization_header_value(&self) -> Result<String> {
        if self.0.is_empty() {
            return Err(ProbeError::NoToken);
        }
        Ok(format!("Bearer {}", self.0))
    }
}
