//! Signed bearer token value type

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Claim names owned by the token itself; callers cannot set them.
pub const RESERVED_CLAIMS: [&str; 3] = ["sub", "iat", "exp"];

/// Scalar claim value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClaimValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl ClaimValue {
    /// The string payload, if this is a string claim.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ClaimValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ClaimValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ClaimValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for ClaimValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for ClaimValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for ClaimValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Custom claims carried by a token, excluding the reserved ones.
pub type Claims = BTreeMap<String, ClaimValue>;

/// A signed, time-boxed credential.
///
/// Immutable once issued: renewal produces a new `Token`. The compact
/// `header.payload.signature` form is kept alongside the decoded fields.
#[derive(Clone, PartialEq)]
pub struct Token {
    raw: String,
    subject: String,
    claims: Claims,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl Token {
    /// Assemble a token from its compact form and decoded fields.
    #[must_use]
    pub const fn new(
        raw: String,
        subject: String,
        claims: Claims,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self { raw, subject, claims, issued_at, expires_at }
    }

    /// Compact JWT form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Consume the token, keeping only its compact form.
    #[must_use]
    pub fn into_string(self) -> String {
        self.raw
    }

    /// The `sub` claim.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Custom claims, without `sub`/`iat`/`exp`.
    #[must_use]
    pub const fn claims(&self) -> &Claims {
        &self.claims
    }

    /// One custom claim by name.
    #[must_use]
    pub fn claim(&self, name: &str) -> Option<&ClaimValue> {
        self.claims.get(name)
    }

    /// The `role` claim, when it is a string.
    #[must_use]
    pub fn role(&self) -> Option<&str> {
        self.claim("role").and_then(ClaimValue::as_str)
    }

    /// The `iat` claim.
    #[must_use]
    pub const fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// The `exp` claim.
    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Base64url signature segment.
    #[must_use]
    pub fn signature(&self) -> &str {
        self.raw.rsplit('.').next().unwrap_or_default()
    }

    /// `true` once `now` has reached the expiry.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Remaining lifetime at `now`; negative once expired.
    #[must_use]
    pub fn time_until_expiry(&self, now: DateTime<Utc>) -> chrono::Duration {
        self.expires_at - now
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("subject", &self.subject)
            .field("claims", &self.claims)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn sample() -> Token {
        let iat = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut claims = Claims::new();
        claims.insert("role".into(), "admin".into());
        claims.insert("tenant".into(), 7_i64.into());
        Token::new(
            "aaa.bbb.ccc".into(),
            "alice".into(),
            claims,
            iat,
            iat + chrono::Duration::seconds(60),
        )
    }

    #[test]
    fn exposes_decoded_fields() {
        let token = sample();
        assert_eq!(token.subject(), "alice");
        assert_eq!(token.role(), Some("admin"));
        assert_eq!(token.claim("tenant"), Some(&ClaimValue::Integer(7)));
        assert_eq!(token.signature(), "ccc");
        assert_eq!(token.to_string(), "aaa.bbb.ccc");
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let token = sample();
        let exp = token.expires_at();
        assert!(!token.is_expired_at(exp - chrono::Duration::seconds(1)));
        assert!(token.is_expired_at(exp));
        assert_eq!(token.time_until_expiry(exp), chrono::Duration::zero());
    }

    #[test]
    fn debug_hides_compact_form() {
        assert!(!format!("{:?}", sample()).contains("aaa.bbb.ccc"));
    }

    #[test]
    fn claim_values_deserialize_untagged() {
        let claims: Claims =
            serde_json::from_str(r#"{"a":true,"b":3,"c":1.5,"d":"x"}"#).unwrap();
        assert_eq!(claims["a"], ClaimValue::Bool(true));
        assert_eq!(claims["b"], ClaimValue::Integer(3));
        assert_eq!(claims["c"], ClaimValue::Float(1.5));
        assert_eq!(claims["d"], ClaimValue::String("x".into()));
    }
}
