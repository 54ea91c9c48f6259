//! Error types used throughout the harness

use std::time::Duration;

use thiserror::Error;

use crate::types::ResponseClass;

/// Main error type for restprobe
#[derive(Error, Debug)]
pub enum ProbeError {
    /// Missing or unreadable configuration, or a missing/invalid key.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A bearer request was attempted without a usable current token.
    #[error("Token expired: {0}")]
    TokenExpired(String),

    /// `renew` was called with no current token.
    #[error("No current token to renew")]
    NoCurrentToken,

    /// The current token could not be parsed during renewal.
    #[error("Failed to renew token: {0}")]
    Renewal(String),

    /// An authorization header was requested with no current token.
    #[error("No token available")]
    NoToken,

    /// Token signing or decoding failed.
    #[error("Token error: {0}")]
    Token(String),

    /// A response did not match the asserted outcome class.
    #[error(
        "Response does not match class '{expected}': expected status in {accepted:?}, got {status} (content-type: {})",
        .content_type.as_deref().unwrap_or("<none>")
    )]
    ClassificationMismatch {
        /// Class the caller asserted.
        expected: ResponseClass,
        /// Status codes the class accepts.
        accepted: &'static [u16],
        /// Actual status code.
        status: u16,
        /// Actual content type, if any.
        content_type: Option<String>,
    },

    /// Network-level failure (connection refused, DNS, protocol).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The call did not complete within the allotted time.
    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Mock server error: {0}")]
    MockServer(String),

    /// A mock-server verification found a different number of requests.
    #[error("Expected {expected} {method} request(s) to {url}, found {actual}")]
    Verification {
        /// HTTP method of the verified stub.
        method: String,
        /// URL (path plus optional query) of the verified stub.
        url: String,
        /// Expected number of matching requests.
        expected: ExpectedCount,
        /// Number of matching requests received.
        actual: usize,
    },
}

/// Expected request count for mock verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedCount {
    AtLeastOnce,
    Exactly(usize),
}

impl std::fmt::Display for ExpectedCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AtLeastOnce => write!(f, "at least 1"),
            Self::Exactly(n) => write!(f, "exactly {n}"),
        }
    }
}

impl From<serde_json::Error> for ProbeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for restprobe operations
pub type Result<T> = std::result::Result<T, ProbeError>;
