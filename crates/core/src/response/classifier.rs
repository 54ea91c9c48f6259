//! Response classification
//!
//! Decides whether a (status, content type) pair belongs to a
//! [`ResponseClass`]. Pure and deterministic: the same inputs always produce
//! the same answer.

use restprobe_domain::{ProbeError, ResponseClass, Result};

/// Classification input captured from one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseOutcome {
    status: u16,
    content_type: Option<String>,
}

/// Capture a response's status and content type for classification.
#[must_use]
pub fn classify(status: u16, content_type: Option<&str>) -> ResponseOutcome {
    ResponseOutcome {
        status,
        content_type: content_type.map(str::to_string).filter(|c| !c.trim().is_empty()),
    }
}

impl ResponseOutcome {
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// `true` if the content type is JSON (`application/json` or `+json`).
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.content_type.as_deref().is_some_and(is_json_media_type)
    }

    /// Whether this response satisfies `class`.
    #[must_use]
    pub fn matches(&self, class: ResponseClass) -> bool {
        class.accepted_statuses().contains(&self.status)
            && (!class.requires_json(self.status) || self.is_json())
    }

    /// Every class this response satisfies, in [`ResponseClass::ALL`] order.
    #[must_use]
    pub fn matching_classes(&self) -> Vec<ResponseClass> {
        ResponseClass::ALL.into_iter().filter(|c| self.matches(*c)).collect()
    }

    /// Assert that this response satisfies `class`.
    ///
    /// # Errors
    /// Returns `ProbeError::ClassificationMismatch` with the accepted status
    /// set and the actual status/content type.
    pub fn expect(&self, class: ResponseClass) -> Result<()> {
        if self.matches(class) {
            return Ok(());
        }
        Err(ProbeError::ClassificationMismatch {
            expected: class,
            accepted: class.accepted_statuses(),
            status: self.status,
            content_type: self.content_type.clone(),
        })
    }
}

/// Media-type essence is `application/json` or carries a `+json` suffix.
/// Parameters such as `charset` are ignored; comparison is case-insensitive.
#[must_use]
pub fn is_json_media_type(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    match essence.split_once('/') {
        Some((kind, subtype)) => {
            kind == "application" && (subtype == "json" || subtype.ends_with("+json"))
        }
        None => false,
    }
}
