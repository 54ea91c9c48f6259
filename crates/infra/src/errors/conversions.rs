//! Conversions from external infrastructure errors into domain errors.

use reqwest::Error as HttpError;
use restprobe_domain::ProbeError;
use url::ParseError as UrlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct InfraError(pub ProbeError);

impl From<InfraError> for ProbeError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<ProbeError> for InfraError {
    fn from(value: ProbeError) -> Self {
        Self(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoProbeError {
    fn into_probe(self) -> ProbeError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → ProbeError */
/* -------------------------------------------------------------------------- */

impl IntoProbeError for HttpError {
    fn into_probe(self) -> ProbeError {
        let url = self.url().map_or_else(|| "<unknown url>".to_string(), ToString::to_string);

        if self.is_builder() {
            return ProbeError::InvalidInput(format!("invalid request for {url}: {self}"));
        }

        if self.is_timeout() {
            return ProbeError::Transport(format!("HTTP request to {url} timed out"));
        }

        if self.is_connect() {
            return ProbeError::Transport(format!("HTTP connection failure for {url}: {self}"));
        }

        if self.is_decode() {
            return ProbeError::Serialization(format!("failed to decode response from {url}: {self}"));
        }

        ProbeError::Transport(format!("HTTP request to {url} failed: {self}"))
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        Self(value.into_probe())
    }
}

/* -------------------------------------------------------------------------- */
/* url::ParseError → ProbeError */
/* -------------------------------------------------------------------------- */

impl IntoProbeError for UrlError {
    fn into_probe(self) -> ProbeError {
        ProbeError::InvalidInput(format!("invalid URL: {self}"))
    }
}

impl From<UrlError> for InfraError {
    fn from(value: UrlError) -> Self {
        Self(value.into_probe())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
