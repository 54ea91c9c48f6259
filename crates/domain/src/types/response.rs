//! Expected response classes

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ProbeError;

/// Named set of acceptable (status, content-type) combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseClass {
    /// 200, 201 or 204; JSON body unless 204.
    Success,
    /// 200 with a JSON body.
    Ok,
    /// 201 with a JSON body.
    Created,
    /// 204, any content type.
    NoContent,
}

impl ResponseClass {
    pub const ALL: [Self; 4] = [Self::Success, Self::Ok, Self::Created, Self::NoContent];

    /// Status codes this class accepts.
    #[must_use]
    pub const fn accepted_statuses(self) -> &'static [u16] {
        match self {
            Self::Success => &[200, 201, 204],
            Self::Ok => &[200],
            Self::Created => &[201],
            Self::NoContent => &[204],
        }
    }

    /// Whether a response with `status` must carry a JSON content type.
    #[must_use]
    pub const fn requires_json(self, status: u16) -> bool {
        match self {
            Self::Success => status != 204,
            Self::Ok | Self::Created => true,
            Self::NoContent => false,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Ok => "ok",
            Self::Created => "created",
            Self::NoContent => "noContent",
        }
    }
}

impl fmt::Display for ResponseClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseClass {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['_', '-'], "").as_str() {
            "success" => Ok(Self::Success),
            "ok" => Ok(Self::Ok),
            "created" => Ok(Self::Created),
            "nocontent" => Ok(Self::NoContent),
            other => Err(ProbeError::InvalidInput(format!("Unknown response class '{other}'"))),
        }
    }
}
