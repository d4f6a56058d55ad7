//! Request correlation identifiers.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Longest caller-supplied correlation id that is accepted verbatim.
const MAX_LEN: usize = 128;

/// Correlation id of one in-flight request.
///
/// Either echoed from the caller (`x-request-id`) or generated as a UUIDv7.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a fresh, time-ordered id.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl core::fmt::Display for RequestId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RequestId {
    type Err = AppError;

    /// Accept a caller-supplied id: non-empty, bounded, visible ASCII only.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.len() > MAX_LEN {
            return Err(AppError::validation("invalid request id length"));
        }
        if !s.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(AppError::validation("invalid request id characters"));
        }
        Ok(Self(s.to_string()))
    }
}

impl From<RequestId> for String {
    fn from(value: RequestId) -> Self {
        value.0
    }
}
