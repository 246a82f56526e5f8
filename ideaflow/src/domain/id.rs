//! Session ID generation
//!
//! Session IDs are UUID v7 strings: time-ordered, so a sorted listing of
//! sessions follows creation order, and random in the low bits so two
//! sessions created in the same millisecond never collide.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Unique identifier for one workflow session
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh session ID
    pub fn generate() -> Self {
        let id = Uuid::now_v7().to_string();
        debug!(%id, "SessionId::generate: called");
        Self(id)
    }

    /// Wrap an existing ID string (no validation, used for lookups)
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the full ID string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last 8 characters, for compact display
    ///
    /// The leading characters of a v7 UUID encode the timestamp and are
    /// shared by sessions created close together, so the tail is used.
    pub fn short(&self) -> &str {
        let len = self.0.len();
        if len <= 8 { &self.0 } else { &self.0[len - 8..] }
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = Uuid::parse_str(s)?;
        Ok(Self(parsed.to_string()))
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self::from_string(s)
    }
}
