//! Shared serializable identifier types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier for a production station.
///
/// Stations are compared by id only; the scheduler attaches no meaning to the
/// contents beyond uniqueness.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StationId(String);

impl StationId {
    /// Wrap a raw station identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for StationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Opaque controller handle attached to a station at registration.
///
/// Carries no behavior; the scheduler only ever compares tokens for identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControllerToken(u64);

impl ControllerToken {
    /// Wrap a raw token value.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw token value.
    pub const fn raw(self) -> u64 {
        self.0
    }
}
