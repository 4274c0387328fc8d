//! Common types used throughout KeeBridge.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Unique identifier for a vault entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(Uuid);

impl EntryId {
    /// Generate a new random entry identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Parse an identifier from its textual form.
    ///
    /// # Errors
    /// - Returns `InvalidInput` if the string is not a UUID
    pub fn parse(id: &str) -> crate::Result<Self> {
        Uuid::parse_str(id.trim())
            .map(Self)
            .map_err(|e| crate::Error::InvalidInput(format!("Invalid entry id '{}': {}", id, e)))
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metadata view of a vault entry.
///
/// Never carries the secret value, so it is safe to cache and to hand to
/// search callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySummary {
    #[serde(rename = "uuid")]
    pub id: EntryId,
    pub title: String,
    pub username: String,
    pub url: String,
    pub notes: String,
}

/// Secret-bearing view of a vault entry.
///
/// The password is zeroized when the value is dropped.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Credential {
    pub username: String,
    pub password: String,
    pub url: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("url", &self.url)
            .finish()
    }
}
