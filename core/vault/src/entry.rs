//! Vault entries.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use keebridge_common::{Credential, EntryId, EntrySummary};

/// A single credential record stored in the vault.
///
/// String fields are zeroized on drop; the identifier is not secret.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct VaultEntry {
    #[zeroize(skip)]
    pub id: EntryId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub notes: String,
}

impl VaultEntry {
    /// Create a new entry with a fresh identifier.
    pub fn new(
        title: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: EntryId::new(),
            title: title.into(),
            username: username.into(),
            password: password.into(),
            url: url.into(),
            notes: String::new(),
        }
    }

    /// Set the notes field.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Metadata view, without the secret.
    pub fn summary(&self) -> EntrySummary {
        EntrySummary {
            id: self.id,
            title: self.title.clone(),
            username: self.username.clone(),
            url: self.url.clone(),
            notes: self.notes.clone(),
        }
    }

    /// Secret-bearing view returned by credential fetches.
    pub fn credential(&self) -> Credential {
        Credential {
            username: self.username.clone(),
            password: self.password.clone(),
            url: self.url.clone(),
        }
    }
}

impl fmt::Debug for VaultEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultEntry")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("url", &self.url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_omits_password() {
        let entry = VaultEntry::new("Example", "alice", "s3cret", "https://example.com")
            .with_notes("work account");
        let summary = entry.summary();

        assert_eq!(summary.id, entry.id);
        assert_eq!(summary.notes, "work account");
        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains("s3cret"));
    }

    #[test]
    fn test_credential_carries_password() {
        let entry = VaultEntry::new("Example", "alice", "s3cret", "https://example.com");
        let credential = entry.credential();

        assert_eq!(credential.username, "alice");
        assert_eq!(credential.password, "s3cret");
        assert_eq!(credential.url, "https://example.com");
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let id = EntryId::new();
        let json = format!(r#"{{"id":"{}","title":"Bare"}}"#, id);
        let entry: VaultEntry = serde_json::from_str(&json).unwrap();

        assert_eq!(entry.id, id);
        assert!(entry.url.is_empty());
        assert!(entry.password.is_empty());
    }
}
