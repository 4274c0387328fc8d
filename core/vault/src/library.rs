//! The vault-library contract consumed by the session layer.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::entry::VaultEntry;
use keebridge_common::{EntryId, Result};

/// An opened, decrypted vault.
///
/// Handles are immutable. A reload produces a new handle rather than
/// mutating an existing one, so a reader holding an `Arc` keeps a consistent
/// view for as long as it needs it.
pub trait VaultHandle: Send + Sync {
    /// All entries in vault order.
    fn entries(&self) -> &[VaultEntry];

    /// Look up an entry by identifier.
    fn find_by_id(&self, id: &EntryId) -> Option<&VaultEntry>;
}

/// Opens vault files.
#[async_trait]
pub trait VaultLibrary: Send + Sync {
    /// Open and decrypt the vault at `path`.
    ///
    /// # Errors
    /// - `NotFound` if the vault file or key file does not exist
    /// - `Auth` if the credentials are wrong or the container is unreadable
    async fn open(
        &self,
        path: &Path,
        password: &str,
        keyfile: Option<&Path>,
    ) -> Result<Arc<dyn VaultHandle>>;
}
