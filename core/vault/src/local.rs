//! Local filesystem vault library.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::debug;
use zeroize::Zeroizing;

use crate::entry::VaultEntry;
use crate::format::VaultEnvelope;
use crate::library::{VaultHandle, VaultLibrary};
use keebridge_common::{EntryId, Error, Result};
use keebridge_crypto::CompositeKey;

/// A decrypted vault held in memory.
pub struct Database {
    entries: Vec<VaultEntry>,
}

impl Database {
    /// Wrap a decrypted entry list.
    pub fn new(entries: Vec<VaultEntry>) -> Self {
        Self { entries }
    }
}

impl VaultHandle for Database {
    fn entries(&self) -> &[VaultEntry] {
        &self.entries
    }

    fn find_by_id(&self, id: &EntryId) -> Option<&VaultEntry> {
        self.entries.iter().find(|entry| entry.id == *id)
    }
}

/// Opens vault files from the local disk.
///
/// Key derivation runs on the blocking pool so an unlock never stalls the
/// async workers serving other requests.
#[derive(Debug, Default, Clone)]
pub struct LocalLibrary;

impl LocalLibrary {
    /// Create a new local library.
    pub fn new() -> Self {
        Self
    }
}

/// Read a key file, keeping its contents in zeroizing memory.
pub(crate) async fn read_keyfile(path: &Path) -> Result<Zeroizing<Vec<u8>>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Zeroizing::new(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::NotFound(format!(
            "Key file not found: {}",
            path.display()
        ))),
        Err(e) => Err(e.into()),
    }
}

/// Build the composite key for a password and optional key file.
pub(crate) async fn composite_key(password: &str, keyfile: Option<&Path>) -> Result<CompositeKey> {
    let keyfile_bytes = match keyfile {
        Some(path) => Some(read_keyfile(path).await?),
        None => None,
    };
    Ok(CompositeKey::new(
        password.as_bytes(),
        keyfile_bytes.as_ref().map(|bytes| bytes.as_slice()),
    ))
}

#[async_trait]
impl VaultLibrary for LocalLibrary {
    async fn open(
        &self,
        path: &Path,
        password: &str,
        keyfile: Option<&Path>,
    ) -> Result<Arc<dyn VaultHandle>> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound(format!(
                    "Database file not found: {}",
                    path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let key = composite_key(password, keyfile).await?;

        let entries = tokio::task::spawn_blocking(move || {
            VaultEnvelope::from_bytes(&bytes)?.unseal(&key)
        })
        .await
        .map_err(|e| Error::Crypto(format!("Vault decryption task failed: {}", e)))??;

        debug!("Opened vault {} ({} entries)", path.display(), entries.len());

        Ok(Arc::new(Database::new(entries)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::VaultWriter;
    use keebridge_crypto::KdfParams;
    use tempfile::TempDir;

    async fn write_vault(dir: &TempDir, keyfile: Option<&Path>) -> (std::path::PathBuf, EntryId) {
        let path = dir.path().join("test.kbv");
        let entry = VaultEntry::new("Example", "alice", "s3cret", "https://example.com");
        let id = entry.id;

        VaultWriter::new(KdfParams::minimal())
            .save(&path, "master", keyfile, &[entry])
            .await
            .unwrap();

        (path, id)
    }

    #[tokio::test]
    async fn test_open_and_find() {
        let dir = TempDir::new().unwrap();
        let (path, id) = write_vault(&dir, None).await;

        let handle = LocalLibrary::new().open(&path, "master", None).await.unwrap();

        assert_eq!(handle.entries().len(), 1);
        let entry = handle.find_by_id(&id).unwrap();
        assert_eq!(entry.password, "s3cret");
        assert!(handle.find_by_id(&EntryId::new()).is_none());
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let result = LocalLibrary::new()
            .open(&dir.path().join("absent.kbv"), "master", None)
            .await;

        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_wrong_password_is_auth() {
        let dir = TempDir::new().unwrap();
        let (path, _) = write_vault(&dir, None).await;

        let result = LocalLibrary::new().open(&path, "wrong", None).await;
        assert!(matches!(result, Err(Error::Auth(_))));
    }

    #[tokio::test]
    async fn test_keyfile_required_when_used() {
        let dir = TempDir::new().unwrap();
        let keyfile = dir.path().join("vault.key");
        fs::write(&keyfile, b"random key bytes").await.unwrap();
        let (path, _) = write_vault(&dir, Some(&keyfile)).await;

        let library = LocalLibrary::new();
        assert!(library.open(&path, "master", Some(&keyfile)).await.is_ok());
        assert!(matches!(
            library.open(&path, "master", None).await,
            Err(Error::Auth(_))
        ));
        assert!(matches!(
            library
                .open(&path, "master", Some(&dir.path().join("missing.key")))
                .await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_auth() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.kbv");
        fs::write(&path, b"\x00\x01garbage").await.unwrap();

        let result = LocalLibrary::new().open(&path, "master", None).await;
        assert!(matches!(result, Err(Error::Auth(_))));
    }
}
