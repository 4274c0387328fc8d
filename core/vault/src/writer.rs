//! Creating and rewriting vault files.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use crate::entry::VaultEntry;
use crate::format::VaultEnvelope;
use crate::local::composite_key;
use keebridge_common::{Error, Result};
use keebridge_crypto::KdfParams;

/// Writes vault files.
///
/// Saves go through a sibling temp file and a rename, so a concurrent reader
/// sees either the old container or the new one, never a torn write.
#[derive(Debug, Clone, Default)]
pub struct VaultWriter {
    kdf_params: KdfParams,
}

impl VaultWriter {
    /// Create a writer using the given KDF parameters for new envelopes.
    pub fn new(kdf_params: KdfParams) -> Self {
        Self { kdf_params }
    }

    /// Encrypt `entries` and write them to `path`, replacing any existing file.
    ///
    /// # Errors
    /// - Key file not found
    /// - Parent directory missing or not writable
    /// - KDF or encryption failure
    pub async fn save(
        &self,
        path: &Path,
        password: &str,
        keyfile: Option<&Path>,
        entries: &[VaultEntry],
    ) -> Result<()> {
        let key = composite_key(password, keyfile).await?;
        let count = entries.len();
        let entries = entries.to_vec();
        let params = self.kdf_params.clone();

        let envelope = tokio::task::spawn_blocking(move || VaultEnvelope::seal(&entries, &key, params))
            .await
            .map_err(|e| Error::Crypto(format!("Vault encryption task failed: {}", e)))??;

        let bytes = envelope.to_bytes()?;
        let staging = staging_path(path);
        fs::write(&staging, &bytes).await?;
        if let Err(e) = fs::rename(&staging, path).await {
            let _ = fs::remove_file(&staging).await;
            return Err(e.into());
        }

        info!("Saved vault {} ({} entries)", path.display(), count);
        Ok(())
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("vault"));
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::VaultLibrary;
    use crate::local::LocalLibrary;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_replaces_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.kbv");
        let writer = VaultWriter::new(KdfParams::minimal());

        writer
            .save(&path, "pw", None, &[VaultEntry::new("One", "u", "p", "one.test")])
            .await
            .unwrap();
        writer
            .save(
                &path,
                "pw",
                None,
                &[
                    VaultEntry::new("One", "u", "p", "one.test"),
                    VaultEntry::new("Two", "u", "p", "two.test"),
                ],
            )
            .await
            .unwrap();

        let handle = LocalLibrary::new().open(&path, "pw", None).await.unwrap();
        assert_eq!(handle.entries().len(), 2);
        assert!(!staging_path(&path).exists());
    }

    #[tokio::test]
    async fn test_missing_parent_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("vault.kbv");

        let result = VaultWriter::new(KdfParams::minimal())
            .save(&path, "pw", None, &[])
            .await;
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_staging_path_is_sibling() {
        let staging = staging_path(Path::new("/tmp/vaults/main.kbv"));
        assert_eq!(staging, PathBuf::from("/tmp/vaults/main.kbv.tmp"));
    }
}
