//! Content fingerprints of the vault file.

use std::path::Path;
use std::time::Instant;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use keebridge_common::{Error, Result};
use keebridge_crypto::{ContentDigest, ContentHasher, DEFAULT_CHUNK_SIZE};

/// Hash of the vault file at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    digest: ContentDigest,
    checked_at: Instant,
}

impl Fingerprint {
    /// Create from a precomputed digest.
    pub fn new(digest: ContentDigest, checked_at: Instant) -> Self {
        Self { digest, checked_at }
    }

    /// Fingerprint the file at `path`.
    ///
    /// # Errors
    /// - `NotFound` if the file does not exist
    /// - `Io` on any other read failure
    pub async fn compute(path: &Path, now: Instant) -> Result<Self> {
        Ok(Self::new(hash_file(path).await?, now))
    }

    /// The content digest.
    pub fn digest(&self) -> &ContentDigest {
        &self.digest
    }

    /// When the file was hashed.
    pub fn checked_at(&self) -> Instant {
        self.checked_at
    }

    /// Whether both fingerprints describe the same bytes.
    pub fn same_content(&self, other: &Fingerprint) -> bool {
        self.digest == other.digest
    }
}

/// Hash a file in fixed-size chunks.
///
/// Memory use is bounded by [`DEFAULT_CHUNK_SIZE`] whatever the file size.
pub async fn hash_file(path: &Path) -> Result<ContentDigest> {
    let mut file = File::open(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound(format!("Database file not found: {}", path.display()))
        } else {
            Error::Io(e)
        }
    })?;

    let mut hasher = ContentHasher::new();
    let mut buf = vec![0u8; DEFAULT_CHUNK_SIZE];
    loop {
        let read = file.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }

    Ok(hasher.finalize())
}
