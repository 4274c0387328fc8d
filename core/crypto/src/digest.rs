//! Streaming BLAKE2b content digests.
//!
//! Used to fingerprint vault files for change detection. Callers feed the
//! hasher in bounded chunks so memory use does not depend on file size.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use std::fmt;

/// Length of a content digest in bytes.
pub const DIGEST_LENGTH: usize = 32;

/// Default read size when streaming a file into the hasher (8 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// A 256-bit BLAKE2b digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; DIGEST_LENGTH]);

impl ContentDigest {
    /// Get the digest bytes.
    pub fn as_bytes(&self) -> &[u8; DIGEST_LENGTH] {
        &self.0
    }

    /// Lower-case hex rendering.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentDigest({})", self.to_hex())
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Incremental BLAKE2b hasher.
#[derive(Clone)]
pub struct ContentHasher {
    inner: Blake2b<U32>,
}

impl ContentHasher {
    /// Start a new digest.
    pub fn new() -> Self {
        Self {
            inner: Blake2b::<U32>::new(),
        }
    }

    /// Feed a chunk.
    pub fn update(&mut self, chunk: &[u8]) {
        self.inner.update(chunk);
    }

    /// Finish and return the digest.
    pub fn finalize(self) -> ContentDigest {
        let mut out = [0u8; DIGEST_LENGTH];
        out.copy_from_slice(&self.inner.finalize());
        ContentDigest(out)
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}
