//! Key types with secure memory handling.
//!
//! All key types zeroize their memory on drop.

use chacha20poly1305::aead::{rand_core::RngCore, OsRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::digest::{ContentHasher, DIGEST_LENGTH};

/// Length of encryption keys in bytes (256-bit).
pub const KEY_LENGTH: usize = 32;

/// Length of the KDF salt in bytes.
pub const SALT_LENGTH: usize = 32;

/// Vault encryption key derived from the composite key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    key: [u8; KEY_LENGTH],
}

impl MasterKey {
    /// Create a master key from raw bytes.
    pub fn from_bytes(key: [u8; KEY_LENGTH]) -> Self {
        Self { key }
    }

    /// Get the key bytes.
    ///
    /// # Security
    /// The returned slice should be used immediately and not stored.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MasterKey([REDACTED])")
    }
}

/// Key material combining a password and an optional key file.
///
/// Each component is hashed separately with BLAKE2b and the digests are
/// concatenated, so a key file changes the derived key without ever being
/// held in full alongside the password.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct CompositeKey {
    material: Vec<u8>,
}

impl CompositeKey {
    /// Build the composite key.
    pub fn new(password: &[u8], keyfile: Option<&[u8]>) -> Self {
        let mut material = Vec::with_capacity(DIGEST_LENGTH * 2);

        let mut hasher = ContentHasher::new();
        hasher.update(password);
        material.extend_from_slice(hasher.finalize().as_bytes());

        if let Some(contents) = keyfile {
            let mut hasher = ContentHasher::new();
            hasher.update(contents);
            material.extend_from_slice(hasher.finalize().as_bytes());
        }

        Self { material }
    }

    /// Get the combined key material.
    pub fn as_bytes(&self) -> &[u8] {
        &self.material
    }
}

impl fmt::Debug for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompositeKey([REDACTED])")
    }
}

/// Salt for key derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Salt(pub [u8; SALT_LENGTH]);

impl Salt {
    /// Generate a random salt.
    pub fn generate() -> Self {
        let mut salt = [0u8; SALT_LENGTH];
        OsRng.fill_bytes(&mut salt);
        Self(salt)
    }

    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; SALT_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Get the salt bytes.
    pub fn as_bytes(&self) -> &[u8; SALT_LENGTH] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_key_deterministic() {
        let a = CompositeKey::new(b"password", Some(b"keyfile"));
        let b = CompositeKey::new(b"password", Some(b"keyfile"));
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_keyfile_changes_material() {
        let without = CompositeKey::new(b"password", None);
        let with = CompositeKey::new(b"password", Some(b"keyfile"));

        assert_eq!(without.as_bytes().len(), DIGEST_LENGTH);
        assert_eq!(with.as_bytes().len(), DIGEST_LENGTH * 2);
        assert_eq!(&with.as_bytes()[..DIGEST_LENGTH], without.as_bytes());
    }

    #[test]
    fn test_empty_password_still_yields_material() {
        let key = CompositeKey::new(b"", None);
        assert_eq!(key.as_bytes().len(), DIGEST_LENGTH);
    }

    #[test]
    fn test_salt_generate() {
        let salt1 = Salt::generate();
        let salt2 = Salt::generate();

        assert_ne!(salt1.as_bytes(), salt2.as_bytes());
    }

    #[test]
    fn test_debug_redacts() {
        let key = MasterKey::from_bytes([7u8; KEY_LENGTH]);
        assert_eq!(format!("{:?}", key), "MasterKey([REDACTED])");
    }
}
