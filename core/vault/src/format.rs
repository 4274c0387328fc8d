//! On-disk vault container.
//!
//! A vault file is a JSON envelope holding everything needed to derive the
//! key (salt, KDF parameters) plus the encrypted entry list as base64.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::entry::VaultEntry;
use keebridge_common::{Error, Result};
use keebridge_crypto::{decrypt, derive_key, encrypt, CompositeKey, KdfParams, Salt};

/// Format tag written into every envelope.
pub const FORMAT_TAG: &str = "keebridge-vault";

/// Vault format version for migration support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultVersion {
    pub major: u32,
    pub minor: u32,
}

impl VaultVersion {
    /// Current vault format version.
    pub const CURRENT: Self = Self { major: 1, minor: 0 };

    /// Check if this version is compatible with the current version.
    pub fn is_compatible(&self) -> bool {
        self.major == Self::CURRENT.major
    }
}

impl Default for VaultVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

#[derive(Serialize, Deserialize)]
struct Payload {
    entries: Vec<VaultEntry>,
}

/// Encrypted vault envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultEnvelope {
    /// Always [`FORMAT_TAG`].
    pub format: String,
    /// Vault format version.
    pub version: VaultVersion,
    /// Salt for key derivation.
    pub salt: Salt,
    /// KDF parameters.
    pub kdf_params: KdfParams,
    /// When this envelope was sealed.
    pub saved_at: DateTime<Utc>,
    /// Base64 of nonce || ciphertext || tag.
    pub payload: String,
}

impl VaultEnvelope {
    /// Encrypt `entries` under `key` with a fresh salt.
    ///
    /// # Errors
    /// - KDF failure
    /// - Encryption failure
    pub fn seal(entries: &[VaultEntry], key: &CompositeKey, kdf_params: KdfParams) -> Result<Self> {
        let salt = Salt::generate();
        let master_key = derive_key(key.as_bytes(), &salt, &kdf_params)?;

        let plaintext = Zeroizing::new(
            serde_json::to_vec(&PayloadRef { entries })
                .map_err(|e| Error::Serialization(e.to_string()))?,
        );
        let ciphertext = encrypt(master_key.as_bytes(), &plaintext)?;

        Ok(Self {
            format: FORMAT_TAG.to_string(),
            version: VaultVersion::CURRENT,
            salt,
            kdf_params,
            saved_at: Utc::now(),
            payload: BASE64.encode(ciphertext),
        })
    }

    /// Decrypt the entry list.
    ///
    /// Every failure is reported as `Auth`: from the caller's point of view a
    /// wrong password and a damaged container are indistinguishable.
    pub fn unseal(&self, key: &CompositeKey) -> Result<Vec<VaultEntry>> {
        if self.format != FORMAT_TAG {
            return Err(Error::Auth(format!("Unknown container format '{}'", self.format)));
        }

        if !self.version.is_compatible() {
            return Err(Error::Auth(format!(
                "Incompatible vault version: {}.{}",
                self.version.major, self.version.minor
            )));
        }

        let master_key = derive_key(key.as_bytes(), &self.salt, &self.kdf_params)
            .map_err(|e| Error::Auth(format!("Corrupted key parameters: {}", e)))?;

        let ciphertext = BASE64
            .decode(self.payload.as_bytes())
            .map_err(|e| Error::Auth(format!("Corrupted payload encoding: {}", e)))?;

        let plaintext = Zeroizing::new(
            decrypt(master_key.as_bytes(), &ciphertext)
                .map_err(|_| Error::Auth("Invalid credentials or corrupted vault".to_string()))?,
        );

        let payload: Payload = serde_json::from_slice(&plaintext)
            .map_err(|e| Error::Auth(format!("Corrupted payload: {}", e)))?;

        Ok(payload.entries)
    }

    /// Serialize to bytes for storage.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize from bytes.
    ///
    /// Malformed input is an `Auth` error, matching [`unseal`](Self::unseal).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| Error::Auth(format!("Unreadable vault container: {}", e)))
    }
}

#[derive(Serialize)]
struct PayloadRef<'a> {
    entries: &'a [VaultEntry],
}
