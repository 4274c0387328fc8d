//! Vault key derivation.
//!
//! The input is always [`CompositeKey`](crate::CompositeKey) material, the
//! hashed password followed by the hashed key file, never raw password
//! bytes. Parameters are stored in each vault envelope, so a vault keeps
//! opening with the cost it was created with; the service pays that cost on
//! every unlock and on every reload after an external edit.

use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};

use crate::keys::{MasterKey, Salt, KEY_LENGTH};
use keebridge_common::{Error, Result};

/// Argon2id cost, recorded in the vault envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB (e.g., 65536 = 64 MiB).
    pub memory_cost: u32,
    /// Number of iterations.
    pub time_cost: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl KdfParams {
    /// Strongest preset, and the [`Default`].
    pub fn interactive() -> Self {
        Self {
            memory_cost: 65536, // 64 MiB
            time_cost: 3,
            parallelism: 4,
        }
    }

    /// Half the memory cost, for cheaper reloads of vaults edited often.
    ///
    /// Used by `keebridge init` unless another strength is asked for.
    pub fn moderate() -> Self {
        Self {
            memory_cost: 32768, // 32 MiB
            time_cost: 3,
            parallelism: 2,
        }
    }

    /// Smallest parameters Argon2 accepts.
    ///
    /// Only meant for tests and throwaway vaults.
    pub fn minimal() -> Self {
        Self {
            memory_cost: 8,
            time_cost: 1,
            parallelism: 1,
        }
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::interactive()
    }
}

/// Derive the vault key from composite key material and the envelope's salt.
///
/// Deterministic for the same inputs, which is what lets a reload reopen
/// the file with the stored credentials.
///
/// # Errors
/// - `InvalidInput` if `material` is empty
/// - `Crypto` if the parameters are rejected by Argon2
pub fn derive_key(material: &[u8], salt: &Salt, params: &KdfParams) -> Result<MasterKey> {
    if material.is_empty() {
        return Err(Error::InvalidInput("Key material cannot be empty".to_string()));
    }

    let argon2_params = Params::new(
        params.memory_cost,
        params.time_cost,
        params.parallelism,
        Some(KEY_LENGTH),
    )
    .map_err(|e| Error::Crypto(format!("Invalid KDF parameters: {}", e)))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key_bytes = [0u8; KEY_LENGTH];
    argon2
        .hash_password_into(material, salt.as_bytes(), &mut key_bytes)
        .map_err(|e| Error::Crypto(format!("Key derivation failed: {}", e)))?;

    Ok(MasterKey::from_bytes(key_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_key_deterministic() {
        let salt = Salt::from_bytes([42u8; 32]);
        let params = KdfParams::minimal();

        let key1 = derive_key(b"test-password-123", &salt, &params).unwrap();
        let key2 = derive_key(b"test-password-123", &salt, &params).unwrap();

        assert_eq!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_derive_key_different_salt() {
        let params = KdfParams::minimal();

        let key1 = derive_key(b"pw", &Salt::from_bytes([1u8; 32]), &params).unwrap();
        let key2 = derive_key(b"pw", &Salt::from_bytes([2u8; 32]), &params).unwrap();

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_derive_key_empty_material_fails() {
        let salt = Salt::generate();
        assert!(derive_key(b"", &salt, &KdfParams::minimal()).is_err());
    }

    #[test]
    fn test_invalid_params_rejected() {
        let salt = Salt::generate();
        let params = KdfParams {
            memory_cost: 1,
            time_cost: 0,
            parallelism: 1,
        };

        let err = derive_key(b"pw", &salt, &params).unwrap_err();
        assert!(matches!(err, Error::Crypto(_)));
    }
}
