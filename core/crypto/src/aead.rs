//! Sealing of the vault payload.
//!
//! The serialized entry list is encrypted under the key derived from the
//! composite key. A failed [`decrypt`] is how a wrong password or key file
//! shows up; the vault layer reports it as an authentication error.
//!
//! Every save draws a random 24-byte nonce, so rewriting the same vault
//! never needs counter state.

use chacha20poly1305::{
    aead::{generic_array::GenericArray, Aead, AeadCore, KeyInit, OsRng},
    XChaCha20Poly1305,
};

use crate::keys::KEY_LENGTH;
use keebridge_common::{Error, Result};

/// Random nonce prepended to every sealed payload.
pub const NONCE_SIZE: usize = 24;

/// Poly1305 tag appended to every sealed payload.
pub const TAG_SIZE: usize = 16;

fn check_key(key: &[u8]) -> Result<()> {
    if key.len() != KEY_LENGTH {
        return Err(Error::Crypto(format!(
            "Invalid key length: expected {}, got {}",
            KEY_LENGTH,
            key.len()
        )));
    }
    Ok(())
}

/// Seal a serialized payload under a derived vault key.
///
/// The output is `nonce || ciphertext || tag` and is stored base64-encoded
/// in the vault envelope.
///
/// # Errors
/// - `Crypto` if the key is not [`KEY_LENGTH`] bytes
pub fn encrypt(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    check_key(key)?;

    let cipher = XChaCha20Poly1305::new(GenericArray::from_slice(key));
    let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| Error::Crypto(format!("Encryption failed: {}", e)))?;

    let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    result.extend_from_slice(&nonce);
    result.extend_from_slice(&ciphertext);

    Ok(result)
}

/// Open a payload produced by [`encrypt`].
///
/// # Errors
/// - `Crypto` if the key length is wrong or the input is shorter than a nonce and tag
/// - `Crypto` if the tag does not verify, meaning the credentials are wrong
///   or the file was altered
pub fn decrypt(key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    check_key(key)?;

    if ciphertext.len() < NONCE_SIZE + TAG_SIZE {
        return Err(Error::Crypto("Ciphertext too short".to_string()));
    }

    let (nonce_bytes, encrypted) = ciphertext.split_at(NONCE_SIZE);
    let nonce = GenericArray::from_slice(nonce_bytes);

    let cipher = XChaCha20Poly1305::new(GenericArray::from_slice(key));

    cipher
        .decrypt(nonce, encrypted)
        .map_err(|e| Error::Crypto(format!("Decryption failed: {}", e)))
}
