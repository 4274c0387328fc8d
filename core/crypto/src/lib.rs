//! Cryptographic primitives for KeeBridge.
//!
//! This module provides:
//! - Key derivation using Argon2id
//! - Authenticated encryption using XChaCha20-Poly1305
//! - Composite keys built from a password and an optional key file
//! - Streaming BLAKE2b content digests used to fingerprint vault files
//!
//! # Security Guarantees
//! - All key material is automatically zeroized on drop
//! - No plaintext or key material is ever logged

pub mod aead;
pub mod digest;
pub mod kdf;
pub mod keys;

pub use aead::{decrypt, encrypt};
pub use digest::{ContentDigest, ContentHasher, DEFAULT_CHUNK_SIZE};
pub use kdf::{derive_key, KdfParams};
pub use keys::{CompositeKey, MasterKey, Salt};
