//! Vault library for KeeBridge.
//!
//! This module provides:
//! - The [`VaultLibrary`] / [`VaultHandle`] contract the session layer consumes
//! - [`LocalLibrary`], which opens encrypted vault files from the local disk
//! - [`VaultWriter`], which creates and rewrites vault files atomically
//!
//! # Architecture
//! The session layer only ever sees the traits. Everything about the on-disk
//! container (envelope, key derivation, payload encoding) stays in this crate.

pub mod entry;
pub mod format;
pub mod library;
pub mod local;
pub mod writer;

pub use entry::VaultEntry;
pub use format::{VaultEnvelope, VaultVersion, FORMAT_TAG};
pub use library::{VaultHandle, VaultLibrary};
pub use local::{Database, LocalLibrary};
pub use writer::VaultWriter;
