//! Common utilities and types shared across KeeBridge modules.
//!
//! This module provides the error taxonomy and the entry types that cross
//! crate boundaries: the metadata-only [`EntrySummary`] returned by searches
//! and the secret-bearing [`Credential`] returned by credential fetches.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{Credential, EntryId, EntrySummary};
