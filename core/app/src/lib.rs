//! Application core for KeeBridge.
//!
//! This crate owns the single in-memory copy of the decrypted vault and
//! everything that keeps it consistent with the file on disk:
//! - [`ChangeDetector`]: rate-limited content fingerprinting of the vault file
//! - [`SessionState`]: the live handle, its credentials and lock status
//! - [`ReloadCoordinator`]: unlock/lock/reload under one exclusive lock
//! - [`SearchCache`]: TTL and capacity bounded search results
//! - [`VaultService`]: the operations exposed to the request layer
//!
//! # Concurrency
//! There is no background task. Change detection runs when a request
//! arrives, inside the same lock that guards reloads, so a request that
//! starts after a reload commits always sees the new handle and an empty
//! cache.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod detector;
pub mod fingerprint;
pub mod reload;
pub mod service;
pub mod session;

pub use api::Envelope;
pub use cache::{normalize_domain, SearchCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{expand_home, ServiceConfig};
pub use detector::ChangeDetector;
pub use fingerprint::Fingerprint;
pub use reload::{ReloadCoordinator, ReloadReason, VaultState};
pub use service::VaultService;
pub use session::{Credentials, SessionState, SessionStatus, VaultSession};
