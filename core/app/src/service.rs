//! The operations the request layer calls.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::cache::{normalize_domain, SearchCache};
use crate::clock::{Clock, SystemClock};
use crate::config::ServiceConfig;
use crate::detector::ChangeDetector;
use crate::reload::ReloadCoordinator;
use crate::session::SessionStatus;
use keebridge_common::{Credential, EntryId, EntrySummary, Error, Result};
use keebridge_vault::{VaultEntry, VaultLibrary};

/// Composition root for the lookup service.
///
/// Owns all mutable state through its [`ReloadCoordinator`]; there are no
/// process-wide globals. Share it behind an `Arc` between request workers.
pub struct VaultService {
    coordinator: ReloadCoordinator,
    config: ServiceConfig,
}

impl VaultService {
    /// Create a service using the system clock.
    pub fn new(library: Arc<dyn VaultLibrary>, config: ServiceConfig) -> Self {
        Self::with_clock(library, config, Arc::new(SystemClock))
    }

    /// Create a service with an explicit clock.
    pub fn with_clock(
        library: Arc<dyn VaultLibrary>,
        config: ServiceConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let detector = ChangeDetector::new(config.poll_interval());
        let cache = SearchCache::from_config(&config);
        Self {
            coordinator: ReloadCoordinator::new(library, clock, detector, cache),
            config,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Open the vault at `path`.
    ///
    /// # Errors
    /// - `NotFound` if the vault or key file is missing
    /// - `Auth` on bad credentials or an unreadable container
    pub async fn unlock(
        &self,
        path: PathBuf,
        password: &str,
        keyfile: Option<PathBuf>,
    ) -> Result<()> {
        self.coordinator.unlock(path, password, keyfile).await
    }

    /// Close the session.
    pub async fn lock(&self) {
        self.coordinator.lock().await
    }

    /// Whether a vault is open.
    pub async fn is_unlocked(&self) -> bool {
        self.coordinator.is_unlocked().await
    }

    /// Lock status for clients.
    pub async fn status(&self) -> SessionStatus {
        self.coordinator.status().await
    }

    /// Entries whose URL or title contains the domain of `url`.
    ///
    /// The change check and the cache lookup happen under the reload lock.
    /// On a miss the scan runs against a handle snapshot outside the lock,
    /// and its result is only cached if no reload or lock happened meanwhile.
    ///
    /// # Errors
    /// - `InvalidInput` if `url` normalizes to nothing
    /// - `Locked` if no vault is open, or the last reload failed and the
    ///   retry is not due yet
    /// - `ReloadFailure` if the file changed and could not be reopened
    pub async fn search(&self, url: &str) -> Result<Vec<EntrySummary>> {
        let key = normalize_domain(url);
        if key.is_empty() {
            return Err(Error::InvalidInput("url must not be empty".to_string()));
        }

        let (handle, generation) = {
            let mut state = self.coordinator.lock_state().await;
            let handle = self.coordinator.refresh(&mut state).await?;

            let now = self.coordinator.clock().now();
            if let Some(hit) = state.cache.get(&key, now) {
                debug!("Search cache hit for {}", key);
                return Ok(hit);
            }
            (handle, state.cache.generation())
        };

        let results: Vec<EntrySummary> = handle
            .entries()
            .iter()
            .filter(|entry| matches_domain(entry, &key))
            .map(VaultEntry::summary)
            .collect();

        let mut state = self.coordinator.lock_state().await;
        let now = self.coordinator.clock().now();
        if !state
            .cache
            .insert_if_current(generation, key, results.clone(), now)
        {
            debug!("Vault changed during search; result not cached");
        }

        Ok(results)
    }

    /// Username, password and URL of one entry. Never cached.
    ///
    /// # Errors
    /// - `Locked` if no vault is open
    /// - `ReloadFailure` if the file changed and could not be reopened
    /// - `InvalidInput` if `id` is not a valid identifier
    /// - `NotFound` if no entry has that identifier
    pub async fn fetch_credential(&self, id: &str) -> Result<Credential> {
        let handle = {
            let mut state = self.coordinator.lock_state().await;
            self.coordinator.refresh(&mut state).await?
        };

        let id = EntryId::parse(id)?;
        handle
            .find_by_id(&id)
            .map(VaultEntry::credential)
            .ok_or_else(|| Error::NotFound("Entry not found".to_string()))
    }

    /// Reopen the vault now, regardless of the polling window.
    ///
    /// # Errors
    /// - `Locked` if no vault is open
    /// - `ReloadFailure` if the vault could not be reopened
    pub async fn force_reload(&self) -> Result<()> {
        self.coordinator.force_reload().await
    }
}

fn matches_domain(entry: &VaultEntry, domain: &str) -> bool {
    entry.url.to_lowercase().contains(domain) || entry.title.to_lowercase().contains(domain)
}
