//! Unlock, lock and reload under one exclusive lock.
//!
//! [`ReloadCoordinator`] owns the [`VaultState`] mutex. Every transition of
//! the session (unlock, lock, change-triggered reload, forced reload) happens
//! while holding it, and each transition updates the session, the detector
//! baseline and the cache together before the guard is released.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

use crate::cache::SearchCache;
use crate::clock::Clock;
use crate::detector::ChangeDetector;
use crate::fingerprint::Fingerprint;
use crate::session::{Credentials, SessionState, SessionStatus, VaultSession};
use keebridge_common::{Error, Result};
use keebridge_vault::{VaultHandle, VaultLibrary};

/// Everything guarded by the reload lock.
pub struct VaultState {
    pub session: SessionState,
    pub detector: ChangeDetector,
    pub cache: SearchCache,
}

/// Why a reload ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadReason {
    /// The file fingerprint moved.
    ChangeDetected,
    /// A client asked for it.
    Forced,
    /// The previous reload failed.
    Retry,
}

impl fmt::Display for ReloadReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReloadReason::ChangeDetected => write!(f, "file changed"),
            ReloadReason::Forced => write!(f, "forced"),
            ReloadReason::Retry => write!(f, "retry after failure"),
        }
    }
}

/// Serializes every session transition.
pub struct ReloadCoordinator {
    library: Arc<dyn VaultLibrary>,
    clock: Arc<dyn Clock>,
    state: Mutex<VaultState>,
}

impl ReloadCoordinator {
    /// Create a coordinator with a locked session.
    pub fn new(
        library: Arc<dyn VaultLibrary>,
        clock: Arc<dyn Clock>,
        detector: ChangeDetector,
        cache: SearchCache,
    ) -> Self {
        Self {
            library,
            clock,
            state: Mutex::new(VaultState {
                session: SessionState::new(),
                detector,
                cache,
            }),
        }
    }

    /// The clock shared with the service.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Acquire the exclusive lock.
    pub async fn lock_state(&self) -> MutexGuard<'_, VaultState> {
        self.state.lock().await
    }

    /// Fingerprint taken before opening, so an edit racing the open is seen
    /// as a change on the next poll rather than silently absorbed.
    async fn fingerprint_before_open(&self, path: &Path) -> Option<Fingerprint> {
        match Fingerprint::compute(path, self.clock.now()).await {
            Ok(fingerprint) => Some(fingerprint),
            Err(e) => {
                warn!("Failed to fingerprint {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Open the vault and make it the live session.
    ///
    /// # Postconditions
    /// - On success the new handle, credentials and fingerprint are installed
    ///   and the cache is empty
    /// - On failure the previous session, if any, is untouched
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
        let mut state = self.lock_state().await;

        let baseline = self.fingerprint_before_open(&path).await;
        let handle = self
            .library
            .open(&path, password, keyfile.as_deref())
            .await?;

        let entry_count = handle.entries().len();
        let credentials = Credentials::new(password, keyfile);
        state
            .session
            .install(VaultSession::new(path.clone(), credentials, handle));
        state.detector.reset();
        state.detector.set_baseline(baseline);
        state.cache.clear();

        info!("Database unlocked: {} ({} entries)", path.display(), entry_count);
        Ok(())
    }

    /// Close the session, erasing credentials before the lock is released.
    ///
    /// This is the only way a session that failed to reload loses its
    /// credentials.
    pub async fn lock(&self) {
        let mut state = self.lock_state().await;
        let was_unlocked = state.session.is_unlocked() || state.session.is_failed();

        state.session.clear();
        state.detector.reset();
        state.cache.clear();

        if was_unlocked {
            info!("Database locked");
        }
    }

    /// Whether a session is open.
    pub async fn is_unlocked(&self) -> bool {
        self.lock_state().await.session.is_unlocked()
    }

    /// Status snapshot.
    pub async fn status(&self) -> SessionStatus {
        self.lock_state().await.session.status()
    }

    /// Reload unconditionally.
    ///
    /// Also recovers a session whose previous reload failed.
    ///
    /// # Errors
    /// - `Locked` if no session is open
    /// - `ReloadFailure` if the vault could not be reopened
    pub async fn force_reload(&self) -> Result<()> {
        let mut state = self.lock_state().await;
        self.reload(&mut state, ReloadReason::Forced).await?;
        Ok(())
    }

    /// Access gate plus change check, run with the lock held.
    ///
    /// Returns the handle the caller should read from: the current one, or a
    /// freshly reopened one if the file changed. After a failed reload the
    /// open is attempted again once per polling interval; in between the
    /// session reads as locked.
    ///
    /// # Errors
    /// - `Locked` if no session is open, or a failed one is not yet due a retry
    /// - `ReloadFailure` if a detected change or a retry could not be loaded
    pub async fn refresh(&self, state: &mut VaultState) -> Result<Arc<dyn VaultHandle>> {
        let now = self.clock.now();

        if state.session.is_failed() {
            if state.detector.should_poll(now) {
                return self.reload(state, ReloadReason::Retry).await;
            }
            return Err(Error::Locked);
        }

        let path = state.session.session()?.path().to_path_buf();
        if state.detector.poll(&path, now).await {
            return self.reload(state, ReloadReason::ChangeDetected).await;
        }

        Ok(state.session.session()?.handle())
    }

    /// Reopen the vault with the stored credentials, with the lock held.
    ///
    /// Success swaps the handle, moves the baseline and clears the cache as
    /// one step. Failure drops the handle instead of keeping the old one; the
    /// credentials stay for the next attempt.
    pub async fn reload(
        &self,
        state: &mut VaultState,
        reason: ReloadReason,
    ) -> Result<Arc<dyn VaultHandle>> {
        let (path, credentials) = state.session.reload_target()?;

        debug!("Reloading {} ({})", path.display(), reason);
        let baseline = self.fingerprint_before_open(&path).await;

        match self
            .library
            .open(&path, credentials.password(), credentials.keyfile())
            .await
        {
            Ok(handle) => {
                state.session.restore(Arc::clone(&handle))?;
                state.detector.set_baseline(baseline);
                state.cache.clear();
                info!(
                    "Database reloaded ({}): {} entries",
                    reason,
                    handle.entries().len()
                );
                Ok(handle)
            }
            Err(e) => {
                let message = format!("Failed to reload database: {}", e);
                error!("{}", message);
                state.session.mark_failed(message);
                state.detector.restart(self.clock.now());
                state.cache.clear();
                Err(Error::ReloadFailure(e.to_string()))
            }
        }
    }
}
