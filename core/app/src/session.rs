//! Vault session state.
//!
//! At most one [`VaultSession`] exists per process. It owns the decrypted
//! handle and the credentials needed to reopen the file. A failed reload
//! drops the handle but keeps the credentials for the next attempt; only an
//! explicit lock erases them, and the password is zeroized on drop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zeroize::Zeroizing;

use keebridge_common::{Error, Result};
use keebridge_vault::VaultHandle;

/// Credentials kept so the vault can be reopened after an external edit.
#[derive(Clone)]
pub struct Credentials {
    password: Zeroizing<String>,
    keyfile: Option<PathBuf>,
}

impl Credentials {
    /// Wrap a password and optional key file path.
    pub fn new(password: impl Into<String>, keyfile: Option<PathBuf>) -> Self {
        Self {
            password: Zeroizing::new(password.into()),
            keyfile,
        }
    }

    /// The master password.
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Path of the key file, if one was used.
    pub fn keyfile(&self) -> Option<&Path> {
        self.keyfile.as_deref()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("password", &"[REDACTED]")
            .field("keyfile", &self.keyfile)
            .finish()
    }
}

/// An unlocked vault.
pub struct VaultSession {
    path: PathBuf,
    credentials: Credentials,
    handle: Arc<dyn VaultHandle>,
    reloaded_at: Option<DateTime<Utc>>,
}

impl VaultSession {
    /// Create a session around a freshly opened handle.
    pub fn new(path: PathBuf, credentials: Credentials, handle: Arc<dyn VaultHandle>) -> Self {
        Self {
            path,
            credentials,
            handle,
            reloaded_at: None,
        }
    }

    /// Vault file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored credentials.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Snapshot of the current handle.
    ///
    /// The returned `Arc` stays valid even if a reload swaps the session's
    /// handle afterwards.
    pub fn handle(&self) -> Arc<dyn VaultHandle> {
        Arc::clone(&self.handle)
    }

    /// When the handle was last replaced by a reload.
    pub fn reloaded_at(&self) -> Option<DateTime<Utc>> {
        self.reloaded_at
    }

    /// Swap in a reopened handle.
    pub fn replace_handle(&mut self, handle: Arc<dyn VaultHandle>) {
        self.handle = handle;
        self.reloaded_at = Some(Utc::now());
    }
}

/// Lock status reported to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub locked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// A session whose last reload failed.
///
/// The handle is gone, but path and credentials stay so a later request can
/// try again.
struct FailedSession {
    path: PathBuf,
    credentials: Credentials,
    error: String,
}

#[derive(Default)]
enum Slot {
    #[default]
    Locked,
    Open(VaultSession),
    Failed(FailedSession),
}

/// The process-wide session slot.
#[derive(Default)]
pub struct SessionState {
    slot: Slot,
}

impl SessionState {
    /// Start locked.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a usable session is open.
    pub fn is_unlocked(&self) -> bool {
        matches!(self.slot, Slot::Open(_))
    }

    /// Whether the last reload failed and a retry is pending.
    pub fn is_failed(&self) -> bool {
        matches!(self.slot, Slot::Failed(_))
    }

    /// The open session.
    ///
    /// # Errors
    /// - `Locked` if no usable session is open, including after a failed reload
    pub fn session(&self) -> Result<&VaultSession> {
        match &self.slot {
            Slot::Open(session) => Ok(session),
            _ => Err(Error::Locked),
        }
    }

    /// Path and credentials to reopen the vault with.
    ///
    /// Available both for an open session and for one whose reload failed.
    ///
    /// # Errors
    /// - `Locked` if nothing was unlocked, or the session was locked explicitly
    pub fn reload_target(&self) -> Result<(PathBuf, Credentials)> {
        match &self.slot {
            Slot::Open(session) => Ok((session.path.clone(), session.credentials.clone())),
            Slot::Failed(failed) => Ok((failed.path.clone(), failed.credentials.clone())),
            Slot::Locked => Err(Error::Locked),
        }
    }

    /// Install a new session, dropping any previous one.
    pub fn install(&mut self, session: VaultSession) {
        self.slot = Slot::Open(session);
    }

    /// Put a reopened handle in place, recovering from a failed reload if needed.
    ///
    /// # Errors
    /// - `Locked` if there is no session to restore
    pub fn restore(&mut self, handle: Arc<dyn VaultHandle>) -> Result<()> {
        match std::mem::take(&mut self.slot) {
            Slot::Open(mut session) => {
                session.replace_handle(handle);
                self.slot = Slot::Open(session);
            }
            Slot::Failed(failed) => {
                let mut session = VaultSession::new(failed.path, failed.credentials, handle);
                session.reloaded_at = Some(Utc::now());
                self.slot = Slot::Open(session);
            }
            Slot::Locked => return Err(Error::Locked),
        }
        Ok(())
    }

    /// Drop the session; its credentials are zeroized here.
    pub fn clear(&mut self) {
        self.slot = Slot::Locked;
    }

    /// Drop the handle after a failed reload and remember why.
    ///
    /// Credentials are kept for the next attempt. Does nothing when locked.
    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        let error = reason.into();
        self.slot = match std::mem::take(&mut self.slot) {
            Slot::Open(session) => Slot::Failed(FailedSession {
                path: session.path,
                credentials: session.credentials,
                error,
            }),
            Slot::Failed(failed) => Slot::Failed(FailedSession { error, ..failed }),
            Slot::Locked => Slot::Locked,
        };
    }

    /// Reason the last reload failed, while a retry is pending.
    pub fn last_error(&self) -> Option<&str> {
        match &self.slot {
            Slot::Failed(failed) => Some(failed.error.as_str()),
            _ => None,
        }
    }

    /// Snapshot for the status endpoint.
    pub fn status(&self) -> SessionStatus {
        let db_path = match &self.slot {
            Slot::Open(session) => Some(&session.path),
            Slot::Failed(failed) => Some(&failed.path),
            Slot::Locked => None,
        };
        SessionStatus {
            locked: !self.is_unlocked(),
            db_path: db_path.map(|path| path.display().to_string()),
            last_error: self.last_error().map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keebridge_vault::{Database, VaultEntry};

    fn session() -> VaultSession {
        let handle = Arc::new(Database::new(vec![VaultEntry::new(
            "Example",
            "alice",
            "pw",
            "https://example.com",
        )]));
        VaultSession::new(
            PathBuf::from("/tmp/vault.kbv"),
            Credentials::new("master", None),
            handle,
        )
    }

    #[test]
    fn test_starts_locked() {
        let state = SessionState::new();
        assert!(!state.is_unlocked());
        assert!(matches!(state.session(), Err(Error::Locked)));
        assert!(state.status().locked);
    }

    #[test]
    fn test_install_and_clear() {
        let mut state = SessionState::new();
        state.install(session());
        assert!(state.is_unlocked());
        assert_eq!(state.status().db_path.as_deref(), Some("/tmp/vault.kbv"));

        state.clear();
        assert!(!state.is_unlocked());
        assert!(state.status().db_path.is_none());
    }

    #[test]
    fn test_mark_failed_locks_and_records() {
        let mut state = SessionState::new();
        state.install(session());
        state.mark_failed("Reload failed: bad container");

        let status = state.status();
        assert!(status.locked);
        assert_eq!(status.db_path.as_deref(), Some("/tmp/vault.kbv"));
        assert_eq!(status.last_error.as_deref(), Some("Reload failed: bad container"));
        assert!(matches!(state.session(), Err(Error::Locked)));

        state.install(session());
        assert!(state.last_error().is_none());
    }

    #[test]
    fn test_failed_session_keeps_credentials_until_cleared() {
        let mut state = SessionState::new();
        state.install(session());
        state.mark_failed("first");
        state.mark_failed("second");

        assert!(state.is_failed());
        assert_eq!(state.last_error(), Some("second"));
        let (path, creds) = state.reload_target().unwrap();
        assert_eq!(path, PathBuf::from("/tmp/vault.kbv"));
        assert_eq!(creds.password(), "master");

        state.clear();
        assert!(matches!(state.reload_target(), Err(Error::Locked)));
        assert!(state.status().last_error.is_none());
    }

    #[test]
    fn test_restore_recovers_failed_session() {
        let mut state = SessionState::new();
        state.install(session());
        state.mark_failed("bad container");

        state.restore(Arc::new(Database::new(Vec::new()))).unwrap();
        assert!(state.is_unlocked());
        assert!(state.last_error().is_none());
        assert!(state.session().unwrap().reloaded_at().is_some());
        assert!(state.session().unwrap().handle().entries().is_empty());
    }

    #[test]
    fn test_mark_failed_while_locked_stays_locked() {
        let mut state = SessionState::new();
        state.mark_failed("nothing open");
        assert!(!state.is_failed());
        assert!(state.last_error().is_none());
        assert!(matches!(
            state.restore(Arc::new(Database::new(Vec::new()))),
            Err(Error::Locked)
        ));
    }

    #[test]
    fn test_snapshot_survives_replace() {
        let mut s = session();
        let before = s.handle();
        s.replace_handle(Arc::new(Database::new(Vec::new())));

        assert_eq!(before.entries().len(), 1);
        assert!(s.handle().entries().is_empty());
        assert!(s.reloaded_at().is_some());
    }

    #[test]
    fn test_credentials_debug_redacts() {
        let creds = Credentials::new("hunter2", None);
        assert!(!format!("{:?}", creds).contains("hunter2"));
        assert_eq!(creds.password(), "hunter2");
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let status = SessionStatus {
            locked: false,
            db_path: Some("/v.kbv".to_string()),
            last_error: None,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["locked"], false);
        assert_eq!(json["dbPath"], "/v.kbv");
        assert!(json.get("lastError").is_none());
    }
}
