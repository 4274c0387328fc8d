//! Rate-limited detection of external edits to the vault file.

use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::fingerprint::Fingerprint;

/// Decides when to re-hash the vault file and whether its content moved.
///
/// The detector holds no lock of its own. It lives inside the state guarded
/// by the reload lock, so the last-checked timestamp is advanced by exactly
/// one poller at a time.
#[derive(Debug)]
pub struct ChangeDetector {
    interval: Duration,
    last_checked: Option<Instant>,
    baseline: Option<Fingerprint>,
}

impl ChangeDetector {
    /// Create a detector that polls at most once per `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_checked: None,
            baseline: None,
        }
    }

    /// Last known fingerprint, if any.
    pub fn baseline(&self) -> Option<&Fingerprint> {
        self.baseline.as_ref()
    }

    /// Replace the last known fingerprint.
    pub fn set_baseline(&mut self, fingerprint: Option<Fingerprint>) {
        self.baseline = fingerprint;
    }

    /// Forget both the baseline and the rate-limit window.
    pub fn reset(&mut self) {
        self.last_checked = None;
        self.baseline = None;
    }

    /// Forget the baseline and open a fresh window starting at `now`.
    ///
    /// Used after a failed reload: the next attempt waits one full interval.
    pub fn restart(&mut self, now: Instant) {
        self.baseline = None;
        self.last_checked = Some(now);
    }

    /// Returns true at most once per interval, and records the poll.
    pub fn should_poll(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_checked {
            if now.saturating_duration_since(last) < self.interval {
                return false;
            }
        }
        self.last_checked = Some(now);
        true
    }

    /// Fingerprint the file and compare with the baseline.
    ///
    /// The first observation only records a baseline. A file that cannot be
    /// read (mid-replace, briefly missing) counts as unchanged; the next poll
    /// tries again.
    pub async fn has_changed(&mut self, path: &Path, now: Instant) -> bool {
        let current = match Fingerprint::compute(path, now).await {
            Ok(fingerprint) => fingerprint,
            Err(e) => {
                warn!("Failed to fingerprint {}: {}", path.display(), e);
                return false;
            }
        };

        match self.baseline.replace(current) {
            None => false,
            Some(previous) if previous.same_content(&current) => false,
            Some(_) => {
                debug!("File change detected: {}", path.display());
                true
            }
        }
    }

    /// `should_poll` followed by `has_changed` when the window is open.
    pub async fn poll(&mut self, path: &Path, now: Instant) -> bool {
        if !self.should_poll(now) {
            return false;
        }
        self.has_changed(path, now).await
    }
}
