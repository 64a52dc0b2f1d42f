//! Schedule store with modification-time change detection.
//!
//! The schedule file is owned by an external editor process. The store stats
//! it every tick and only re-reads and re-parses it when the modification time
//! differs from the last successfully loaded one.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, info, warn};

use crate::domain::{ScheduleDocument, ScheduleSet};
use crate::utils::fs;
use crate::utils::json::{self, JsonContext};

/// What a call to [`ScheduleStore::reload_if_changed`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// Fingerprint unchanged, or the file is absent; cached set kept.
    Unchanged,
    /// The file changed and was parsed into a new set.
    Reloaded,
    /// The file changed but could not be read or was not valid JSON
    /// (likely caught mid-write). Cached set kept; retried next call.
    Retained,
}

/// Holds the validated schedule and the fingerprint it was loaded from.
#[derive(Debug)]
pub struct ScheduleStore {
    path: PathBuf,
    default_display_secs: u32,
    fingerprint: Option<SystemTime>,
    /// Modification time of the last file that failed to parse.
    rejected: Option<SystemTime>,
    schedule: ScheduleSet,
}

impl ScheduleStore {
    pub fn new(path: impl Into<PathBuf>, default_display_secs: u32) -> Self {
        Self {
            path: path.into(),
            default_display_secs,
            fingerprint: None,
            rejected: None,
            schedule: ScheduleSet::empty(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The current schedule, reloading it first if the file changed.
    pub async fn load(&mut self) -> &ScheduleSet {
        self.reload_if_changed().await;
        &self.schedule
    }

    /// The cached schedule without touching the filesystem.
    pub fn current(&self) -> &ScheduleSet {
        &self.schedule
    }

    /// Modification time of the last successfully loaded file.
    pub fn fingerprint(&self) -> Option<SystemTime> {
        self.fingerprint
    }

    pub async fn reload_if_changed(&mut self) -> StoreOutcome {
        let mtime = match fs::modified_time(&self.path).await {
            Ok(Some(mtime)) => mtime,
            Ok(None) => return StoreOutcome::Unchanged,
            Err(e) => {
                warn!(error = %e, "Cannot stat schedule file, keeping cached schedule");
                return StoreOutcome::Retained;
            }
        };

        if self.fingerprint == Some(mtime) {
            return StoreOutcome::Unchanged;
        }

        let raw = match fs::read_to_string_optional(&self.path).await {
            Ok(Some(raw)) => raw,
            // Removed between stat and read.
            Ok(None) => return StoreOutcome::Unchanged,
            Err(e) => {
                warn!(error = %e, "Cannot read schedule file, keeping cached schedule");
                return StoreOutcome::Retained;
            }
        };

        // Re-read on every tick until it parses, but warn once per mtime.
        let parsed = if self.rejected == Some(mtime) {
            serde_json::from_str::<serde_json::Value>(&raw)
                .inspect_err(|e| debug!(error = %e, "Schedule file still not valid JSON"))
                .ok()
        } else {
            json::parse_optional::<serde_json::Value>(
                &raw,
                JsonContext::Schedule { path: &self.path },
                "Schedule file is not valid JSON, keeping cached schedule",
            )
        };
        let Some(value) = parsed else {
            self.rejected = Some(mtime);
            return StoreOutcome::Retained;
        };
        self.rejected = None;

        let document = match serde_json::from_value::<ScheduleDocument>(value) {
            Ok(document) => document,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Schedule file is not a schedule document, using an empty schedule"
                );
                ScheduleDocument::default()
            }
        };

        self.schedule = ScheduleSet::from_document(document, self.default_display_secs);
        self.fingerprint = Some(mtime);

        info!(
            path = %self.path.display(),
            entries = self.schedule.len(),
            last_updated = self.schedule.last_updated().unwrap_or("-"),
            "Schedule loaded"
        );
        debug!(fingerprint = ?mtime, "Schedule fingerprint updated");

        StoreOutcome::Reloaded
    }
}
