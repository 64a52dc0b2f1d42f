//! Builds the now/next snapshot and atomically replaces the status file.

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeDelta, Utc};
use tracing::trace;

use crate::Result;
use crate::domain::{CurrentItem, MediaCatalog, NextItem, StatusDocument, StatusSnapshot};
use crate::schedule::Resolution;
use crate::utils::fs;
use crate::utils::json::{self, JsonContext};

/// Assemble the snapshot for one resolution.
///
/// Only the current item gets a metadata lookup; a media id missing from the
/// catalog yields `metadata: None`, not an error.
pub fn build_snapshot(
    resolution: Resolution<'_>,
    catalog: &MediaCatalog,
    now: DateTime<Utc>,
) -> StatusSnapshot {
    let current = resolution.current;

    StatusSnapshot {
        observed_at: now,
        current: current.map(CurrentItem::from),
        next: resolution.next.map(NextItem::from),
        metadata: current.and_then(|entry| catalog.get(&entry.media_id).cloned()),
        display_until: current
            .map(|entry| now + TimeDelta::seconds(i64::from(entry.display_duration_secs))),
    }
}

/// Writes [`StatusDocument`]s to one canonical path.
#[derive(Debug, Clone)]
pub struct StatusPublisher {
    path: PathBuf,
}

impl StatusPublisher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Build the snapshot for `resolution` at `now` and publish it.
    pub async fn publish(
        &self,
        resolution: Resolution<'_>,
        catalog: &MediaCatalog,
        now: DateTime<Utc>,
    ) -> Result<StatusSnapshot> {
        let snapshot = build_snapshot(resolution, catalog, now);
        self.write(&snapshot).await?;
        Ok(snapshot)
    }

    /// Replace the status file with `snapshot`.
    ///
    /// Readers see either the previous complete document or this one.
    pub async fn write(&self, snapshot: &StatusSnapshot) -> Result<()> {
        let document = StatusDocument::from(snapshot);
        fs::write_atomic(&self.path, json::to_pretty_sorted(&document)?).await?;
        trace!(
            path = %self.path.display(),
            current = document.current_item.as_ref().map(|c| c.media.as_str()),
            "Status published"
        );
        Ok(())
    }
}

/// Read a published status document, `None` if none has been written yet.
pub async fn read_status(path: &Path) -> Result<Option<StatusDocument>> {
    let Some(raw) = fs::read_to_string_optional(path).await? else {
        return Ok(None);
    };
    Ok(json::parse_optional(
        &raw,
        JsonContext::Status { path },
        "Status file is malformed",
    ))
}
