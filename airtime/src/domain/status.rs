//! The now/next status consumed by the overlay renderer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{MediaMetadata, ScheduleEntry, TimeOfDay};

/// Render an instant the way every published document does: `YYYY-MM-DDTHH:MM:SSZ`.
pub fn format_utc(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Schedule coordinates of the playing item plus how long its metadata shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentItem {
    pub time: TimeOfDay,
    pub media: String,
    pub metadata_display_duration: u32,
}

impl From<&ScheduleEntry> for CurrentItem {
    fn from(entry: &ScheduleEntry) -> Self {
        Self {
            time: entry.time_of_day,
            media: entry.media_id.clone(),
            metadata_display_duration: entry.display_duration_secs,
        }
    }
}

/// Schedule coordinates of the upcoming item. No metadata is attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextItem {
    pub time: TimeOfDay,
    pub media: String,
}

impl From<&ScheduleEntry> for NextItem {
    fn from(entry: &ScheduleEntry) -> Self {
        Self {
            time: entry.time_of_day,
            media: entry.media_id.clone(),
        }
    }
}

/// Fully recomputed every tick; the previous snapshot is discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub observed_at: DateTime<Utc>,
    pub current: Option<CurrentItem>,
    pub next: Option<NextItem>,
    pub metadata: Option<MediaMetadata>,
    pub display_until: Option<DateTime<Utc>>,
}

/// Wire form of the status file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusDocument {
    pub current_utc: String,
    pub current_item: Option<CurrentItem>,
    pub next_item: Option<NextItem>,
    pub metadata: Option<MediaMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_until_utc: Option<String>,
}

impl From<&StatusSnapshot> for StatusDocument {
    fn from(snapshot: &StatusSnapshot) -> Self {
        Self {
            current_utc: format_utc(snapshot.observed_at),
            current_item: snapshot.current.clone(),
            next_item: snapshot.next.clone(),
            metadata: snapshot.metadata.clone(),
            display_until_utc: snapshot.display_until.map(format_utc),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_utc_truncates_subseconds() {
        let instant = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap()
            + chrono::Duration::milliseconds(750);
        assert_eq!(format_utc(instant), "2024-05-06T07:08:09Z");
    }

    #[test]
    fn test_empty_snapshot_document() {
        let snapshot = StatusSnapshot {
            observed_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            current: None,
            next: None,
            metadata: None,
            display_until: None,
        };

        let value = serde_json::to_value(StatusDocument::from(&snapshot)).unwrap();
        assert_eq!(value["current_utc"], "2024-01-01T00:00:00Z");
        assert!(value["current_item"].is_null());
        assert!(value["next_item"].is_null());
        assert!(value["metadata"].is_null());
        assert!(value.get("display_until_utc").is_none());
    }
}
