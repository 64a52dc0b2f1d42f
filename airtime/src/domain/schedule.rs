//! Schedule entries and the ordered set the resolver works on.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::TimeOfDay;
use crate::{Error, Result};

/// Display duration used when an item does not specify one.
pub const DEFAULT_DISPLAY_DURATION_SECS: u32 = 10;

/// Timezone the schedule is written in. Only UTC is resolved.
pub const SCHEDULE_TIMEZONE: &str = "UTC";

/// One cyclic daily broadcast slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub time_of_day: TimeOfDay,
    pub media_id: String,
    pub display_duration_secs: u32,
}

impl ScheduleEntry {
    pub fn new(
        time_of_day: TimeOfDay,
        media_id: impl Into<String>,
        display_duration_secs: u32,
    ) -> Self {
        Self {
            time_of_day,
            media_id: media_id.into(),
            display_duration_secs,
        }
    }

    /// Validate one raw `items[]` element of the schedule document.
    pub fn from_value(value: serde_json::Value, default_display_secs: u32) -> Result<Self> {
        let raw: ScheduleItem = serde_json::from_value(value)
            .map_err(|e| Error::validation(format!("malformed schedule item: {e}")))?;

        let time_of_day = TimeOfDay::parse(&raw.time)?;
        if raw.media.is_empty() {
            return Err(Error::validation("schedule item has an empty media id"));
        }

        Ok(Self {
            time_of_day,
            media_id: raw.media,
            display_duration_secs: raw
                .metadata_display_duration
                .unwrap_or(default_display_secs),
        })
    }
}

/// Wire form of a schedule item.
#[derive(Debug, Deserialize)]
struct ScheduleItem {
    time: String,
    media: String,
    #[serde(default)]
    metadata_display_duration: Option<u32>,
}

/// Wire form of the schedule file.
///
/// `items` stays loosely typed so one bad element does not reject the whole
/// document; elements are validated individually by [`ScheduleSet::from_document`].
/// Only a JSON object deserializes; a top-level array is rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Map<String, serde_json::Value>")]
pub struct ScheduleDocument {
    pub timezone: String,
    pub items: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

/// Field defaults for [`ScheduleDocument`], applied once the input is known
/// to be an object.
#[derive(Deserialize)]
struct DocumentFields {
    #[serde(default = "default_timezone")]
    timezone: String,
    #[serde(default)]
    items: Vec<serde_json::Value>,
    #[serde(default)]
    last_updated: Option<String>,
}

impl TryFrom<serde_json::Map<String, serde_json::Value>> for ScheduleDocument {
    type Error = serde_json::Error;

    fn try_from(
        map: serde_json::Map<String, serde_json::Value>,
    ) -> std::result::Result<Self, Self::Error> {
        let fields: DocumentFields = serde_json::from_value(serde_json::Value::Object(map))?;
        Ok(Self {
            timezone: fields.timezone,
            items: fields.items,
            last_updated: fields.last_updated,
        })
    }
}

fn default_timezone() -> String {
    SCHEDULE_TIMEZONE.to_string()
}

impl Default for ScheduleDocument {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            items: Vec::new(),
            last_updated: None,
        }
    }
}

/// Entries sorted ascending by time of day.
///
/// The sort is stable: entries sharing a time keep their document order.
/// Replaced wholesale on reload, never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScheduleSet {
    entries: Vec<ScheduleEntry>,
    last_updated: Option<String>,
}

impl ScheduleSet {
    pub fn new(mut entries: Vec<ScheduleEntry>) -> Self {
        entries.sort_by_key(|e| e.time_of_day);
        Self {
            entries,
            last_updated: None,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a set from a parsed document, dropping items that fail validation.
    pub fn from_document(doc: ScheduleDocument, default_display_secs: u32) -> Self {
        if !doc.timezone.eq_ignore_ascii_case(SCHEDULE_TIMEZONE) {
            warn!(
                timezone = %doc.timezone,
                "Schedule timezone is not UTC; times are resolved as UTC"
            );
        }

        let total = doc.items.len();
        let entries: Vec<ScheduleEntry> = doc
            .items
            .into_iter()
            .enumerate()
            .filter_map(
                |(index, value)| match ScheduleEntry::from_value(value, default_display_secs) {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        debug!(index, error = %e, "Skipping schedule item");
                        None
                    }
                },
            )
            .collect();

        if entries.len() < total {
            debug!(
                kept = entries.len(),
                skipped = total - entries.len(),
                "Dropped malformed schedule items"
            );
        }

        let mut set = Self::new(entries);
        set.last_updated = doc.last_updated;
        set
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The `last_updated` marker written by the schedule editor, if any.
    pub fn last_updated(&self) -> Option<&str> {
        self.last_updated.as_deref()
    }
}
