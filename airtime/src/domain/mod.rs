//! Domain types for the broadcast schedule, media metadata and published status.

pub mod metadata;
pub mod schedule;
pub mod status;
pub mod time_of_day;

pub use metadata::{MediaCatalog, MediaMetadata};
pub use schedule::{DEFAULT_DISPLAY_DURATION_SECS, ScheduleDocument, ScheduleEntry, ScheduleSet};
pub use status::{CurrentItem, NextItem, StatusDocument, StatusSnapshot};
pub use time_of_day::TimeOfDay;
