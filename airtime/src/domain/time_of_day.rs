//! Time-of-day value object.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

/// Seconds in one cyclic broadcast day.
pub const SECONDS_PER_DAY: u32 = 24 * 60 * 60;

/// A wall-clock position within a UTC day, stored as seconds since midnight.
///
/// Always in `0..SECONDS_PER_DAY`. The textual form is strictly `HH:MM:SS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeOfDay(u32);

impl TimeOfDay {
    pub const MIDNIGHT: Self = Self(0);

    pub fn from_seconds(seconds: u32) -> Result<Self> {
        if seconds < SECONDS_PER_DAY {
            Ok(Self(seconds))
        } else {
            Err(Error::validation(format!(
                "time of day out of range: {seconds}s"
            )))
        }
    }

    pub fn from_hms(hour: u32, minute: u32, second: u32) -> Result<Self> {
        if hour >= 24 || minute >= 60 || second >= 60 {
            return Err(Error::validation(format!(
                "invalid time of day {hour:02}:{minute:02}:{second:02}"
            )));
        }
        Ok(Self(hour * 3600 + minute * 60 + second))
    }

    /// Parse the strict `HH:MM:SS` form.
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = || Error::validation(format!("invalid time of day {s:?}, expected HH:MM:SS"));

        let mut fields = s.split(':');
        let (Some(h), Some(m), Some(sec), None) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(invalid());
        };

        let field = |part: &str| -> Result<u32> {
            if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse().map_err(|_| invalid())
        };

        Self::from_hms(field(h)?, field(m)?, field(sec)?)
    }

    /// Position of `instant` within its UTC day.
    pub fn of_instant(instant: DateTime<Utc>) -> Self {
        Self(instant.num_seconds_from_midnight())
    }

    pub fn seconds(&self) -> u32 {
        self.0
    }

    pub fn hour(&self) -> u32 {
        self.0 / 3600
    }

    pub fn minute(&self) -> u32 {
        (self.0 % 3600) / 60
    }

    pub fn second(&self) -> u32 {
        self.0 % 60
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.hour(),
            self.minute(),
            self.second()
        )
    }
}

impl std::str::FromStr for TimeOfDay {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
