//! Runtime configuration.
//!
//! Everything has a default matching a plain working-directory deployment;
//! environment variables (optionally from a `.env` file) override them.

use std::path::PathBuf;
use std::time::Duration;

use crate::domain::DEFAULT_DISPLAY_DURATION_SECS;
use crate::{Error, Result};

/// Default scheduler tick (1 second).
const DEFAULT_TICK_INTERVAL_SECS: u64 = 1;

/// Default media rescan interval (10 seconds).
const DEFAULT_RESCAN_INTERVAL_SECS: u64 = 10;

/// Default per-file ffprobe timeout.
const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 15;

/// Default number of concurrent ffprobe processes.
const DEFAULT_PROBE_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Root of the media library.
    pub media_dir: PathBuf,
    /// Schedule document written by the schedule editor.
    pub schedule_path: PathBuf,
    /// Persisted media metadata catalog.
    pub metadata_path: PathBuf,
    /// Status document read by the overlay renderer.
    pub status_path: PathBuf,
    pub log_dir: PathBuf,
    /// Filter directive applied after logging starts; overrides `RUST_LOG`.
    pub log_filter: Option<String>,
    pub tick_interval: Duration,
    pub rescan_interval: Duration,
    pub ffprobe_path: String,
    pub probe_timeout: Duration,
    pub probe_concurrency: usize,
    /// Used for schedule items without `metadata_display_duration`.
    pub default_display_secs: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            media_dir: default_media_dir(),
            schedule_path: PathBuf::from("schedule.json"),
            metadata_path: PathBuf::from("media_metadata.json"),
            status_path: PathBuf::from("obs_status.json"),
            log_dir: PathBuf::from("logs"),
            log_filter: None,
            tick_interval: Duration::from_secs(DEFAULT_TICK_INTERVAL_SECS),
            rescan_interval: Duration::from_secs(DEFAULT_RESCAN_INTERVAL_SECS),
            ffprobe_path: "ffprobe".to_string(),
            probe_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
            probe_concurrency: DEFAULT_PROBE_CONCURRENCY,
            default_display_secs: DEFAULT_DISPLAY_DURATION_SECS,
        }
    }
}

fn default_media_dir() -> PathBuf {
    match std::env::var_os("HOME").filter(|h| !h.is_empty()) {
        Some(home) => PathBuf::from(home).join("broadcast_media"),
        None => PathBuf::from("broadcast_media"),
    }
}

impl AppConfig {
    /// Load config from environment variables, falling back to defaults.
    ///
    /// Supported env vars:
    /// - `AIRTIME_MEDIA_DIR`, `AIRTIME_SCHEDULE_FILE`, `AIRTIME_METADATA_FILE`,
    ///   `AIRTIME_STATUS_FILE`, `AIRTIME_LOG_DIR`, `AIRTIME_LOG_FILTER`
    /// - `AIRTIME_TICK_INTERVAL_SECS`, `AIRTIME_RESCAN_INTERVAL_SECS`
    /// - `FFPROBE_PATH`, `AIRTIME_PROBE_TIMEOUT_SECS`, `AIRTIME_PROBE_CONCURRENCY`
    /// - `AIRTIME_DEFAULT_DISPLAY_SECS`
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env_or_default`] with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let text = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let positive = |key: &str| {
            text(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|v| *v > 0)
        };

        if let Some(dir) = text("AIRTIME_MEDIA_DIR") {
            config.media_dir = expand_home(&dir);
        }
        if let Some(path) = text("AIRTIME_SCHEDULE_FILE") {
            config.schedule_path = PathBuf::from(path);
        }
        if let Some(path) = text("AIRTIME_METADATA_FILE") {
            config.metadata_path = PathBuf::from(path);
        }
        if let Some(path) = text("AIRTIME_STATUS_FILE") {
            config.status_path = PathBuf::from(path);
        }
        if let Some(dir) = text("AIRTIME_LOG_DIR") {
            config.log_dir = PathBuf::from(dir);
        }
        if let Some(filter) = text("AIRTIME_LOG_FILTER") {
            config.log_filter = Some(filter.trim().to_string());
        }
        if let Some(secs) = positive("AIRTIME_TICK_INTERVAL_SECS") {
            config.tick_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = positive("AIRTIME_RESCAN_INTERVAL_SECS") {
            config.rescan_interval = Duration::from_secs(secs);
        }
        if let Some(path) = text("FFPROBE_PATH") {
            config.ffprobe_path = path;
        }
        if let Some(secs) = positive("AIRTIME_PROBE_TIMEOUT_SECS") {
            config.probe_timeout = Duration::from_secs(secs);
        }
        if let Some(n) = positive("AIRTIME_PROBE_CONCURRENCY") {
            config.probe_concurrency = usize::try_from(n).unwrap_or(DEFAULT_PROBE_CONCURRENCY);
        }
        // Zero is a valid display duration.
        if let Some(secs) = text("AIRTIME_DEFAULT_DISPLAY_SECS")
            .and_then(|v| v.trim().parse::<u32>().ok())
        {
            config.default_display_secs = secs;
        }

        config
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_interval.is_zero() {
            return Err(Error::config("tick interval must be positive"));
        }
        if self.rescan_interval.is_zero() {
            return Err(Error::config("rescan interval must be positive"));
        }
        if self.probe_concurrency == 0 {
            return Err(Error::config("probe concurrency must be positive"));
        }
        if self.ffprobe_path.trim().is_empty() {
            return Err(Error::config("ffprobe path must not be empty"));
        }
        Ok(())
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME").filter(|h| !h.is_empty())
    {
        return PathBuf::from(home).join(rest);
    }
    PathBuf::from(path)
}
