//! Media probing via `ffprobe`.
//!
//! Probing is best-effort. Callers fall back to [`ProbeResult::fallback`]
//! when a probe fails, so one bad file never aborts a library refresh.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::{Error, Result};

/// Descriptive fields extracted from one media file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProbeResult {
    pub title: String,
    pub description: String,
    pub original_air_date: String,
    pub duration_seconds: Option<f64>,
}

impl ProbeResult {
    /// Fields used when nothing could be read: the title is the file stem.
    pub fn fallback(path: &Path) -> Self {
        Self {
            title: path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            ..Self::default()
        }
    }

    /// Map `ffprobe -print_format json -show_format` output to probe fields.
    ///
    /// Missing tags fall back the same way [`ProbeResult::fallback`] does.
    /// Tag names are matched case-insensitively.
    pub fn from_ffprobe_json(raw: &[u8], path: &Path) -> Result<Self> {
        let output: FfprobeOutput = serde_json::from_slice(raw)?;
        let format = output.format.unwrap_or_default();

        let tags: HashMap<String, String> = format
            .tags
            .into_iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .map(|(k, v)| (k.to_ascii_lowercase(), v))
            .collect();
        let tag = |names: &[&str]| names.iter().find_map(|n| tags.get(*n).cloned());

        let fallback = Self::fallback(path);
        Ok(Self {
            title: tag(&["title"]).unwrap_or(fallback.title),
            description: tag(&["description", "comment"]).unwrap_or_default(),
            original_air_date: tag(&["date", "creation_time"]).unwrap_or_default(),
            duration_seconds: format
                .duration
                .and_then(|d| d.trim().parse::<f64>().ok())
                .filter(|d| d.is_finite() && *d >= 0.0),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    #[serde(default)]
    duration: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

/// Extracts descriptive metadata from a media file.
#[async_trait]
pub trait MediaProber: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<ProbeResult>;
}

/// [`MediaProber`] backed by the `ffprobe` binary.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    ffprobe_path: String,
    timeout: Duration,
}

impl FfprobeProber {
    pub fn new(ffprobe_path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
            timeout,
        }
    }

    fn args(path: &Path) -> Vec<std::ffi::OsString> {
        let mut args: Vec<std::ffi::OsString> = [
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_entries",
            "format=duration:format_tags=title,comment,description,date,creation_time",
        ]
        .into_iter()
        .map(Into::into)
        .collect();
        args.push(path.as_os_str().to_owned());
        args
    }
}

#[async_trait]
impl MediaProber for FfprobeProber {
    async fn probe(&self, path: &Path) -> Result<ProbeResult> {
        debug!(path = %path.display(), "Probing media file");
        let stdout =
            process_utils::stdout_with_timeout(&self.ffprobe_path, Self::args(path), self.timeout)
                .await?;

        ProbeResult::from_ffprobe_json(&stdout, path).map_err(|e| {
            Error::probe(format!(
                "unreadable ffprobe output for {}: {e}",
                path.display()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maps_tags() {
        let raw = br#"{
            "format": {
                "duration": "1805.120000",
                "tags": {
                    "title": "Pilot",
                    "comment": "First episode",
                    "creation_time": "1998-09-21T00:00:00.000000Z"
                }
            }
        }"#;

        let result = ProbeResult::from_ffprobe_json(raw, Path::new("/m/pilot.mp4")).unwrap();
        assert_eq!(result.title, "Pilot");
        assert_eq!(result.description, "First episode");
        assert_eq!(result.original_air_date, "1998-09-21T00:00:00.000000Z");
        assert_eq!(result.duration_seconds, Some(1805.12));
    }

    #[test]
    fn test_description_and_date_take_precedence() {
        let raw = br#"{"format": {"tags": {
            "DESCRIPTION": "long", "comment": "short",
            "date": "2001", "creation_time": "2002"
        }}}"#;

        let result = ProbeResult::from_ffprobe_json(raw, Path::new("x.mkv")).unwrap();
        assert_eq!(result.description, "long");
        assert_eq!(result.original_air_date, "2001");
        assert_eq!(result.title, "x");
        assert_eq!(result.duration_seconds, None);
    }

    #[test]
    fn test_empty_output_falls_back_to_stem() {
        let result = ProbeResult::from_ffprobe_json(b"{}", Path::new("/m/My Show.mp4")).unwrap();
        assert_eq!(result, ProbeResult::fallback(Path::new("/m/My Show.mp4")));
        assert_eq!(result.title, "My Show");
    }

    #[test]
    fn test_blank_title_and_bad_duration_ignored() {
        let raw = br#"{"format": {"duration": "N/A", "tags": {"title": "  "}}}"#;
        let result = ProbeResult::from_ffprobe_json(raw, Path::new("song.mp3")).unwrap();
        assert_eq!(result.title, "song");
        assert!(result.duration_seconds.is_none());
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(ProbeResult::from_ffprobe_json(b"not json", Path::new("a.mp4")).is_err());
    }

    #[tokio::test]
    async fn test_missing_binary_is_probe_error() {
        let prober = FfprobeProber::new("ffprobe-missing-3f9a", Duration::from_secs(1));
        let err = prober.probe(Path::new("a.mp4")).await.unwrap_err();
        assert!(matches!(err, Error::Probe(_)));
    }
}
