//! Media metadata as produced by the media prober and persisted in the catalog.

use std::collections::BTreeMap;

use media_types::MediaKind;
use serde::{Deserialize, Serialize};

/// Descriptive metadata for one media file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub path: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub original_air_date: String,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    /// Cover art for audio items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
}

/// Snapshot of the media library keyed by file name.
///
/// Treated as an opaque, replaceable unit: refreshes build a new catalog and
/// swap it in whole.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MediaCatalog {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub items: BTreeMap<String, MediaMetadata>,
}

impl MediaCatalog {
    pub fn new(updated_at: impl Into<String>, items: BTreeMap<String, MediaMetadata>) -> Self {
        Self {
            updated_at: Some(updated_at.into()),
            items,
        }
    }

    pub fn get(&self, media_id: &str) -> Option<&MediaMetadata> {
        self.items.get(media_id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
