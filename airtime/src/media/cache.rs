//! Metadata cache: the persisted snapshot of the media library.
//!
//! A refresh discovers media files, probes them concurrently, persists the
//! resulting catalog atomically and only then swaps it in. Readers always see
//! one complete catalog.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use tracing::{debug, info, warn};

use super::discovery::{DiscoveredMedia, discover_media};
use super::probe::{MediaProber, ProbeResult};
use crate::Result;
use crate::domain::status::format_utc;
use crate::domain::{MediaCatalog, MediaMetadata};
use crate::utils::fs;
use crate::utils::json::{self, JsonContext};

pub struct MetadataCache {
    path: PathBuf,
    media_dir: PathBuf,
    prober: Arc<dyn MediaProber>,
    probe_concurrency: usize,
    catalog: Arc<MediaCatalog>,
}

impl MetadataCache {
    pub fn new(
        path: impl Into<PathBuf>,
        media_dir: impl Into<PathBuf>,
        prober: Arc<dyn MediaProber>,
        probe_concurrency: usize,
    ) -> Self {
        Self {
            path: path.into(),
            media_dir: media_dir.into(),
            prober,
            probe_concurrency: probe_concurrency.max(1),
            catalog: Arc::new(MediaCatalog::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The most recently published catalog.
    pub fn catalog(&self) -> Arc<MediaCatalog> {
        Arc::clone(&self.catalog)
    }

    /// Seed the cache from the catalog persisted by a previous run.
    ///
    /// A missing, unreadable or malformed file leaves the cache empty.
    pub async fn load_persisted(&mut self) {
        let raw = match fs::read_to_string_optional(&self.path).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(path = %self.path.display(), "No persisted metadata catalog");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Cannot read persisted metadata catalog");
                return;
            }
        };

        let catalog: MediaCatalog = json::parse_or_default(
            &raw,
            JsonContext::MetadataCatalog { path: &self.path },
            "Persisted metadata catalog is malformed, starting empty",
        );
        debug!(items = catalog.len(), "Loaded persisted metadata catalog");
        self.catalog = Arc::new(catalog);
    }

    /// Rebuild the catalog from the media directory.
    ///
    /// Returns the number of items in the new catalog. On error the previous
    /// catalog stays visible.
    pub async fn refresh(&mut self, now: DateTime<Utc>) -> Result<usize> {
        let found = discover_media(&self.media_dir).await?;
        let total = found.len();

        let items: BTreeMap<String, MediaMetadata> = futures::stream::iter(found)
            .map(|media| {
                let prober = Arc::clone(&self.prober);
                async move { probe_entry(prober.as_ref(), media).await }
            })
            .buffer_unordered(self.probe_concurrency)
            .collect()
            .await;

        let catalog = MediaCatalog::new(format_utc(now), items);
        fs::write_atomic(&self.path, json::to_pretty_sorted(&catalog)?).await?;

        let changed = catalog.items != self.catalog.items;
        self.catalog = Arc::new(catalog);

        if changed {
            info!(items = total, "Media metadata catalog updated");
        } else {
            debug!(items = total, "Media metadata catalog refreshed");
        }
        Ok(total)
    }
}

async fn probe_entry(prober: &dyn MediaProber, media: DiscoveredMedia) -> (String, MediaMetadata) {
    let probed = match prober.probe(&media.path).await {
        Ok(probed) => probed,
        Err(e) => {
            warn!(media = %media.name, error = %e, "Probe failed, using default metadata");
            ProbeResult::fallback(&media.path)
        }
    };

    let metadata = MediaMetadata {
        kind: media.kind,
        path: media.path.to_string_lossy().into_owned(),
        title: probed.title,
        description: probed.description,
        original_air_date: probed.original_air_date,
        duration_seconds: probed.duration_seconds,
        image_path: media
            .image_path
            .map(|p| p.to_string_lossy().into_owned()),
    };
    (media.name, metadata)
}
