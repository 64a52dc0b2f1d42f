//! Recursive discovery of schedulable media files.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use media_types::{MediaKind, is_image_path};
use tracing::{debug, warn};

use crate::Result;
use crate::utils::fs::io_error;

/// A media file eligible for scheduling, keyed by its file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredMedia {
    pub name: String,
    pub path: PathBuf,
    pub kind: MediaKind,
    /// Same-stem cover image, audio only.
    pub image_path: Option<PathBuf>,
}

/// Walk `dir` recursively and return supported media sorted by file name.
///
/// Audio files are paired with an image sharing their file stem anywhere in
/// the tree. When two files share a name, the one with the greater path wins.
/// A missing directory yields no media; unreadable subdirectories are skipped.
pub async fn discover_media(dir: &Path) -> Result<Vec<DiscoveredMedia>> {
    let files = match list_files(dir).await {
        Ok(files) => files,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %dir.display(), "Media directory does not exist");
            return Ok(Vec::new());
        }
        Err(e) => return Err(io_error("scanning media directory", dir, e)),
    };

    let images_by_stem: HashMap<String, PathBuf> = files
        .iter()
        .filter(|p| is_image_path(p))
        .filter_map(|p| Some((file_stem(p)?, p.clone())))
        .collect();

    let mut by_name: BTreeMap<String, DiscoveredMedia> = BTreeMap::new();
    for path in files {
        let Some(kind) = MediaKind::from_path(&path) else {
            continue;
        };
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            warn!(path = %path.display(), "Skipping media file with a non UTF-8 name");
            continue;
        };

        let image_path = match kind {
            MediaKind::Audio => {
                file_stem(&path).and_then(|stem| images_by_stem.get(&stem).cloned())
            }
            MediaKind::Video => None,
        };

        if let Some(previous) = by_name.get(&name) {
            debug!(
                media = %name,
                replaced = %previous.path.display(),
                path = %path.display(),
                "Duplicate media file name"
            );
        }
        by_name.insert(
            name.clone(),
            DiscoveredMedia {
                name,
                path,
                kind,
                image_path,
            },
        );
    }

    Ok(by_name.into_values().collect())
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem().and_then(|s| s.to_str()).map(str::to_string)
}

/// All regular files under `root`, sorted by path. Symlinked directories are
/// not followed.
async fn list_files(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    let mut is_root = true;

    while let Some(dir) = pending.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if is_root => return Err(e),
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "Skipping unreadable directory");
                continue;
            }
        };
        is_root = false;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_type = match entry.file_type().await {
                Ok(ft) => ft,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Skipping entry");
                    continue;
                }
            };

            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() {
                files.push(path);
            } else if file_type.is_symlink()
                && tokio::fs::metadata(&path)
                    .await
                    .is_ok_and(|meta| meta.is_file())
            {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}
