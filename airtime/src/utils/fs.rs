//! Filesystem helpers shared across modules.
//!
//! These helpers attach operation + path context to IO errors and implement
//! the write-temp-then-rename replace every persisted document goes through.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::{Error, Result};

/// Convert an IO error into an application error with operation + path context.
pub fn io_error(op: &'static str, path: &Path, source: std::io::Error) -> Error {
    Error::io_path(op, path, source)
}

/// Ensure a directory exists, creating it (recursively) if needed.
pub async fn ensure_dir_all_with_op(op: &'static str, path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| io_error(op, path, e))
}

/// Ensure a directory exists, creating it (recursively) if needed.
pub async fn ensure_dir_all(path: &Path) -> Result<()> {
    ensure_dir_all_with_op("creating directory", path).await
}

/// Ensure the parent directory of a file path exists.
pub async fn ensure_parent_dir(path: &Path) -> Result<()> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    ensure_dir_all(parent).await
}

/// Ensure a directory exists (synchronous variant) with a custom operation label.
pub fn ensure_dir_all_sync_with_op(op: &'static str, path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| io_error(op, path, e))
}

/// Modification time of `path`, or `None` if it does not exist.
pub async fn modified_time(path: &Path) -> Result<Option<SystemTime>> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => meta
            .modified()
            .map(Some)
            .map_err(|e| io_error("reading modification time of", path, e)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_error("reading metadata of", path, e)),
    }
}

/// Read a UTF-8 file, or `None` if it does not exist.
pub async fn read_to_string_optional(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => Ok(Some(raw)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_error("reading", path, e)),
    }
}

/// Durably replace `path` with `contents`.
///
/// The bytes go to a temporary file in the same directory, are fsynced, and
/// the temporary file is renamed over `path`. Readers observe either the old
/// or the new contents, never a partial write.
pub async fn write_atomic(path: &Path, contents: Vec<u8>) -> Result<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || write_atomic_sync(&path, &contents))
        .await
        .map_err(|e| Error::Other(format!("atomic write task failed: {e}")))?
}

fn write_atomic_sync(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = parent_or_cwd(path);

    let mut tmp = tempfile::Builder::new()
        .prefix(".airtime-")
        .suffix(".tmp")
        .tempfile_in(&dir)
        .map_err(|e| io_error("creating temporary file in", &dir, e))?;

    tmp.write_all(contents)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| io_error("writing temporary file for", path, e))?;

    tmp.persist(path)
        .map_err(|e| io_error("replacing", path, e.error))?;

    Ok(())
}

fn parent_or_cwd(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
