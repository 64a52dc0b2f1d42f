//! JSON parsing/serialization helpers with consistent warning logs.

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

/// Which persisted document a JSON payload belongs to, for log context.
#[derive(Debug, Clone, Copy)]
pub enum JsonContext<'a> {
    Schedule { path: &'a Path },
    MetadataCatalog { path: &'a Path },
    Status { path: &'a Path },
}

fn warn_parse_error(
    raw_len: usize,
    error: serde_json::Error,
    ctx: JsonContext<'_>,
    msg: &'static str,
) {
    match ctx {
        JsonContext::Schedule { path } => {
            warn!(
                document = "schedule",
                path = %path.display(),
                raw_len,
                error = %error,
                "{msg}"
            );
        }
        JsonContext::MetadataCatalog { path } => {
            warn!(
                document = "metadata",
                path = %path.display(),
                raw_len,
                error = %error,
                "{msg}"
            );
        }
        JsonContext::Status { path } => {
            warn!(
                document = "status",
                path = %path.display(),
                raw_len,
                error = %error,
                "{msg}"
            );
        }
    }
}

/// Parse `raw`, logging and returning `None` on failure.
pub fn parse_optional<T: DeserializeOwned>(
    raw: &str,
    ctx: JsonContext<'_>,
    msg: &'static str,
) -> Option<T> {
    match serde_json::from_str(raw) {
        Ok(parsed) => Some(parsed),
        Err(error) => {
            warn_parse_error(raw.len(), error, ctx, msg);
            None
        }
    }
}

/// Parse `raw`, logging and falling back to `T::default()` on failure.
pub fn parse_or_default<T: DeserializeOwned + Default>(
    raw: &str,
    ctx: JsonContext<'_>,
    msg: &'static str,
) -> T {
    // Treat empty string as "no value" - return default without warning
    if raw.trim().is_empty() {
        return T::default();
    }
    parse_optional(raw, ctx, msg).unwrap_or_default()
}

/// Serialize as pretty-printed JSON with object keys in sorted order.
///
/// Going through `serde_json::Value` sorts keys because its map is ordered.
pub fn to_pretty_sorted<T: Serialize + ?Sized>(value: &T) -> crate::Result<Vec<u8>> {
    let value = serde_json::to_value(value)?;
    let mut out = serde_json::to_vec_pretty(&value)?;
    out.push(b'\n');
    Ok(out)
}
