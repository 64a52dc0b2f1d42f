//! Media library access: discovery, probing and the persisted metadata catalog.

pub mod cache;
pub mod discovery;
pub mod probe;

pub use cache::MetadataCache;
pub use discovery::{DiscoveredMedia, discover_media};
pub use probe::{FfprobeProber, MediaProber, ProbeResult};
