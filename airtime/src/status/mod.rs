//! Status publishing for the overlay renderer.

pub mod publisher;

pub use publisher::{StatusPublisher, build_snapshot, read_status};
