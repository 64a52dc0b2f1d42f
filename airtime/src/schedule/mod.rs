//! Schedule loading and time-of-day resolution.

pub mod resolver;
pub mod store;

pub use resolver::{Resolution, resolve, resolve_at};
pub use store::{ScheduleStore, StoreOutcome};
