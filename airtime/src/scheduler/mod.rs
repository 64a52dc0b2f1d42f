//! Scheduler loop driving the published status.
//!
//! One logical actor ticks at a fixed cadence and, in order:
//! - refreshes the media metadata catalog when the rescan interval elapsed
//! - reloads the schedule when its modification time changed
//! - resolves the current and next entries
//! - atomically publishes the status document
//!
//! Every per-tick failure is logged and the loop continues with the state it
//! already has. Only startup failures are fatal.

mod service;

pub use service::{Scheduler, SchedulerConfig, SchedulerState, TickReport};
