//! airtime library crate.
//!
//! Resolves what plays now and next from a time-of-day broadcast schedule and
//! keeps a status document for an overlay renderer up to date.

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod media;
pub mod schedule;
pub mod scheduler;
pub mod status;
pub mod utils;

pub use error::{Error, Result};
