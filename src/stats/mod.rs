//! Run statistics for a BovHEAT run.
//!
//! Tracks how much input was read, skipped and discarded so the user can
//! judge the coverage of the results.

pub mod log;

pub use log::{create_shared_stats, RunStats, SharedRunStats, StatsSnapshot};
