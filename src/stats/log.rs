//! Run statistics.
//!
//! Counts what happened to the input on its way through ingestion and the
//! analysis pipeline, so skipped files and discarded animals are visible at
//! the end of a run instead of silently disappearing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for a single run. Safe to share between ingestion workers.
#[derive(Debug)]
pub struct RunStats {
    files_found: AtomicU64,
    files_read: AtomicU64,
    files_skipped: AtomicU64,
    observations: AtomicU64,
    rows_rejected: AtomicU64,
    subjects_cleaned: AtomicU64,
    subjects_skipped: AtomicU64,
    calving_not_found: AtomicU64,
    windows_built: AtomicU64,
    episodes_detected: AtomicU64,
    unusable_windows: AtomicU64,
    run_start: DateTime<Utc>,
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            files_found: AtomicU64::new(0),
            files_read: AtomicU64::new(0),
            files_skipped: AtomicU64::new(0),
            observations: AtomicU64::new(0),
            rows_rejected: AtomicU64::new(0),
            subjects_cleaned: AtomicU64::new(0),
            subjects_skipped: AtomicU64::new(0),
            calving_not_found: AtomicU64::new(0),
            windows_built: AtomicU64::new(0),
            episodes_detected: AtomicU64::new(0),
            unusable_windows: AtomicU64::new(0),
            run_start: Utc::now(),
        }
    }

    pub fn record_files_found(&self, count: u64) {
        self.files_found.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a successfully read file and the rows it contributed.
    pub fn record_file_read(&self, observations: u64, rejected: u64) {
        self.files_read.fetch_add(1, Ordering::Relaxed);
        self.observations.fetch_add(observations, Ordering::Relaxed);
        self.rows_rejected.fetch_add(rejected, Ordering::Relaxed);
    }

    pub fn record_file_skipped(&self) {
        self.files_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_subject_cleaned(&self) {
        self.subjects_cleaned.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an animal discarded because its id is not unique in its folder.
    pub fn record_subject_skipped(&self) {
        self.subjects_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_calving_not_found(&self) {
        self.calving_not_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_window_built(&self) {
        self.windows_built.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_episodes(&self, count: u64) {
        self.episodes_detected.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_unusable_window(&self) {
        self.unusable_windows.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            files_found: self.files_found.load(Ordering::Relaxed),
            files_read: self.files_read.load(Ordering::Relaxed),
            files_skipped: self.files_skipped.load(Ordering::Relaxed),
            observations: self.observations.load(Ordering::Relaxed),
            rows_rejected: self.rows_rejected.load(Ordering::Relaxed),
            subjects_cleaned: self.subjects_cleaned.load(Ordering::Relaxed),
            subjects_skipped: self.subjects_skipped.load(Ordering::Relaxed),
            calving_not_found: self.calving_not_found.load(Ordering::Relaxed),
            windows_built: self.windows_built.load(Ordering::Relaxed),
            episodes_detected: self.episodes_detected.load(Ordering::Relaxed),
            unusable_windows: self.unusable_windows.load(Ordering::Relaxed),
            run_start: self.run_start,
            run_duration_ms: (Utc::now() - self.run_start).num_milliseconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.snapshot();
        format!(
            "Run Statistics:\n\
             - Files found: {}\n\
             - Files read: {}\n\
             - Files skipped: {}\n\
             - Observations ingested: {}\n\
             - Rows rejected: {}\n\
             - Animals cleaned: {}\n\
             - Animals skipped (id not unique in folder): {}\n\
             - Lactations without calving date: {}\n\
             - Windows built: {}\n\
             - Heats detected: {}\n\
             - Windows without usable data: {}\n\
             - Duration: {} ms",
            stats.files_found,
            stats.files_read,
            stats.files_skipped,
            stats.observations,
            stats.rows_rejected,
            stats.subjects_cleaned,
            stats.subjects_skipped,
            stats.calving_not_found,
            stats.windows_built,
            stats.episodes_detected,
            stats.unusable_windows,
            stats.run_duration_ms
        )
    }
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the run counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub files_found: u64,
    pub files_read: u64,
    pub files_skipped: u64,
    pub observations: u64,
    pub rows_rejected: u64,
    pub subjects_cleaned: u64,
    pub subjects_skipped: u64,
    pub calving_not_found: u64,
    pub windows_built: u64,
    pub episodes_detected: u64,
    pub unusable_windows: u64,
    pub run_start: DateTime<Utc>,
    pub run_duration_ms: u64,
}

/// Thread-safe shared run statistics.
pub type SharedRunStats = Arc<RunStats>;

pub fn create_shared_stats() -> SharedRunStats {
    Arc::new(RunStats::new())
}
