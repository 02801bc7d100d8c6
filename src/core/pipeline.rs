//! The analysis pipeline.
//!
//! ```text
//! observations ─▶ group by (folder, animal) ─▶ clean ─▶ calving dates
//!                                                          │
//!            result table ◀─ heats ◀─ windows ◀────────────┘
//! ```
//!
//! Each animal is processed independently of all others. Animals that cannot
//! be analysed are skipped with a warning; only the complete absence of input
//! aborts a run.

use crate::config::AnalysisParams;
use crate::core::calving::estimate_cycles;
use crate::core::heats::{HeatDetector, HeatRecord};
use crate::core::series::{clean_series, Cleaned};
use crate::core::windowing::{ObservationWindow, WindowExtractor};
use crate::ingest::{Observation, SubjectKey};
use crate::stats::{create_shared_stats, SharedRunStats};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Errors that abort a pipeline run.
#[derive(Debug)]
pub enum PipelineError {
    /// There is nothing to analyse
    NoObservations,
    /// A timestamp occurs twice in a series handed to the window join
    DuplicateTimestamp {
        subject: String,
        timestamp: NaiveDateTime,
    },
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::NoObservations => write!(f, "No observations to analyse"),
            PipelineError::DuplicateTimestamp { subject, timestamp } => {
                write!(f, "Duplicate timestamp {timestamp} in series of {subject}")
            }
        }
    }
}

impl std::error::Error for PipelineError {}

/// A result row: one heat (or placeholder) of one lactation of one animal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatResult {
    pub folder: String,
    pub subject: String,
    pub lactation: u32,
    pub record: HeatRecord,
}

/// A retained observation window, used for plotting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowResult {
    pub folder: String,
    pub subject: String,
    pub window: ObservationWindow,
}

/// Everything a run produces.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineOutput {
    /// Long result table ordered by folder, animal and lactation
    pub heats: Vec<HeatResult>,
    pub windows: Vec<WindowResult>,
}

impl PipelineOutput {
    pub fn episode_count(&self) -> usize {
        self.heats.iter().filter(|h| h.record.episode.is_some()).count()
    }
}

/// Runs cleaning, calving inference, windowing and heat detection.
pub struct Pipeline {
    extractor: WindowExtractor,
    detector: HeatDetector,
    stats: SharedRunStats,
}

impl Pipeline {
    pub fn new(params: &AnalysisParams) -> Self {
        Self::with_stats(params, create_shared_stats())
    }

    pub fn with_stats(params: &AnalysisParams, stats: SharedRunStats) -> Self {
        Self {
            extractor: WindowExtractor::from_params(params),
            detector: HeatDetector::from_params(params),
            stats,
        }
    }

    pub fn stats(&self) -> &SharedRunStats {
        &self.stats
    }

    /// Analyse all observations.
    pub fn run(&self, observations: &[Observation]) -> Result<PipelineOutput, PipelineError> {
        if observations.is_empty() {
            return Err(PipelineError::NoObservations);
        }

        let mut groups: BTreeMap<SubjectKey, Vec<Observation>> = BTreeMap::new();
        for obs in observations {
            groups.entry(obs.subject_key()).or_default().push(obs.clone());
        }
        tracing::info!(animals = groups.len(), "processing animals");

        let mut output = PipelineOutput::default();
        for (key, rows) in &groups {
            let (heats, windows) = self.process_subject(key, rows)?;
            output.heats.extend(heats);
            output.windows.extend(windows);
        }

        tracing::info!(
            rows = output.heats.len(),
            heats = output.episode_count(),
            "analysis finished"
        );
        Ok(output)
    }

    /// Analyse the raw rows of a single animal.
    pub fn process_subject(
        &self,
        key: &SubjectKey,
        rows: &[Observation],
    ) -> Result<(Vec<HeatResult>, Vec<WindowResult>), PipelineError> {
        tracing::debug!(folder = %key.folder, subject = %key.subject, "cleaning");
        let series = match clean_series(rows) {
            Cleaned::Series(series) => series,
            Cleaned::NotUnique { conflicts } => {
                tracing::warn!(
                    folder = %key.folder,
                    subject = %key.subject,
                    conflicts,
                    "animal id is not unique within folder, skipping"
                );
                self.stats.record_subject_skipped();
                return Ok((Vec::new(), Vec::new()));
            }
        };
        self.stats.record_subject_cleaned();

        let cycles = estimate_cycles(&series);
        for cycle in cycles.iter().filter(|c| c.calving_date.is_none()) {
            tracing::warn!(
                folder = %key.folder,
                subject = %key.subject,
                lactation = cycle.lactation,
                "calving date not found"
            );
            self.stats.record_calving_not_found();
        }

        let mut windows = self.extractor.extract(&series, &cycles)?;
        windows.sort_by_key(|w| w.lactation);

        let mut heats = Vec::new();
        let mut kept = Vec::new();
        for window in windows {
            self.stats.record_window_built();
            let records = self.detector.detect(&window);
            if records.first().map(|r| r.usable_pct <= 0.0).unwrap_or(true) {
                tracing::debug!(
                    folder = %key.folder,
                    subject = %key.subject,
                    lactation = window.lactation,
                    "window has no usable data"
                );
                self.stats.record_unusable_window();
                continue;
            }

            let episodes = records.iter().filter(|r| r.episode.is_some()).count();
            self.stats.record_episodes(episodes as u64);

            heats.extend(records.into_iter().map(|record| HeatResult {
                folder: key.folder.clone(),
                subject: key.subject.clone(),
                lactation: window.lactation,
                record,
            }));
            kept.push(WindowResult {
                folder: key.folder.clone(),
                subject: key.subject.clone(),
                window,
            });
        }

        Ok((heats, kept))
    }
}
