//! Heat detection on observation windows.
//!
//! A heat is a run of consecutive grid steps whose activity is at or above
//! the threshold. Runs shorter than the minimum heat length are discarded;
//! the remaining runs are numbered chronologically and summarized.

use crate::config::AnalysisParams;
use crate::core::windowing::{ObservationWindow, WindowRow, STEP_HOURS};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Heats starting less than this many hours after the previous heat ended
/// are flagged as a short inter-estrus interval.
pub const MIN_INTER_ESTRUS_HOURS: i64 = 10;

/// Summary of one detected heat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatEpisode {
    /// 1-based number within the window
    pub episode_no: u32,
    pub start_ts: NaiveDateTime,
    pub stop_ts: NaiveDateTime,
    /// Step count times the grid spacing
    pub duration_hours: i64,
    pub peak_activity: f64,
    /// Days in lactation at the peak, missing for interpolated peaks
    pub peak_dim: Option<i64>,
    pub peak_ts: NaiveDateTime,
    pub short_inter_estrus: bool,
}

/// One result row of a window: a heat, or a placeholder if there is none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatRecord {
    pub calving_date: NaiveDateTime,
    /// Share of grid steps with activity data, in percent
    pub usable_pct: f64,
    /// Highest peak over all heats of the window
    pub max_activity: Option<f64>,
    pub episode_count: usize,
    pub episode: Option<HeatEpisode>,
}

/// Group sorted positions into maximal runs of consecutive values.
pub fn group_runs(positions: &[usize]) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut current: Option<Range<usize>> = None;

    for &pos in positions {
        current = match current {
            Some(run) if run.end == pos => Some(run.start..pos + 1),
            Some(run) => {
                runs.push(run);
                Some(pos..pos + 1)
            }
            None => Some(pos..pos + 1),
        };
    }
    runs.extend(current);

    runs
}

/// Detects heats in observation windows.
#[derive(Debug, Clone)]
pub struct HeatDetector {
    threshold: f64,
    min_heat_length: usize,
}

impl HeatDetector {
    pub fn new(threshold: u32, min_heat_length: usize) -> Self {
        Self {
            threshold: threshold as f64,
            min_heat_length: min_heat_length.max(1),
        }
    }

    pub fn from_params(params: &AnalysisParams) -> Self {
        Self::new(params.threshold, params.min_heat_length)
    }

    /// Find the heats of a series of grid rows.
    pub fn episodes(&self, rows: &[WindowRow]) -> Vec<HeatEpisode> {
        let above: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.activity.is_some_and(|a| a >= self.threshold))
            .map(|(i, _)| i)
            .collect();

        let mut episodes: Vec<HeatEpisode> = Vec::new();
        for run in group_runs(&above) {
            if run.len() < self.min_heat_length {
                continue;
            }
            let episode = summarize_run(&rows[run], episodes.len() as u32 + 1, episodes.last());
            episodes.push(episode);
        }

        episodes
    }

    /// Produce the result rows of one window.
    ///
    /// Always yields at least one row so every window is represented in the
    /// result table.
    pub fn detect(&self, window: &ObservationWindow) -> Vec<HeatRecord> {
        let usable_pct = window.usable_pct();
        let episodes = self.episodes(&window.rows);
        let episode_count = episodes.len();
        let max_activity = episodes
            .iter()
            .map(|e| e.peak_activity)
            .fold(None, |max: Option<f64>, v| Some(max.map_or(v, |m| m.max(v))));

        let record = |episode: Option<HeatEpisode>| HeatRecord {
            calving_date: window.calving_date,
            usable_pct,
            max_activity,
            episode_count,
            episode,
        };

        if episodes.is_empty() {
            return vec![record(None)];
        }
        episodes.into_iter().map(|e| record(Some(e))).collect()
    }
}

fn summarize_run(run: &[WindowRow], episode_no: u32, previous: Option<&HeatEpisode>) -> HeatEpisode {
    let first = &run[0];
    let last = &run[run.len() - 1];

    // First occurrence wins on ties.
    let mut peak = first;
    for row in run {
        if row.activity > peak.activity {
            peak = row;
        }
    }

    let short_inter_estrus = previous
        .map(|prev| (first.timestamp - prev.stop_ts).num_hours() < MIN_INTER_ESTRUS_HOURS)
        .unwrap_or(false);

    HeatEpisode {
        episode_no,
        start_ts: first.timestamp,
        stop_ts: last.timestamp,
        duration_hours: run.len() as i64 * STEP_HOURS,
        peak_activity: peak.activity.unwrap_or_default(),
        peak_dim: peak.dim,
        peak_ts: peak.timestamp,
        short_inter_estrus,
    }
}
