//! Observation windows aligned to calving.
//!
//! For every calving date of an animal a fixed two-hourly grid is laid over
//! the days `[calving + start_dim, calving + stop_dim)`. Readings are joined
//! onto the grid by exact timestamp and short interior gaps are filled by
//! linear interpolation.

use crate::config::AnalysisParams;
use crate::core::calving::LactationCycle;
use crate::core::pipeline::PipelineError;
use crate::ingest::Observation;
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Spacing of the observation grid in hours.
pub const STEP_HOURS: i64 = 2;

/// One grid step of an observation window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowRow {
    pub timestamp: NaiveDateTime,
    /// Measured or interpolated activity
    pub activity: Option<f64>,
    /// Whether `activity` was filled by interpolation
    pub interpolated: bool,
    /// Days in lactation as reported by the sensor at this step
    pub dim: Option<i64>,
    pub lactation: u32,
    pub calving_date: NaiveDateTime,
}

/// The grid of one lactation of one animal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationWindow {
    pub lactation: u32,
    pub calving_date: NaiveDateTime,
    pub rows: Vec<WindowRow>,
}

impl ObservationWindow {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Share of grid steps with an activity value, in percent.
    pub fn usable_pct(&self) -> f64 {
        if self.rows.is_empty() {
            return 0.0;
        }
        let present = self.rows.iter().filter(|r| r.activity.is_some()).count();
        present as f64 / self.rows.len() as f64 * 100.0
    }
}

/// Build the two-hourly grid `[calving + start_dim, calving + stop_dim)`.
///
/// The grid ends early where it would leave the representable calendar, and
/// is empty if it cannot start at all.
pub fn time_grid(calving_date: NaiveDateTime, start_dim: i64, stop_dim: i64) -> Vec<NaiveDateTime> {
    let Some(start) = Duration::try_days(start_dim).and_then(|d| calving_date.checked_add_signed(d))
    else {
        return Vec::new();
    };
    let steps = stop_dim
        .checked_sub(start_dim)
        .and_then(|days| days.checked_mul(24 / STEP_HOURS))
        .unwrap_or(0)
        .max(0);
    (0..steps)
        .map_while(|i| {
            i.checked_mul(STEP_HOURS)
                .and_then(Duration::try_hours)
                .and_then(|offset| start.checked_add_signed(offset))
        })
        .collect()
}

/// Linearly fill gaps lying strictly between two known values.
///
/// Gaps longer than `limit` steps are left untouched, as are leading and
/// trailing gaps. `None` disables interpolation. Returns which positions
/// were filled.
pub fn interpolate_inside(values: &mut [Option<f64>], limit: Option<usize>) -> Vec<bool> {
    let mut filled = vec![false; values.len()];
    let limit = match limit {
        Some(limit) if limit > 0 => limit,
        _ => return filled,
    };

    let mut last_known: Option<usize> = None;
    for i in 0..values.len() {
        let Some(right) = values[i] else { continue };

        if let Some(prev) = last_known {
            let gap = i - prev - 1;
            if gap > 0 && gap <= limit {
                let left = values[prev].unwrap_or(right);
                let span = (gap + 1) as f64;
                for (k, pos) in (prev + 1..i).enumerate() {
                    let frac = (k + 1) as f64 / span;
                    values[pos] = Some(left + (right - left) * frac);
                    filled[pos] = true;
                }
            }
        }
        last_known = Some(i);
    }

    filled
}

/// Cuts calving-aligned windows out of an animal's cleaned series.
pub struct WindowExtractor {
    start_dim: i64,
    stop_dim: i64,
    interpolation_limit: Option<usize>,
}

impl WindowExtractor {
    pub fn new(start_dim: i64, stop_dim: i64, interpolation_limit: Option<usize>) -> Self {
        Self {
            start_dim,
            stop_dim,
            interpolation_limit,
        }
    }

    pub fn from_params(params: &AnalysisParams) -> Self {
        Self::new(params.start_dim, params.stop_dim, params.interpolation_limit)
    }

    /// Extract one window per distinct calving date of the animal.
    ///
    /// Windows are returned in the order their calving dates first appear in
    /// the series. Windows of lactations that lie close together may overlap;
    /// they are not clipped.
    pub fn extract(
        &self,
        series: &[Observation],
        cycles: &[LactationCycle],
    ) -> Result<Vec<ObservationWindow>, PipelineError> {
        let dates: BTreeMap<u32, NaiveDateTime> = cycles
            .iter()
            .filter_map(|c| c.calving_date.map(|d| (c.lactation, d)))
            .collect();

        // (calving date, lactation of its first row) in order of appearance.
        let mut blocks: Vec<(NaiveDateTime, u32)> = Vec::new();
        for obs in series {
            let Some(lactation) = obs.lactation else { continue };
            if let Some(date) = dates.get(&lactation) {
                if !blocks.iter().any(|(d, _)| d == date) {
                    blocks.push((*date, lactation));
                }
            }
        }
        if blocks.is_empty() {
            return Ok(Vec::new());
        }

        let mut by_time: HashMap<NaiveDateTime, &Observation> = HashMap::with_capacity(series.len());
        for obs in series {
            if by_time.insert(obs.timestamp, obs).is_some() {
                return Err(PipelineError::DuplicateTimestamp {
                    subject: obs.subject_key().to_string(),
                    timestamp: obs.timestamp,
                });
            }
        }

        Ok(blocks
            .into_iter()
            .map(|(calving_date, lactation)| self.build_window(&by_time, calving_date, lactation))
            .collect())
    }

    fn build_window(
        &self,
        by_time: &HashMap<NaiveDateTime, &Observation>,
        calving_date: NaiveDateTime,
        lactation: u32,
    ) -> ObservationWindow {
        let grid = time_grid(calving_date, self.start_dim, self.stop_dim);
        let joined: Vec<Option<&Observation>> =
            grid.iter().map(|ts| by_time.get(ts).copied()).collect();

        let mut activity: Vec<Option<f64>> =
            joined.iter().map(|o| o.and_then(|o| o.activity)).collect();
        let filled = interpolate_inside(&mut activity, self.interpolation_limit);

        let rows = grid
            .into_iter()
            .zip(joined)
            .zip(activity.into_iter().zip(filled))
            .map(|((timestamp, obs), (activity, interpolated))| WindowRow {
                timestamp,
                activity,
                interpolated,
                dim: obs.and_then(|o| o.dim),
                lactation,
                calving_date,
            })
            .collect();

        ObservationWindow {
            lactation,
            calving_date,
            rows,
        }
    }
}
