//! Run manifest written next to the result tables.
//!
//! The manifest records which parameters produced a set of results, what
//! happened to the input, and a few summary statistics over the results.

use crate::config::AnalysisParams;
use crate::core::PipelineOutput;
use crate::stats::StatsSnapshot;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median, Statistics};
use std::collections::BTreeSet;
use uuid::Uuid;

/// The current manifest format version.
pub const MANIFEST_VERSION: &str = "1.0";

/// The name of this producer.
pub const PRODUCER_NAME: &str = "bovheat";

/// Producer metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
}

/// Summary statistics over the result table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub animals: usize,
    pub windows: usize,
    pub episodes: usize,
    pub short_inter_estrus: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_usable_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub median_usable_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_episode_duration_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episodes_per_window: Option<f64>,
}

impl ResultSummary {
    pub fn from_output(output: &PipelineOutput) -> Self {
        let animals: BTreeSet<(&str, &str)> = output
            .windows
            .iter()
            .map(|w| (w.folder.as_str(), w.subject.as_str()))
            .collect();

        let usable: Vec<f64> = output.windows.iter().map(|w| w.window.usable_pct()).collect();
        let durations: Vec<f64> = output
            .heats
            .iter()
            .filter_map(|h| h.record.episode.as_ref())
            .map(|e| e.duration_hours as f64)
            .collect();
        let short_inter_estrus = output
            .heats
            .iter()
            .filter_map(|h| h.record.episode.as_ref())
            .filter(|e| e.short_inter_estrus)
            .count();

        let windows = output.windows.len();
        let episodes = durations.len();

        Self {
            animals: animals.len(),
            windows,
            episodes,
            short_inter_estrus,
            mean_usable_pct: (!usable.is_empty()).then(|| usable.iter().mean()),
            median_usable_pct: (!usable.is_empty()).then(|| Data::new(usable.clone()).median()),
            mean_episode_duration_hours: (!durations.is_empty()).then(|| durations.iter().mean()),
            episodes_per_window: (windows > 0).then(|| episodes as f64 / windows as f64),
        }
    }
}

/// Manifest of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub manifest_version: String,
    pub run_id: String,
    /// When the results were computed (RFC3339)
    pub generated_at_utc: String,
    pub producer: Producer,
    pub params: AnalysisParams,
    pub stats: StatsSnapshot,
    pub summary: ResultSummary,
    /// Base names of the files written for this run
    pub outputs: Vec<String>,
}

/// Builder for run manifests.
pub struct ManifestBuilder {
    run_id: Uuid,
}

impl ManifestBuilder {
    /// Create a new builder with a unique run ID.
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
        }
    }

    pub fn build(
        &self,
        params: &AnalysisParams,
        stats: StatsSnapshot,
        output: &PipelineOutput,
        outputs: Vec<String>,
    ) -> RunManifest {
        RunManifest {
            manifest_version: MANIFEST_VERSION.to_string(),
            run_id: self.run_id.to_string(),
            generated_at_utc: Utc::now().to_rfc3339(),
            producer: Producer {
                name: PRODUCER_NAME.to_string(),
                version: crate::VERSION.to_string(),
            },
            params: params.clone(),
            stats,
            summary: ResultSummary::from_output(output),
            outputs,
        }
    }
}

impl Default for ManifestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{HeatEpisode, HeatRecord, HeatResult, ObservationWindow, WindowResult, WindowRow};
    use crate::stats::RunStats;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn calving() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2015, 2, 20)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn window(subject: &str, activity: &[Option<f64>]) -> WindowResult {
        let rows = activity
            .iter()
            .enumerate()
            .map(|(i, a)| WindowRow {
                timestamp: calving() + Duration::hours(2 * i as i64),
                activity: *a,
                interpolated: false,
                dim: None,
                lactation: 1,
                calving_date: calving(),
            })
            .collect();
        WindowResult {
            folder: "farm".to_string(),
            subject: subject.to_string(),
            window: ObservationWindow {
                lactation: 1,
                calving_date: calving(),
                rows,
            },
        }
    }

    fn heat(subject: &str, duration_hours: i64, short: bool) -> HeatResult {
        HeatResult {
            folder: "farm".to_string(),
            subject: subject.to_string(),
            lactation: 1,
            record: HeatRecord {
                calving_date: calving(),
                usable_pct: 100.0,
                max_activity: Some(60.0),
                episode_count: 1,
                episode: Some(HeatEpisode {
                    episode_no: 1,
                    start_ts: calving(),
                    stop_ts: calving(),
                    duration_hours,
                    peak_activity: 60.0,
                    peak_dim: None,
                    peak_ts: calving(),
                    short_inter_estrus: short,
                }),
            },
        }
    }

    #[test]
    fn test_summary_statistics() {
        let output = PipelineOutput {
            heats: vec![heat("1", 4, false), heat("1", 8, true), heat("2", 6, false)],
            windows: vec![
                window("1", &[Some(1.0), Some(2.0)]),
                window("2", &[Some(1.0), None]),
                window("2", &[None, None, None, Some(1.0)]),
            ],
        };

        let summary = ResultSummary::from_output(&output);
        assert_eq!(summary.animals, 2);
        assert_eq!(summary.windows, 3);
        assert_eq!(summary.episodes, 3);
        assert_eq!(summary.short_inter_estrus, 1);
        assert!((summary.mean_usable_pct.unwrap() - 58.333333).abs() < 1e-4);
        assert_eq!(summary.median_usable_pct, Some(50.0));
        assert_eq!(summary.mean_episode_duration_hours, Some(6.0));
        assert_eq!(summary.episodes_per_window, Some(1.0));
    }

    #[test]
    fn test_empty_summary_has_no_statistics() {
        let summary = ResultSummary::from_output(&PipelineOutput::default());
        assert_eq!(summary, ResultSummary::default());
    }

    #[test]
    fn test_manifest_serializes() {
        let manifest = ManifestBuilder::new().build(
            &AnalysisParams::default(),
            RunStats::new().snapshot(),
            &PipelineOutput::default(),
            vec!["out_long.csv".to_string()],
        );

        assert!(Uuid::parse_str(&manifest.run_id).is_ok());
        let json = serde_json::to_value(&manifest).unwrap();
        assert_eq!(json["producer"]["name"], "bovheat");
        assert_eq!(json["params"]["threshold"], 35);
        assert_eq!(json["params"]["language"], "eng");
        assert!(json["summary"].get("mean_usable_pct").is_none());
    }
}
