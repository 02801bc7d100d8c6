//! Writing result files.

use crate::config::AnalysisParams;
use crate::core::PipelineOutput;
use crate::report::manifest::RunManifest;
use crate::report::tables;
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

/// Prefix of every generated output name. Files carrying it are ignored on input.
pub const OUTPUT_PREFIX: &str = "BovHEAT";

/// Base name used when the user does not choose one.
pub fn default_base_name(params: &AnalysisParams, now: NaiveDateTime) -> String {
    format!(
        "{OUTPUT_PREFIX}_start{}_stop{}_t{}_m{}_{}",
        params.start_dim,
        params.stop_dim,
        params.threshold,
        params.min_heat_length,
        now.format("%Y-%m-%d_%H-%M-%S")
    )
}

/// Errors that can occur while writing results.
#[derive(Debug)]
pub enum ReportError {
    Io(String),
    Csv(String),
    Serialize(String),
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportError::Io(e) => write!(f, "IO error: {e}"),
            ReportError::Csv(e) => write!(f, "CSV error: {e}"),
            ReportError::Serialize(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ReportError {}

impl From<csv::Error> for ReportError {
    fn from(e: csv::Error) -> Self {
        ReportError::Csv(e.to_string())
    }
}

/// Writes the result tables of a run under a common base name.
pub struct ReportWriter {
    output_dir: PathBuf,
    base_name: String,
    include_windows: bool,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>, base_name: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            base_name: base_name.into(),
            include_windows: true,
        }
    }

    /// Skip the (large) per-step window table.
    pub fn without_windows(mut self) -> Self {
        self.include_windows = false;
        self
    }

    fn path(&self, suffix: &str) -> PathBuf {
        self.output_dir.join(format!("{}{suffix}", self.base_name))
    }

    /// File names that [`write_tables`](Self::write_tables) will produce.
    pub fn planned_files(&self) -> Vec<String> {
        let mut names = vec![
            format!("{}_long.csv", self.base_name),
            format!("{}_wide.csv", self.base_name),
        ];
        if self.include_windows {
            names.push(format!("{}_windows.csv", self.base_name));
        }
        names
    }

    /// Write the long, wide and (optionally) window tables.
    pub fn write_tables(&self, output: &PipelineOutput) -> Result<Vec<PathBuf>, ReportError> {
        std::fs::create_dir_all(&self.output_dir).map_err(|e| ReportError::Io(e.to_string()))?;

        let mut written = Vec::new();

        let long = self.path("_long.csv");
        write_csv(&long, &tables::long_headers(), &tables::long_records(&output.heats))?;
        written.push(long);

        let wide_rows = tables::to_wide(&output.heats);
        let max_episodes = wide_rows.iter().map(|r| r.episodes.len()).max().unwrap_or(0);
        let wide = self.path("_wide.csv");
        write_csv(
            &wide,
            &tables::wide_headers(max_episodes),
            &tables::wide_records(&wide_rows, max_episodes),
        )?;
        written.push(wide);

        if self.include_windows {
            let windows = self.path("_windows.csv");
            write_csv(
                &windows,
                &tables::window_headers(),
                &tables::window_records(&output.windows),
            )?;
            written.push(windows);
        }

        Ok(written)
    }

    /// Write the run manifest as pretty JSON.
    pub fn write_manifest(&self, manifest: &RunManifest) -> Result<PathBuf, ReportError> {
        let path = self.path(".json");
        let json = serde_json::to_string_pretty(manifest)
            .map_err(|e| ReportError::Serialize(e.to_string()))?;
        std::fs::write(&path, json).map_err(|e| ReportError::Io(e.to_string()))?;
        Ok(path)
    }
}

fn write_csv(path: &Path, headers: &[String], records: &[Vec<String>]) -> Result<(), ReportError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(headers)?;
    for record in records {
        writer.write_record(record)?;
    }
    writer.flush().map_err(|e| ReportError::Io(e.to_string()))?;
    tracing::debug!(path = %path.display(), rows = records.len(), "table written");
    Ok(())
}
