//! BovHEAT - heat detection on dairy cow activity sensor exports.
//!
//! This library reads per-animal activity exports, infers calving dates,
//! cuts calving-aligned observation windows and detects heats (periods of
//! elevated activity) in them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          BovHEAT                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │   Ingest    │──▶│   Cleaner   │──▶│   Calving   │       │
//! │  │ (xlsx, csv) │   │ (per cow)   │   │  (DIM → t0) │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │         │                                    │              │
//! │         ▼                                    ▼              │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │  Run Stats  │   │    Heats    │◀──│  Windowing  │       │
//! │  │             │   │ (threshold) │   │  (2h grid)  │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │         │                 │                                 │
//! │         ▼                 ▼                                 │
//! │  ┌───────────────────────────────┐                         │
//! │  │  Report (CSV tables, manifest) │                         │
//! │  └───────────────────────────────┘                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use bovheat::{create_shared_stats, discover_files, AnalysisParams, Pipeline, SourceReader};
//! use std::path::Path;
//!
//! let params = AnalysisParams::default();
//! let stats = create_shared_stats();
//!
//! let files = discover_files(Path::new("exports")).expect("Failed to list exports");
//! let reader = SourceReader::new(params.language, 0, stats.clone());
//! let observations = reader.read_all(&files).expect("No usable exports");
//!
//! let output = Pipeline::with_stats(&params, stats)
//!     .run(&observations)
//!     .expect("Pipeline failed");
//! println!("{} heats detected", output.episode_count());
//! ```

pub mod config;
pub mod core;
pub mod ingest;
pub mod report;
pub mod stats;

// Re-export key types at crate root for convenience
pub use config::{AnalysisParams, Config, ConfigError};
pub use core::{
    HeatDetector, HeatEpisode, HeatRecord, HeatResult, ObservationWindow, Pipeline, PipelineError,
    PipelineOutput, WindowExtractor,
};
pub use ingest::{discover_files, HeaderLanguage, IngestError, Observation, SourceReader};
pub use report::{default_base_name, ManifestBuilder, ReportError, ReportWriter, RunManifest};
pub use stats::{create_shared_stats, RunStats, SharedRunStats, StatsSnapshot};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Help text shown before the interactive prompts.
pub const INTERACTIVE_BANNER: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║                     BovHEAT - interactive mode                   ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  Place the activity exports (xlsx, xls or csv) of one herd in a  ║
║  folder per farm below the analysis directory.                   ║
║                                                                  ║
║  You will be asked for:                                          ║
║    • the column header language of the exports (eng / ger)       ║
║    • start and stop of the observation window in days in milk    ║
║    • the activity threshold (0-100)                              ║
║    • the minimum heat length in 2h observations (1-100)          ║
║                                                                  ║
║  Run `bovheat run --help` to pass these as options instead.      ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interactive_banner_contents() {
        assert!(INTERACTIVE_BANNER.contains("interactive mode"));
        assert!(INTERACTIVE_BANNER.contains("threshold"));
        assert!(INTERACTIVE_BANNER.contains("bovheat run --help"));
    }
}
