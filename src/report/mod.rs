//! Reporting of analysis results.
//!
//! Results are written as CSV tables (long, wide and per-step windows) plus
//! a JSON manifest describing the run.

pub mod manifest;
pub mod tables;
pub mod writer;

pub use manifest::{ManifestBuilder, ResultSummary, RunManifest, PRODUCER_NAME};
pub use tables::{to_wide, WideRow};
pub use writer::{default_base_name, ReportError, ReportWriter, OUTPUT_PREFIX};
