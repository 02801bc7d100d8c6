//! Core analysis for BovHEAT.
//!
//! This module contains:
//! - Cleaning of per-animal observation series
//! - Calving date inference from days in lactation
//! - Calving-aligned observation windows with gap interpolation
//! - Heat detection on observation windows
//! - The pipeline composing all of the above

pub mod calving;
pub mod heats;
pub mod pipeline;
pub mod series;
pub mod windowing;

// Re-export commonly used types
pub use calving::{estimate_calving_date, estimate_cycles, LactationCycle};
pub use heats::{HeatDetector, HeatEpisode, HeatRecord, MIN_INTER_ESTRUS_HOURS};
pub use pipeline::{HeatResult, Pipeline, PipelineError, PipelineOutput, WindowResult};
pub use series::{clean_series, Cleaned};
pub use windowing::{ObservationWindow, WindowExtractor, WindowRow, STEP_HOURS};
