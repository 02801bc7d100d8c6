//! Ingestion of activity sensor exports.
//!
//! This module provides:
//! - The [`Observation`] record every export row is turned into
//! - The English and German column header vocabularies
//! - Discovery and (parallel) parsing of export files

pub mod headers;
pub mod reader;
pub mod types;

// Re-export commonly used types
pub use headers::{Column, HeaderLanguage};
pub use reader::{discover_files, parse_export, IngestError, SourceFile, SourceReader};
pub use types::{Observation, SubjectKey};
