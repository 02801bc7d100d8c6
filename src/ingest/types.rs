//! Observation records as read from activity sensor exports.
//!
//! An [`Observation`] is one reading for one animal. Every value except the
//! identifiers and the timestamp may be missing in the export.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A single activity sensor reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Name of the folder the export file was found in
    pub folder: String,
    /// Animal identifier, unique within a folder
    pub subject: String,
    /// Date and time of the reading
    pub timestamp: NaiveDateTime,
    /// Activity change reported by the sensor
    pub activity: Option<f64>,
    /// Days since the most recent calving
    pub dim: Option<i64>,
    /// Lactation number
    pub lactation: Option<u32>,
}

impl Observation {
    pub fn new(folder: impl Into<String>, subject: impl Into<String>, timestamp: NaiveDateTime) -> Self {
        Self {
            folder: folder.into(),
            subject: subject.into(),
            timestamp,
            activity: None,
            dim: None,
            lactation: None,
        }
    }

    pub fn with_activity(mut self, activity: f64) -> Self {
        self.activity = Some(activity);
        self
    }

    pub fn with_dim(mut self, dim: i64) -> Self {
        self.dim = Some(dim);
        self
    }

    pub fn with_lactation(mut self, lactation: u32) -> Self {
        self.lactation = Some(lactation);
        self
    }

    /// Grouping key used for cleaning and windowing.
    pub fn subject_key(&self) -> SubjectKey {
        SubjectKey {
            folder: self.folder.clone(),
            subject: self.subject.clone(),
        }
    }
}

/// Identifies one animal within one source folder.
///
/// Keys order by folder, then by animal id. Numeric ids compare by value
/// (`9` before `10`) and sort ahead of non-numeric ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubjectKey {
    pub folder: String,
    pub subject: String,
}

impl Ord for SubjectKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folder
            .cmp(&other.folder)
            .then_with(|| compare_ids(&self.subject, &other.subject))
    }
}

impl PartialOrd for SubjectKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn compare_ids(a: &str, b: &str) -> Ordering {
    fn numeric(id: &str) -> Option<&str> {
        (!id.is_empty() && id.bytes().all(|c| c.is_ascii_digit())).then(|| id.trim_start_matches('0'))
    }
    match (numeric(a), numeric(b)) {
        (Some(x), Some(y)) => x.len().cmp(&y.len()).then_with(|| x.cmp(y)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.cmp(b))
}

impl std::fmt::Display for SubjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.folder, self.subject)
    }
}
