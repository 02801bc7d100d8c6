//! Cleaning of a single animal's raw observations.
//!
//! Exports are weekly and overlap at their boundaries, and the same animal
//! may appear in several files of a folder. Cleaning turns the raw rows of one
//! (folder, animal) group into a series that is strictly increasing in time.

use crate::ingest::Observation;

/// Outcome of cleaning one (folder, animal) group.
#[derive(Debug, Clone, PartialEq)]
pub enum Cleaned {
    /// Sorted series without duplicate timestamps
    Series(Vec<Observation>),
    /// Conflicting rows remain for some timestamps, so the animal id is not
    /// unique within its folder. The whole group is dropped.
    NotUnique { conflicts: usize },
}

impl Cleaned {
    /// The cleaned series, empty for a discarded group.
    pub fn into_series(self) -> Vec<Observation> {
        match self {
            Cleaned::Series(series) => series,
            Cleaned::NotUnique { .. } => Vec::new(),
        }
    }
}

/// Clean the raw rows of one (folder, animal) group.
///
/// 1. Rows without a lactation number are dropped.
/// 2. Rows are sorted by timestamp.
/// 3. Rows sharing a timestamp with another row and missing an activity value
///    are dropped (empty rows at the overlap of two weekly exports).
/// 4. Exact duplicates are dropped (same readings found in several files).
/// 5. If any timestamp still occurs twice the group is discarded.
pub fn clean_series(raw: &[Observation]) -> Cleaned {
    let mut rows: Vec<Observation> = raw
        .iter()
        .filter(|obs| obs.lactation.is_some())
        .cloned()
        .collect();

    rows.sort_by_key(|obs| obs.timestamp);

    let overlap: Vec<bool> = (0..rows.len())
        .map(|i| {
            let shared = (i > 0 && rows[i - 1].timestamp == rows[i].timestamp)
                || (i + 1 < rows.len() && rows[i + 1].timestamp == rows[i].timestamp);
            shared && rows[i].activity.is_none()
        })
        .collect();
    let mut flags = overlap.into_iter();
    rows.retain(|_| !flags.next().unwrap_or(false));

    let rows = drop_exact_duplicates(rows);

    let conflicts = rows
        .windows(2)
        .filter(|pair| pair[0].timestamp == pair[1].timestamp && pair[0].subject == pair[1].subject)
        .count();
    if conflicts > 0 {
        return Cleaned::NotUnique { conflicts };
    }

    Cleaned::Series(rows)
}

/// Keep the first occurrence of every distinct row. Expects rows sorted by timestamp.
fn drop_exact_duplicates(rows: Vec<Observation>) -> Vec<Observation> {
    let mut kept: Vec<Observation> = Vec::with_capacity(rows.len());
    let mut run_start = 0;

    for obs in rows {
        if kept
            .last()
            .map(|last| last.timestamp != obs.timestamp)
            .unwrap_or(true)
        {
            run_start = kept.len();
        }
        if !kept[run_start..].contains(&obs) {
            kept.push(obs);
        }
    }

    kept
}
