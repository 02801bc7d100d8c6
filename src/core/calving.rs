//! Calving date inference.
//!
//! Sensors do not record the calving itself, only the days in lactation
//! (DIM) elapsed since then. The calving date of a lactation is recovered
//! from the reading with the lowest DIM.

use crate::ingest::Observation;
use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The inferred calving date of one lactation of one animal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LactationCycle {
    pub lactation: u32,
    /// Midnight of the calving day, `None` when it could not be inferred
    pub calving_date: Option<NaiveDateTime>,
}

/// Infer the calving date from the rows of one lactation.
///
/// Returns `None` if no row carries a DIM value, the lowest DIM is
/// negative, or it reaches back beyond the representable calendar. Row order
/// does not matter.
pub fn estimate_calving_date(rows: &[Observation]) -> Option<NaiveDateTime> {
    let (dim, timestamp) = rows
        .iter()
        .filter_map(|obs| obs.dim.map(|dim| (dim, obs.timestamp)))
        .min_by_key(|(dim, _)| *dim)?;

    if dim < 0 {
        return None;
    }

    let calving = timestamp.checked_sub_signed(Duration::try_days(dim)?)?;
    Some(calving.date().and_time(NaiveTime::MIN))
}

/// Infer the calving date of every lactation found in a cleaned series.
pub fn estimate_cycles(series: &[Observation]) -> Vec<LactationCycle> {
    let mut groups: BTreeMap<u32, Vec<Observation>> = BTreeMap::new();
    for obs in series {
        if let Some(lactation) = obs.lactation {
            groups.entry(lactation).or_default().push(obs.clone());
        }
    }

    groups
        .into_iter()
        .map(|(lactation, rows)| LactationCycle {
            lactation,
            calving_date: estimate_calving_date(&rows),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2015, 2, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn row(ts: NaiveDateTime, dim: Option<i64>) -> Observation {
        let mut obs = Observation::new("1", "1", ts).with_lactation(1);
        obs.dim = dim;
        obs
    }

    #[test]
    fn test_basic_example() {
        let rows = vec![row(at(20, 10), Some(2))];
        assert_eq!(estimate_calving_date(&rows), Some(at(18, 0)));
    }

    #[test]
    fn test_uses_lowest_dim_not_earliest_time() {
        let rows = vec![row(at(20, 10), Some(100)), row(at(23, 10), Some(20))];
        assert_eq!(estimate_calving_date(&rows), Some(at(3, 0)));
    }

    #[test]
    fn test_row_order_does_not_matter() {
        let rows = vec![
            row(at(10, 4), Some(5)),
            row(at(12, 6), Some(7)),
            row(at(9, 22), Some(4)),
            row(at(11, 0), None),
        ];
        let expected = estimate_calving_date(&rows);
        assert_eq!(expected, Some(at(5, 0)));

        let mut reversed = rows.clone();
        reversed.reverse();
        assert_eq!(estimate_calving_date(&reversed), expected);

        let rotated: Vec<_> = rows[2..].iter().chain(&rows[..2]).cloned().collect();
        assert_eq!(estimate_calving_date(&rotated), expected);
    }

    #[test]
    fn test_missing_dim_not_found() {
        assert_eq!(estimate_calving_date(&[row(at(20, 10), None)]), None);
        assert_eq!(estimate_calving_date(&[]), None);
    }

    #[test]
    fn test_negative_dim_not_found() {
        let rows = vec![row(at(20, 10), Some(-3)), row(at(25, 10), Some(2))];
        assert_eq!(estimate_calving_date(&rows), None);
    }

    #[test]
    fn test_oversized_dim_not_found() {
        assert_eq!(estimate_calving_date(&[row(at(20, 10), Some(1_000_000_000_000))]), None);
        assert_eq!(estimate_calving_date(&[row(at(20, 10), Some(i64::MAX))]), None);
    }

    #[test]
    fn test_cycles_per_lactation() {
        let mut second = row(at(25, 8), Some(1));
        second.lactation = Some(2);
        let series = vec![row(at(10, 8), Some(3)), second];

        let cycles = estimate_cycles(&series);
        assert_eq!(
            cycles,
            vec![
                LactationCycle {
                    lactation: 1,
                    calving_date: Some(at(7, 0)),
                },
                LactationCycle {
                    lactation: 2,
                    calving_date: Some(at(24, 0)),
                },
            ]
        );
    }
}
