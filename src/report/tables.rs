//! Tabular projections of pipeline output.
//!
//! - The long table has one row per heat (or placeholder) per window.
//! - The wide table has one row per window with the heats spread over
//!   numbered columns (`start_ts1`, `stop_ts1`, ..., `start_ts2`, ...).
//! - The window table has one row per grid step, for plotting.

use crate::core::{HeatEpisode, HeatResult, WindowResult};
use chrono::NaiveDateTime;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Leading columns shared by the long and the wide table.
pub const WINDOW_COLUMNS: [&str; 7] = [
    "folder",
    "subject",
    "lactation",
    "calving_date",
    "usable_pct",
    "max_activity",
    "episode_count",
];

/// Per-heat columns, suffixed with the heat number in the wide table.
pub const EPISODE_COLUMNS: [&str; 7] = [
    "start_ts",
    "stop_ts",
    "duration_hours",
    "peak_activity",
    "peak_dim",
    "peak_ts",
    "short_inter_estrus",
];

pub const WINDOW_TABLE_COLUMNS: [&str; 8] = [
    "folder",
    "subject",
    "lactation",
    "calving_date",
    "timestamp",
    "activity",
    "interpolated",
    "dim",
];

fn ts(value: NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn pct(value: f64) -> String {
    format!("{value:.2}")
}

fn episode_cells(episode: Option<&HeatEpisode>) -> Vec<String> {
    match episode {
        Some(e) => vec![
            ts(e.start_ts),
            ts(e.stop_ts),
            e.duration_hours.to_string(),
            e.peak_activity.to_string(),
            opt(e.peak_dim),
            ts(e.peak_ts),
            e.short_inter_estrus.to_string(),
        ],
        None => vec![String::new(); EPISODE_COLUMNS.len()],
    }
}

/// Header of the long table.
pub fn long_headers() -> Vec<String> {
    WINDOW_COLUMNS
        .iter()
        .chain(["episode_no"].iter())
        .chain(EPISODE_COLUMNS.iter())
        .map(|c| c.to_string())
        .collect()
}

/// Rows of the long table.
pub fn long_records(heats: &[HeatResult]) -> Vec<Vec<String>> {
    heats
        .iter()
        .map(|h| {
            let record = &h.record;
            let episode = record.episode.as_ref();
            let mut row = vec![
                h.folder.clone(),
                h.subject.clone(),
                h.lactation.to_string(),
                ts(record.calving_date),
                pct(record.usable_pct),
                opt(record.max_activity),
                record.episode_count.to_string(),
                opt(episode.map(|e| e.episode_no)),
            ];
            row.extend(episode_cells(episode));
            row
        })
        .collect()
}

/// One window with all its heats.
#[derive(Debug, Clone, PartialEq)]
pub struct WideRow {
    pub folder: String,
    pub subject: String,
    pub lactation: u32,
    pub calving_date: NaiveDateTime,
    pub usable_pct: f64,
    pub max_activity: Option<f64>,
    pub episode_count: usize,
    pub episodes: Vec<HeatEpisode>,
}

/// Pivot the long table to one row per (folder, animal, lactation).
pub fn to_wide(heats: &[HeatResult]) -> Vec<WideRow> {
    let mut rows: Vec<WideRow> = Vec::new();

    for h in heats {
        let same_window = rows.last().is_some_and(|last| {
            last.folder == h.folder && last.subject == h.subject && last.lactation == h.lactation
        });
        if !same_window {
            rows.push(WideRow {
                folder: h.folder.clone(),
                subject: h.subject.clone(),
                lactation: h.lactation,
                calving_date: h.record.calving_date,
                usable_pct: h.record.usable_pct,
                max_activity: h.record.max_activity,
                episode_count: h.record.episode_count,
                episodes: Vec::new(),
            });
        }
        if let (Some(row), Some(episode)) = (rows.last_mut(), &h.record.episode) {
            row.episodes.push(episode.clone());
        }
    }

    rows
}

/// Header of the wide table for windows with at most `max_episodes` heats.
pub fn wide_headers(max_episodes: usize) -> Vec<String> {
    let mut headers: Vec<String> = WINDOW_COLUMNS.iter().map(|c| c.to_string()).collect();
    for n in 1..=max_episodes {
        headers.extend(EPISODE_COLUMNS.iter().map(|c| format!("{c}{n}")));
    }
    headers
}

/// Rows of the wide table, padded to `max_episodes` heats.
pub fn wide_records(rows: &[WideRow], max_episodes: usize) -> Vec<Vec<String>> {
    rows.iter()
        .map(|r| {
            let mut cells = vec![
                r.folder.clone(),
                r.subject.clone(),
                r.lactation.to_string(),
                ts(r.calving_date),
                pct(r.usable_pct),
                opt(r.max_activity),
                r.episode_count.to_string(),
            ];
            for n in 0..max_episodes {
                cells.extend(episode_cells(r.episodes.get(n)));
            }
            cells
        })
        .collect()
}

pub fn window_headers() -> Vec<String> {
    WINDOW_TABLE_COLUMNS.iter().map(|c| c.to_string()).collect()
}

/// Rows of the window table.
pub fn window_records(windows: &[WindowResult]) -> Vec<Vec<String>> {
    windows
        .iter()
        .flat_map(|w| {
            w.window.rows.iter().map(move |row| {
                vec![
                    w.folder.clone(),
                    w.subject.clone(),
                    row.lactation.to_string(),
                    ts(row.calving_date),
                    ts(row.timestamp),
                    opt(row.activity),
                    row.interpolated.to_string(),
                    opt(row.dim),
                ]
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::HeatRecord;
    use chrono::{Duration, NaiveDate};

    fn calving() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2015, 2, 20)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn episode(no: u32, start_hour: i64) -> HeatEpisode {
        let start = calving() + Duration::hours(start_hour);
        HeatEpisode {
            episode_no: no,
            start_ts: start,
            stop_ts: start + Duration::hours(2),
            duration_hours: 4,
            peak_activity: 50.0,
            peak_dim: Some(1),
            peak_ts: start,
            short_inter_estrus: false,
        }
    }

    fn result(subject: &str, count: usize, episode: Option<HeatEpisode>) -> HeatResult {
        HeatResult {
            folder: "farm".to_string(),
            subject: subject.to_string(),
            lactation: 1,
            record: HeatRecord {
                calving_date: calving(),
                usable_pct: 87.5,
                max_activity: episode.as_ref().map(|e| e.peak_activity),
                episode_count: count,
                episode,
            },
        }
    }

    #[test]
    fn test_long_table_placeholder_has_empty_episode_cells() {
        let records = long_records(&[result("1", 0, None)]);

        assert_eq!(records[0].len(), long_headers().len());
        assert_eq!(records[0][4], "87.50");
        assert_eq!(records[0][6], "0");
        assert!(records[0][7..].iter().all(|c| c.is_empty()));
    }

    #[test]
    fn test_wide_pivot() {
        let heats = vec![
            result("1", 2, Some(episode(1, 24))),
            result("1", 2, Some(episode(2, 48))),
            result("2", 0, None),
        ];

        let wide = to_wide(&heats);
        assert_eq!(wide.len(), 2);
        assert_eq!(wide[0].episodes.len(), 2);
        assert!(wide[1].episodes.is_empty());

        let headers = wide_headers(2);
        assert_eq!(headers.len(), 7 + 2 * 7);
        assert_eq!(headers[7], "start_ts1");
        assert_eq!(headers[14], "start_ts2");

        let records = wide_records(&wide, 2);
        assert_eq!(records[0][7], "2015-02-21 00:00:00");
        assert_eq!(records[0][14], "2015-02-22 00:00:00");
        assert!(records[1][7..].iter().all(|c| c.is_empty()));
        assert!(records.iter().all(|r| r.len() == headers.len()));
    }
}
