//! Discovery and parsing of activity sensor exports.
//!
//! Every spreadsheet export (`.xlsx`, `.xls`) or `.csv` file below the input
//! directory is read into [`Observation`]s. Workbooks are read from their
//! first worksheet.
//! Files are parsed on a small pool of worker threads; results are collected
//! back in discovery order so a run is deterministic regardless of the
//! number of workers.

use crate::ingest::headers::{Column, ColumnIndex, HeaderLanguage};
use crate::ingest::types::Observation;
use crate::report::OUTPUT_PREFIX;
use crate::stats::SharedRunStats;
use calamine::{open_workbook_auto, Data, DataType, Reader};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use crossbeam_channel::unbounded;
use std::path::{Path, PathBuf};

/// File name prefixes that are never treated as input.
const IGNORED_PREFIXES: [&str; 3] = [".", "~", OUTPUT_PREFIX];

/// Accepted file extensions, matched case-insensitively.
const EXPORT_EXTENSIONS: [&str; 3] = ["xlsx", "xls", "csv"];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d.%m.%Y", "%m/%d/%Y"];

const TIME_FORMATS: [&str; 3] = ["%H:%M:%S", "%H:%M", "%H:%M:%S%.f"];

/// Errors that can occur while reading exports.
#[derive(Debug)]
pub enum IngestError {
    /// Filesystem error
    Io(String),
    /// Malformed CSV content
    Csv(String),
    /// Workbook that cannot be opened or has no worksheet
    Spreadsheet(String),
    /// One or more mandatory columns are not present
    MissingColumns(Vec<String>),
    /// Nothing usable was read at all
    NoUsableData(String),
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestError::Io(e) => write!(f, "IO error: {e}"),
            IngestError::Csv(e) => write!(f, "CSV error: {e}"),
            IngestError::Spreadsheet(e) => write!(f, "Spreadsheet error: {e}"),
            IngestError::MissingColumns(cols) => {
                write!(f, "Missing mandatory columns: {}", cols.join(", "))
            }
            IngestError::NoUsableData(msg) => write!(f, "No usable data: {msg}"),
        }
    }
}

impl std::error::Error for IngestError {}

impl From<csv::Error> for IngestError {
    fn from(e: csv::Error) -> Self {
        IngestError::Csv(e.to_string())
    }
}

/// An export file together with the folder it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub folder: String,
}

impl SourceFile {
    pub fn new(path: PathBuf) -> Self {
        let folder = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, folder }
    }

    fn is_csv(&self) -> bool {
        self.path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Observations parsed from one file.
#[derive(Debug, Default)]
pub struct FileTable {
    pub observations: Vec<Observation>,
    /// Rows dropped because the date or time could not be parsed
    pub rejected: u64,
}

/// Find all export files below `root`, sorted by path.
pub fn discover_files(root: &Path) -> Result<Vec<SourceFile>, IngestError> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = std::fs::read_dir(&dir)
            .map_err(|e| IngestError::Io(format!("{}: {e}", dir.display())))?;
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else if is_export_file(&path) {
                files.push(SourceFile::new(path));
            }
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

fn is_export_file(path: &Path) -> bool {
    let name = match path.file_name() {
        Some(name) => name.to_string_lossy(),
        None => return false,
    };
    let is_export = path
        .extension()
        .map(|e| EXPORT_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false);
    is_export && !IGNORED_PREFIXES.iter().any(|p| name.starts_with(p))
}

/// Parse the contents of one export.
pub fn parse_export(
    content: &str,
    folder: &str,
    language: HeaderLanguage,
) -> Result<FileTable, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(content))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    collect_table(&headers, reader.records(), folder, language)
}

/// Parse the first worksheet of an `.xlsx` or `.xls` workbook.
pub fn parse_workbook(
    path: &Path,
    folder: &str,
    language: HeaderLanguage,
) -> Result<FileTable, IngestError> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| IngestError::Spreadsheet(e.to_string()))?;
    let sheet = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| IngestError::Spreadsheet("workbook has no worksheet".to_string()))?
        .map_err(|e| IngestError::Spreadsheet(e.to_string()))?;

    let mut rows = sheet
        .rows()
        .map(|row| row.iter().map(cell_text).collect::<csv::StringRecord>());
    let headers = rows
        .next()
        .ok_or_else(|| IngestError::Spreadsheet("worksheet is empty".to_string()))?;
    collect_table(&headers, rows.map(Ok::<_, csv::Error>), folder, language)
}

/// Text of a worksheet cell as it would appear in a CSV export.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        Data::DateTime(_) => cell
            .as_datetime()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default(),
        other => other.to_string(),
    }
}

fn collect_table<I>(
    headers: &csv::StringRecord,
    records: I,
    folder: &str,
    language: HeaderLanguage,
) -> Result<FileTable, IngestError>
where
    I: IntoIterator<Item = Result<csv::StringRecord, csv::Error>>,
{
    let index = language
        .locate(headers.iter())
        .map_err(|missing| IngestError::MissingColumns(missing.into_iter().map(String::from).collect()))?;

    let mut table = FileTable::default();
    for record in records {
        let record = record?;
        match parse_row(&record, &index, folder) {
            Row::Valid(obs) => table.observations.push(obs),
            Row::Rejected => table.rejected += 1,
            Row::Empty => {}
        }
    }

    Ok(table)
}

enum Row {
    Valid(Observation),
    Rejected,
    Empty,
}

fn parse_row(record: &csv::StringRecord, index: &ColumnIndex, folder: &str) -> Row {
    let cell = |column: Column| record.get(index.position(column)).unwrap_or("");
    let subject = normalize_subject(cell(Column::Subject));
    let time = cell(Column::Time);
    // Empty rows and footers carry neither an animal nor a time.
    if subject.is_empty() || time.is_empty() {
        return Row::Empty;
    }

    let timestamp = match parse_timestamp(cell(Column::Date), time) {
        Some(ts) => ts,
        None => return Row::Rejected,
    };

    let mut obs = Observation::new(folder, subject, timestamp);
    obs.activity = parse_number(cell(Column::Activity));
    obs.dim = parse_number(cell(Column::Dim)).map(|v| v.round() as i64);
    obs.lactation = parse_number(cell(Column::Lactation))
        .filter(|v| *v >= 0.0)
        .map(|v| v.round() as u32);
    Row::Valid(obs)
}

fn sniff_delimiter(content: &str) -> u8 {
    let header = content.lines().next().unwrap_or("");
    if header.matches(';').count() > header.matches(',').count() {
        b';'
    } else {
        b','
    }
}

/// Spreadsheet exports store integral ids as floats, e.g. `12345.0`.
fn normalize_subject(raw: &str) -> String {
    let raw = raw.trim();
    match raw.strip_suffix(".0") {
        Some(int) if !int.is_empty() && int.chars().all(|c| c.is_ascii_digit()) => int.to_string(),
        _ => raw.to_string(),
    }
}

/// Combine a date cell and a time cell into a timestamp.
///
/// A time part in the date cell and a date part in the time cell (as
/// spreadsheets store time-only values) are ignored.
pub fn parse_timestamp(date: &str, time: &str) -> Option<NaiveDateTime> {
    let date_part = date.split_whitespace().next()?;
    let time_part = time.split_whitespace().last()?;
    let date = DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(date_part, f).ok())?;
    let time = TIME_FORMATS
        .iter()
        .find_map(|f| NaiveTime::parse_from_str(time_part, f).ok())?;
    Some(date.and_time(time))
}

/// Parse a numeric cell, accepting a decimal comma.
pub fn parse_number(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let normalized = if raw.contains(',') && !raw.contains('.') {
        raw.replace(',', ".")
    } else {
        raw.to_string()
    };
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Reads every export below a directory into one observation table.
pub struct SourceReader {
    language: HeaderLanguage,
    workers: usize,
    stats: SharedRunStats,
}

impl SourceReader {
    /// Create a reader. `cores` of 0 picks the available parallelism minus one.
    pub fn new(language: HeaderLanguage, cores: usize, stats: SharedRunStats) -> Self {
        Self {
            language,
            workers: resolve_workers(cores),
            stats,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Read all files in `files`, skipping the ones that cannot be parsed.
    ///
    /// Fails only when no file produced any observation.
    pub fn read_all(&self, files: &[SourceFile]) -> Result<Vec<Observation>, IngestError> {
        self.stats.record_files_found(files.len() as u64);

        let results = if self.workers <= 1 || files.len() <= 1 {
            files.iter().map(|f| self.read_one(f)).collect()
        } else {
            self.read_parallel(files)
        };

        let mut observations = Vec::new();
        for (file, result) in files.iter().zip(results) {
            match result {
                Ok(table) => {
                    println!("{}", file.file_name());
                    self.stats
                        .record_file_read(table.observations.len() as u64, table.rejected);
                    observations.extend(table.observations);
                }
                Err(e) => {
                    println!("{} ...SKIPPED", file.file_name());
                    tracing::warn!(file = %file.path.display(), error = %e, "skipping export");
                    self.stats.record_file_skipped();
                }
            }
        }

        if observations.is_empty() {
            return Err(IngestError::NoUsableData(
                "No CSV files found or readable.".to_string(),
            ));
        }

        tracing::info!(
            files = files.len(),
            observations = observations.len(),
            "ingestion finished"
        );
        Ok(observations)
    }

    fn read_one(&self, file: &SourceFile) -> Result<FileTable, IngestError> {
        if !file.is_csv() {
            return parse_workbook(&file.path, &file.folder, self.language);
        }
        let content = std::fs::read_to_string(&file.path)
            .map_err(|e| IngestError::Io(format!("{}: {e}", file.path.display())))?;
        parse_export(&content, &file.folder, self.language)
    }

    fn read_parallel(&self, files: &[SourceFile]) -> Vec<Result<FileTable, IngestError>> {
        let (job_tx, job_rx) = unbounded::<(usize, &SourceFile)>();
        let (result_tx, result_rx) = unbounded();

        for job in files.iter().enumerate() {
            // The receiver is alive until the scope below ends.
            let _ = job_tx.send(job);
        }
        drop(job_tx);

        std::thread::scope(|scope| {
            for _ in 0..self.workers.min(files.len()) {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    for (idx, file) in job_rx.iter() {
                        let _ = result_tx.send((idx, self.read_one(file)));
                    }
                });
            }
        });
        drop(result_tx);

        let mut ordered: Vec<Option<Result<FileTable, IngestError>>> =
            files.iter().map(|_| None).collect();
        for (idx, result) in result_rx.iter() {
            ordered[idx] = Some(result);
        }
        ordered
            .into_iter()
            .map(|r| r.unwrap_or_else(|| Err(IngestError::Io("worker did not report".to_string()))))
            .collect()
    }
}

fn resolve_workers(cores: usize) -> usize {
    match cores {
        0 => std::thread::available_parallelism()
            .map(|n| n.get().saturating_sub(1))
            .unwrap_or(1)
            .max(1),
        n => n,
    }
}
