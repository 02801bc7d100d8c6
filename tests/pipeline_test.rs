//! End-to-end tests: exports on disk through ingestion, analysis and reporting.

use bovheat::{
    core::{Pipeline, PipelineError},
    ingest::{discover_files, HeaderLanguage, IngestError, SourceReader},
    report::{ManifestBuilder, ReportWriter},
    stats::create_shared_stats,
    AnalysisParams,
};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::fs;
use std::path::Path;

const ENG_HEADER: &str =
    "Cow Number,Date,Time,Activity Change,Lactation Number,Days in Lactation";

fn ts(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

/// Three days of 2h observations starting two days after a calving on
/// 2015-02-20, with a heat on the third day and one missing observation.
fn heat_export(subject: &str) -> String {
    let first = ts(2015, 2, 22, 0);
    let mut lines = vec![ENG_HEADER.to_string()];
    for i in (0..36i64).filter(|i| *i != 20) {
        let at = first + Duration::hours(2 * i);
        let activity = if (12..=14).contains(&i) { "60" } else { "5" };
        lines.push(format!(
            "{subject},{},{},{activity},1,{}",
            at.format("%Y-%m-%d"),
            at.format("%H:%M:%S"),
            2 + (2 * i) / 24
        ));
    }
    lines.join("\n")
}

/// The same animal id used for two cows: every timestamp appears twice.
fn conflicting_export() -> String {
    let mut lines = vec![ENG_HEADER.to_string()];
    for i in 0..4 {
        for activity in [3, 40] {
            lines.push(format!("7,2015-03-01,{:02}:00:00,{activity},2,12", 2 * i));
        }
    }
    lines.join("\n")
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn params(start_dim: i64, stop_dim: i64) -> AnalysisParams {
    AnalysisParams {
        start_dim,
        stop_dim,
        ..AnalysisParams::default()
    }
}

#[test]
fn test_exports_to_reports() {
    let input = tempfile::tempdir().unwrap();
    write(input.path(), "farm_a/cow1.csv", &heat_export("1"));
    write(input.path(), "farm_a/broken.csv", "Cow Number,Date\n1,2015-02-22\n");
    write(input.path(), "farm_b/cow7.csv", &conflicting_export());
    write(input.path(), "BovHEAT_previous_long.csv", "ignored");

    let files = discover_files(input.path()).unwrap();
    assert_eq!(files.len(), 3);

    let params = params(0, 5);
    let stats = create_shared_stats();
    let reader = SourceReader::new(HeaderLanguage::Eng, 2, stats.clone());
    let observations = reader.read_all(&files).unwrap();
    assert_eq!(observations.len(), 35 + 8);

    let output = Pipeline::with_stats(&params, stats.clone())
        .run(&observations)
        .unwrap();

    assert_eq!(output.heats.len(), 1);
    let heat = &output.heats[0];
    assert_eq!(heat.folder, "farm_a");
    assert_eq!(heat.subject, "1");
    assert_eq!(heat.lactation, 1);
    assert_eq!(heat.record.calving_date, ts(2015, 2, 20, 0));
    assert!((heat.record.usable_pct - 60.0).abs() < 1e-9);
    assert_eq!(heat.record.episode_count, 1);

    let episode = heat.record.episode.as_ref().unwrap();
    assert_eq!(episode.episode_no, 1);
    assert_eq!(episode.start_ts, ts(2015, 2, 23, 0));
    assert_eq!(episode.stop_ts, ts(2015, 2, 23, 4));
    assert_eq!(episode.duration_hours, 6);
    assert_eq!(episode.peak_activity, 60.0);
    assert_eq!(episode.peak_ts, ts(2015, 2, 23, 0));
    assert_eq!(episode.peak_dim, Some(3));
    assert!(!episode.short_inter_estrus);

    assert_eq!(output.windows.len(), 1);
    let rows = &output.windows[0].window.rows;
    assert_eq!(rows.len(), 60);
    assert!(rows[..24].iter().all(|r| r.activity.is_none()));
    assert!(rows[44].interpolated);
    assert_eq!(rows[44].activity, Some(5.0));
    assert_eq!(rows[44].dim, None);

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.files_found, 3);
    assert_eq!(snapshot.files_read, 2);
    assert_eq!(snapshot.files_skipped, 1);
    assert_eq!(snapshot.subjects_cleaned, 1);
    assert_eq!(snapshot.subjects_skipped, 1);
    assert_eq!(snapshot.episodes_detected, 1);

    let out = tempfile::tempdir().unwrap();
    let writer = ReportWriter::new(out.path(), "run");
    let written = writer.write_tables(&output).unwrap();
    let manifest = ManifestBuilder::new().build(
        &params,
        stats.snapshot(),
        &output,
        writer.planned_files(),
    );
    let manifest_path = writer.write_manifest(&manifest).unwrap();

    let long = fs::read_to_string(out.path().join("run_long.csv")).unwrap();
    assert_eq!(long.lines().count(), 2);
    assert!(long.lines().nth(1).unwrap().starts_with("farm_a,1,1,2015-02-20 00:00:00,60.00,60,1,1,"));

    let wide = fs::read_to_string(out.path().join("run_wide.csv")).unwrap();
    assert!(wide.lines().next().unwrap().ends_with("short_inter_estrus1"));

    let windows = fs::read_to_string(&written[2]).unwrap();
    assert_eq!(windows.lines().count(), 61);

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(manifest_path).unwrap()).unwrap();
    assert_eq!(json["summary"]["episodes"], 1);
    assert_eq!(json["stats"]["subjects_skipped"], 1);
    assert_eq!(json["outputs"][0], "run_long.csv");
}

#[test]
fn test_german_export_with_window_before_calving() {
    let input = tempfile::tempdir().unwrap();
    let content = "\
Kuhnummer;Termin;Zeit;Aktivität ändern;Laktationnummer;Laktationstage
42.0;01.03.2016;00:00;10;3;0
42.0;01.03.2016;02:00;80,5;3;0
42.0;01.03.2016;04:00;90;3;0
42.0;01.03.2016;06:00;12;3;0
";
    write(input.path(), "hof/export.csv", content);

    let files = discover_files(input.path()).unwrap();
    let reader = SourceReader::new(HeaderLanguage::Ger, 1, create_shared_stats());
    let observations = reader.read_all(&files).unwrap();

    let output = Pipeline::new(&params(-1, 1)).run(&observations).unwrap();

    assert_eq!(output.heats.len(), 1);
    let heat = &output.heats[0];
    assert_eq!(heat.folder, "hof");
    assert_eq!(heat.subject, "42");
    assert_eq!(heat.lactation, 3);
    assert_eq!(heat.record.calving_date, ts(2016, 3, 1, 0));

    let episode = heat.record.episode.as_ref().unwrap();
    assert_eq!(episode.start_ts, ts(2016, 3, 1, 2));
    assert_eq!(episode.stop_ts, ts(2016, 3, 1, 4));
    assert_eq!(episode.peak_activity, 90.0);
    assert_eq!(heat.record.max_activity, Some(90.0));

    let rows = &output.windows[0].window.rows;
    assert_eq!(rows.len(), 24);
    assert_eq!(rows[0].timestamp, ts(2016, 2, 29, 0));
    assert_eq!(rows[12].activity, Some(10.0));
}

#[test]
fn test_lactation_without_calving_date_yields_no_rows() {
    let input = tempfile::tempdir().unwrap();
    let content = format!(
        "{ENG_HEADER}\n5,2015-02-22,00:00:00,50,1,-3\n5,2015-02-22,02:00:00,50,1,-3\n"
    );
    write(input.path(), "farm/cow5.csv", &content);

    let stats = create_shared_stats();
    let files = discover_files(input.path()).unwrap();
    let observations = SourceReader::new(HeaderLanguage::Eng, 1, stats.clone())
        .read_all(&files)
        .unwrap();

    let output = Pipeline::with_stats(&params(0, 30), stats.clone())
        .run(&observations)
        .unwrap();

    assert!(output.heats.is_empty());
    assert!(output.windows.is_empty());
    assert_eq!(stats.snapshot().calving_not_found, 1);
}

#[test]
fn test_corrupt_dim_skips_only_that_animal() {
    let input = tempfile::tempdir().unwrap();
    let mut content = heat_export("2");
    content.push_str("\n1,2015-02-22,00:00:00,50,1,1e12\n1,2015-02-22,02:00:00,50,1,1e12");
    write(input.path(), "farm/mixed.csv", &content);

    let stats = create_shared_stats();
    let files = discover_files(input.path()).unwrap();
    let observations = SourceReader::new(HeaderLanguage::Eng, 1, stats.clone())
        .read_all(&files)
        .unwrap();

    let output = Pipeline::with_stats(&params(0, 5), stats.clone())
        .run(&observations)
        .unwrap();

    assert_eq!(output.heats.len(), 1);
    assert_eq!(output.heats[0].subject, "2");
    assert_eq!(output.heats[0].record.episode_count, 1);
    assert_eq!(stats.snapshot().calving_not_found, 1);
}

#[test]
fn test_nothing_to_analyse_is_fatal() {
    let input = tempfile::tempdir().unwrap();
    write(input.path(), "farm/notes.txt", "not an export");

    let files = discover_files(input.path()).unwrap();
    assert!(files.is_empty());

    let err = SourceReader::new(HeaderLanguage::Eng, 0, create_shared_stats())
        .read_all(&files)
        .unwrap_err();
    assert!(matches!(err, IngestError::NoUsableData(_)));

    let err = Pipeline::new(&AnalysisParams::default()).run(&[]).unwrap_err();
    assert!(matches!(err, PipelineError::NoObservations));
}
