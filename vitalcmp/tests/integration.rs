//! End-to-end pipeline tests: stub reference library + shell-script
//! candidate, through decode, comparison, aggregation, and persistence.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use vitalcmp::prelude::*;
use vitalcmp::{
    process_file, run_batch, write_report, Aggregator, CancelFlag, FileStatus, RawVitalFile,
    Report, RunPolicy,
};
use vitalcmp_decode::{RawRecord, RawRecords, RawTrack};
use vitalcmp_report::{ReportMeta, RunConfig};

/// Reference stub producing the fixture the candidate script agrees with.
struct FixtureReference;

impl ReferenceLibrary for FixtureReference {
    fn open(
        &self,
        _path: &Path,
        _formats: &SampleFormatTable,
    ) -> Result<RawVitalFile, LibraryError> {
        let mut raw = RawVitalFile {
            dt_start: Some(1000.0),
            dt_end: Some(1600.0),
            dgmt: Some(0),
            ..Default::default()
        };
        raw.trks.insert(
            "HR".to_string(),
            RawTrack {
                track_type: Some(2),
                fmt: Some(1),
                unit: Some("/min".to_string()),
                srate: Some(0.0),
                recs: RawRecords::Present(vec![RawRecord {
                    dt: Some(1000.0),
                    val: Some(vitalcmp::SampleValue::Number(72.0)),
                }]),
                ..Default::default()
            },
        );
        raw
            .trks
            .insert(
                "ECG_II".to_string(),
                RawTrack {
                    track_type: Some(1),
                    fmt: Some(1),
                    unit: Some("mV".to_string()),
                    srate: Some(500.0),
                    recs: RawRecords::Present(vec![RawRecord {
                        dt: Some(1000.0),
                        val: Some(vitalcmp::SampleValue::Wave(vec![0.1, 0.2])),
                    }]),
                    ..Default::default()
                },
            );
        Ok(raw)
    }
}

/// Candidate payload agreeing with `FixtureReference` on everything the
/// default comparison covers.
const AGREEING_PAYLOAD: &str = r#"{"file_info":{"dt_start":1000.0,"dt_end":1600.0,"duration":600.0,"gmt_offset":0,"tracks_count":2,"devices_count":0},"tracks":{"HR":{"type":2,"fmt":1,"unit":"/min","sample_rate":0.0,"records_count":1},"ECG_II":{"type":1,"fmt":1,"unit":"mV","sample_rate":500.0,"records_count":1}}}"#;

/// Same shape, but one track renamed and one unit changed.
const DIVERGING_PAYLOAD: &str = r#"{"file_info":{"dt_start":1000.0,"dt_end":1600.0,"duration":600.0,"gmt_offset":0,"tracks_count":2,"devices_count":0},"tracks":{"HR":{"type":2,"fmt":1,"unit":"bpm","sample_rate":0.0,"records_count":1},"PLETH":{"type":1,"fmt":1,"unit":"mV","sample_rate":500.0,"records_count":1}}}"#;

fn write_script(dir: &TempDir, name: &str, payload: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, format!("#!/bin/sh\nprintf '%s' '{payload}'\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

fn candidate_for(script: PathBuf) -> CandidateAdapter {
    let mut options = CandidateOptions::new(script);
    options.timeout = Duration::from_secs(10);
    CandidateAdapter::new(options)
}

fn vital_file(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, b"binary vital content").unwrap();
    path
}

fn quick_policy() -> RunPolicy {
    RunPolicy {
        timing: vitalcmp::TimingPolicy::with_iterations(2),
        compare: CompareConfig::default(),
    }
}

#[test]
fn agreeing_decoders_match_end_to_end() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "candidate", AGREEING_PAYLOAD);
    let reference = ReferenceAdapter::new(FixtureReference);
    let candidate = candidate_for(script);
    let file = vital_file(&dir, "case.vital");

    let result = process_file(&reference, &candidate, &file, &quick_policy());

    assert_eq!(result.status, FileStatus::Matched);
    assert!(result.accuracy_match);
    assert!(result.differences.is_empty());
    assert!(result.speedup.is_some());

    let reference_metrics = result.reference.unwrap();
    assert_eq!(reference_metrics.tracks_count, 2);
    assert_eq!(reference_metrics.total_records, 2);
    assert_eq!(reference_metrics.samples_secs.len(), 2);
    // The candidate's memory is unavailable, the payload size is not.
    let candidate_metrics = result.candidate.unwrap();
    assert_eq!(candidate_metrics.peak_memory_bytes, None);
    assert_eq!(
        candidate_metrics.payload_bytes,
        Some(AGREEING_PAYLOAD.len() as u64)
    );
}

#[test]
fn diverging_decoders_report_track_level_detail() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "candidate", DIVERGING_PAYLOAD);
    let reference = ReferenceAdapter::new(FixtureReference);
    let candidate = candidate_for(script);
    let file = vital_file(&dir, "case.vital");

    let result = process_file(&reference, &candidate, &file, &quick_policy());

    assert_eq!(result.status, FileStatus::Mismatched);
    assert!(!result.accuracy_match);
    // ECG_II exists only in the reference, PLETH only in the candidate,
    // and HR differs in unit.
    assert!(result.mismatched_tracks.contains(&"ECG_II".to_string()));
    assert!(result.mismatched_tracks.contains(&"PLETH".to_string()));
    assert!(result.mismatched_tracks.contains(&"HR".to_string()));
    assert!(result.differences.contains_key("tracks_only_in_reference"));
    assert!(result.differences.contains_key("tracks_only_in_candidate"));
    assert!(result.differences.contains_key("track.HR"));
}

#[test]
fn mixed_batch_aggregates_and_persists() {
    let dir = TempDir::new().unwrap();
    let reference = ReferenceAdapter::new(FixtureReference);

    // Candidate script that fails for one specific file name.
    let script = dir.path().join("candidate");
    std::fs::write(
        &script,
        format!(
            "#!/bin/sh\ncase \"$*\" in *broken*) echo 'cannot open' >&2; exit 2;; esac\nprintf '%s' '{AGREEING_PAYLOAD}'\n"
        ),
    )
    .unwrap();
    let mut perms = std::fs::metadata(&script).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&script, perms).unwrap();
    let candidate = candidate_for(script);

    let files = vec![
        vital_file(&dir, "a.vital"),
        vital_file(&dir, "b.vital"),
        vital_file(&dir, "broken.vital"),
    ];

    let (summary, results) = run_batch(
        &reference,
        &candidate,
        &files,
        &quick_policy(),
        1,
        &CancelFlag::detached(),
    );

    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.accuracy_matches, 2);
    assert_eq!(summary.decode_failures, 1);
    assert!(!summary.all_matched());

    let broken = results
        .iter()
        .find(|r| r.file_name == "broken.vital")
        .unwrap();
    assert_eq!(broken.status, FileStatus::Failed);
    let failure = broken.failure.as_ref().unwrap();
    assert!(failure.message.contains("cannot open"));

    // Persist and reload the full report.
    let report = Report {
        meta: ReportMeta::now(RunConfig::default()),
        summary,
        results,
    };
    let path = dir.path().join("out/report.json");
    write_report(&path, &report).unwrap();

    let reloaded: Report =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(reloaded.summary.total_files, 3);
    assert_eq!(reloaded.results.len(), 3);
}

#[test]
fn aggregator_is_reusable_outside_the_runner() {
    let mut aggregator = Aggregator::new();
    assert!(aggregator.is_empty());
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "candidate", AGREEING_PAYLOAD);
    let reference = ReferenceAdapter::new(FixtureReference);
    let candidate = candidate_for(script);
    let file = vital_file(&dir, "case.vital");

    aggregator.push(process_file(&reference, &candidate, &file, &quick_policy()));
    assert_eq!(aggregator.len(), 1);
    let (summary, _) = aggregator.finish();
    assert!(summary.all_matched());
}
