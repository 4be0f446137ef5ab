#![warn(missing_docs)]
//! vitalcmp Compare - Snapshot Reconciliation
//!
//! Field-level and track-level diffing of two canonical snapshots under an
//! absolute numeric tolerance. The comparison is read-only over two
//! independently built snapshots, so running it twice yields identical
//! output, and swapping the inputs flips only the `reference`/`candidate`
//! labels inside the differences, never the match verdict.

mod diff;

pub use diff::{Comparison, Difference, ValuePair};

use std::collections::{BTreeMap, BTreeSet};

use serde_json::json;
use vitalcmp_model::{SampleValue, Snapshot, Track};

/// Maximum allowed absolute difference before two numbers are unequal.
///
/// Always absolute, never relative: observed field magnitudes are small
/// (seconds, small integers), and a relative tolerance would mask real
/// bugs at zero.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Comparison knobs.
#[derive(Debug, Clone)]
pub struct CompareConfig {
    /// Absolute numeric tolerance.
    pub tolerance: f64,
    /// Also compare record payloads element-wise. Off by default: both
    /// adapters may legitimately truncate records for cost, so the default
    /// comparison covers counts and metadata only.
    pub compare_records: bool,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            compare_records: false,
        }
    }
}

/// File-info fields reconciled in step 1.
const FILE_INFO_FIELDS: [&str; 4] = ["dt_start", "dt_end", "tracks_count", "devices_count"];

/// Diff two snapshots.
pub fn compare(reference: &Snapshot, candidate: &Snapshot, config: &CompareConfig) -> Comparison {
    let mut differences: BTreeMap<String, Difference> = BTreeMap::new();
    let mut mismatched_tracks: BTreeSet<String> = BTreeSet::new();

    // 1. File-info reconciliation.
    for field in FILE_INFO_FIELDS {
        let (ref_val, cand_val) = file_info_field(reference, candidate, field);
        if !within_tolerance(ref_val, cand_val, config.tolerance) {
            differences.insert(
                format!("file_info.{field}"),
                Difference::Pair(ValuePair {
                    reference: json!(ref_val),
                    candidate: json!(cand_val),
                }),
            );
        }
    }

    // 2. Track-set reconciliation, both ways.
    let ref_names: BTreeSet<&String> = reference.tracks.keys().collect();
    let cand_names: BTreeSet<&String> = candidate.tracks.keys().collect();

    let only_reference: Vec<String> = ref_names
        .difference(&cand_names)
        .map(|n| (*n).clone())
        .collect();
    let only_candidate: Vec<String> = cand_names
        .difference(&ref_names)
        .map(|n| (*n).clone())
        .collect();

    if !only_reference.is_empty() {
        mismatched_tracks.extend(only_reference.iter().cloned());
        differences.insert(
            "tracks_only_in_reference".to_string(),
            Difference::Names(only_reference),
        );
    }
    if !only_candidate.is_empty() {
        mismatched_tracks.extend(only_candidate.iter().cloned());
        differences.insert(
            "tracks_only_in_candidate".to_string(),
            Difference::Names(only_candidate),
        );
    }

    // 3. Per-track field reconciliation on the intersection.
    for name in ref_names.intersection(&cand_names) {
        let ref_track = &reference.tracks[*name];
        let cand_track = &candidate.tracks[*name];

        let track_diff = compare_track(ref_track, cand_track, config);
        if !track_diff.is_empty() {
            mismatched_tracks.insert((*name).clone());
            differences.insert(format!("track.{name}"), Difference::Fields(track_diff));
        }
    }

    // 4. Overall verdict.
    let is_match = differences.is_empty();
    Comparison {
        is_match,
        mismatched_tracks,
        differences,
    }
}

fn file_info_field(reference: &Snapshot, candidate: &Snapshot, field: &str) -> (f64, f64) {
    let pick = |s: &Snapshot| match field {
        "dt_start" => s.file_info.dt_start,
        "dt_end" => s.file_info.dt_end,
        "tracks_count" => s.file_info.tracks_count as f64,
        "devices_count" => s.file_info.devices_count as f64,
        _ => unreachable!("unknown file_info field {field}"),
    };
    (pick(reference), pick(candidate))
}

fn compare_track(
    reference: &Track,
    candidate: &Track,
    config: &CompareConfig,
) -> BTreeMap<String, ValuePair> {
    let mut diff = BTreeMap::new();

    if reference.track_type != candidate.track_type {
        diff.insert(
            "type".to_string(),
            ValuePair {
                reference: json!(reference.track_type.code()),
                candidate: json!(candidate.track_type.code()),
            },
        );
    }
    if reference.fmt != candidate.fmt {
        diff.insert(
            "fmt".to_string(),
            ValuePair {
                reference: json!(reference.fmt),
                candidate: json!(candidate.fmt),
            },
        );
    }
    if reference.unit != candidate.unit {
        diff.insert(
            "unit".to_string(),
            ValuePair {
                reference: json!(reference.unit),
                candidate: json!(candidate.unit),
            },
        );
    }
    if !within_tolerance(reference.sample_rate, candidate.sample_rate, config.tolerance) {
        diff.insert(
            "sample_rate".to_string(),
            ValuePair {
                reference: json!(reference.sample_rate),
                candidate: json!(candidate.sample_rate),
            },
        );
    }
    if !within_tolerance(
        reference.records_count as f64,
        candidate.records_count as f64,
        config.tolerance,
    ) {
        diff.insert(
            "records_count".to_string(),
            ValuePair {
                reference: json!(reference.records_count),
                candidate: json!(candidate.records_count),
            },
        );
    }

    if config.compare_records {
        if let Some((index, pair)) = first_record_divergence(reference, candidate, config.tolerance)
        {
            diff.insert(format!("records[{index}]"), pair);
        }
    }

    diff
}

/// Extended mode: element-wise record comparison over the common prefix.
///
/// Both adapters may truncate independently, so only indexes present on
/// both sides are comparable; the first divergence is reported (the full
/// list would dwarf the rest of the diff on waveform tracks).
fn first_record_divergence(
    reference: &Track,
    candidate: &Track,
    tolerance: f64,
) -> Option<(usize, ValuePair)> {
    let common = reference.records.len().min(candidate.records.len());
    for index in 0..common {
        let ref_rec = &reference.records[index];
        let cand_rec = &candidate.records[index];

        let timestamps_match = within_tolerance(ref_rec.timestamp, cand_rec.timestamp, tolerance);
        let values_match = sample_values_match(&ref_rec.value, &cand_rec.value, tolerance);
        if !timestamps_match || !values_match {
            return Some((
                index,
                ValuePair {
                    reference: serde_json::to_value(ref_rec).unwrap_or_default(),
                    candidate: serde_json::to_value(cand_rec).unwrap_or_default(),
                },
            ));
        }
    }
    None
}

fn sample_values_match(reference: &SampleValue, candidate: &SampleValue, tolerance: f64) -> bool {
    match (reference, candidate) {
        (SampleValue::Number(a), SampleValue::Number(b)) => within_tolerance(*a, *b, tolerance),
        (SampleValue::Text(a), SampleValue::Text(b)) => a == b,
        (SampleValue::Wave(a), SampleValue::Wave(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|(x, y)| within_tolerance(*x, *y, tolerance))
        }
        _ => false,
    }
}

/// Absolute-tolerance equality. A difference of exactly `tolerance` still
/// matches; only strictly greater differences are mismatches.
fn within_tolerance(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}
