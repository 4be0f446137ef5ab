//! Report Data Structures

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vitalcmp_compare::{Comparison, Difference};
use vitalcmp_model::DecodeError;

/// Complete batch report: the persisted JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Run metadata.
    pub meta: ReportMeta,
    /// Aggregate statistics.
    pub summary: Summary,
    /// Per-file results, in processing order.
    pub results: Vec<FileReportResult>,
}

/// Report metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    /// Report schema version.
    pub schema_version: u32,
    /// Harness version.
    pub version: String,
    /// When the run finished.
    pub timestamp: DateTime<Utc>,
    /// Run configuration echo.
    pub config: RunConfig,
}

impl ReportMeta {
    /// Metadata for a run finishing now.
    pub fn now(config: RunConfig) -> Self {
        Self {
            schema_version: 1,
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
            config,
        }
    }
}

/// Run configuration captured in report metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    /// Timed decode iterations per file.
    pub iterations: usize,
    /// Candidate payload encoding label.
    pub encoding: String,
    /// Whether record payloads were compared element-wise.
    pub compare_records: bool,
    /// Candidate subprocess timeout in seconds.
    pub timeout_secs: u64,
    /// Parallel worker count.
    pub jobs: usize,
}

/// Verdict for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// Both decodes succeeded and the snapshots matched.
    Matched,
    /// Both decodes succeeded but the snapshots diverged.
    Mismatched,
    /// One side failed to decode; no comparison was possible.
    Failed,
}

/// Which decoder a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The in-process reference decoder.
    Reference,
    /// The candidate subprocess.
    Candidate,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Reference => write!(f, "reference"),
            Side::Candidate => write!(f, "candidate"),
        }
    }
}

/// Failure classification, mirroring the decode-error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// The decoder raised or its output did not parse.
    Decode,
    /// The candidate exited non-zero or could not be run.
    Process,
    /// The candidate hit the subprocess timeout.
    Timeout,
}

/// Recorded per-file failure with enough context to reproduce manually.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureInfo {
    /// Which side failed.
    pub side: Side,
    /// Failure classification.
    pub kind: FailureKind,
    /// Underlying message (stderr text for process failures).
    pub message: String,
}

impl FailureInfo {
    /// Classify a decode error against the side it came from.
    pub fn from_decode(side: Side, error: &DecodeError) -> Self {
        let kind = match error {
            DecodeError::Reference(_) | DecodeError::Payload { .. } => FailureKind::Decode,
            DecodeError::Spawn(_) | DecodeError::Process { .. } => FailureKind::Process,
            DecodeError::Timeout { .. } => FailureKind::Timeout,
        };
        Self {
            side,
            kind,
            message: error.to_string(),
        }
    }
}

/// Timing/memory/size measurements for one decoder on one file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SideMetrics {
    /// Arithmetic mean of the timed decode iterations, seconds.
    pub mean_secs: f64,
    /// The individual timing samples, seconds.
    pub samples_secs: Vec<f64>,
    /// Allocator peak during the decode; `None` = unavailable.
    pub peak_memory_bytes: Option<u64>,
    /// Encoded payload size; `None` when no payload exists.
    pub payload_bytes: Option<u64>,
    /// Tracks present in the snapshot.
    pub tracks_count: u64,
    /// Sum of full-decode record counts.
    pub total_records: u64,
    /// Timing samples disagreed by more than an order of magnitude.
    pub anomalous_timing: bool,
}

/// Result for one file: measurements plus the comparison verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReportResult {
    /// File name (no directory).
    pub file_name: String,
    /// Input file size in bytes.
    pub file_size_bytes: u64,
    /// Per-file verdict.
    pub status: FileStatus,
    /// True only when the comparison ran and found no differences.
    pub accuracy_match: bool,
    /// reference mean time / candidate mean time; `None` when either side
    /// has no timing.
    pub speedup: Option<f64>,
    /// Names of tracks that differed.
    pub mismatched_tracks: Vec<String>,
    /// Dotted field path -> difference.
    pub differences: BTreeMap<String, Difference>,
    /// Reference-side measurements, when that decode succeeded.
    pub reference: Option<SideMetrics>,
    /// Candidate-side measurements, when that decode succeeded.
    pub candidate: Option<SideMetrics>,
    /// The failure that prevented comparison, if any.
    pub failure: Option<FailureInfo>,
}

impl FileReportResult {
    /// Result for a file where both decodes succeeded.
    pub fn compared(
        file_name: String,
        file_size_bytes: u64,
        reference: SideMetrics,
        candidate: SideMetrics,
        comparison: Comparison,
    ) -> Self {
        let speedup = if candidate.mean_secs > 0.0 {
            Some(reference.mean_secs / candidate.mean_secs)
        } else {
            None
        };
        let status = if comparison.is_match {
            FileStatus::Matched
        } else {
            FileStatus::Mismatched
        };
        Self {
            file_name,
            file_size_bytes,
            status,
            accuracy_match: comparison.is_match,
            speedup,
            mismatched_tracks: comparison.mismatched_tracks.into_iter().collect(),
            differences: comparison.differences,
            reference: Some(reference),
            candidate: Some(candidate),
            failure: None,
        }
    }

    /// Result for a file where one side failed to decode.
    pub fn failed(
        file_name: String,
        file_size_bytes: u64,
        side: Side,
        error: &DecodeError,
        surviving_side: Option<(Side, SideMetrics)>,
    ) -> Self {
        let mut result = Self {
            file_name,
            file_size_bytes,
            status: FileStatus::Failed,
            accuracy_match: false,
            speedup: None,
            mismatched_tracks: Vec::new(),
            differences: BTreeMap::new(),
            reference: None,
            candidate: None,
            failure: Some(FailureInfo::from_decode(side, error)),
        };
        match surviving_side {
            Some((Side::Reference, metrics)) => result.reference = Some(metrics),
            Some((Side::Candidate, metrics)) => result.candidate = Some(metrics),
            None => {}
        }
        result
    }
}

/// Aggregate statistics over one batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Summary {
    /// Files attempted, including decode failures.
    pub total_files: usize,
    /// Files where both decodes succeeded and a comparison ran.
    pub files_compared: usize,
    /// Files with `accuracy_match == true`.
    pub accuracy_matches: usize,
    /// Files excluded from accuracy statistics by a decode failure.
    pub decode_failures: usize,
    /// `accuracy_matches / total_files`, percent.
    pub match_percent: f64,
    /// Arithmetic mean of per-file speedups. Answers "how much faster is
    /// the candidate on a typical file".
    pub mean_speedup: f64,
    /// Sum of reference times over sum of candidate times. Answers "how
    /// much faster was the whole batch"; large files dominate, so this is
    /// reported alongside the mean, not instead of it.
    pub overall_speedup: f64,
    /// Total reference decode time, seconds.
    pub total_reference_secs: f64,
    /// Total candidate decode time, seconds.
    pub total_candidate_secs: f64,
}

impl Summary {
    /// Whether every attempted file was confirmed matching.
    pub fn all_matched(&self) -> bool {
        self.total_files > 0 && self.accuracy_matches == self.total_files
    }
}

/// Output rendering requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Terminal-friendly text.
    #[default]
    Human,
    /// The report JSON on stdout.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "human" => Ok(OutputFormat::Human),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn failure_kinds_follow_the_taxonomy() {
        let decode = DecodeError::Reference("boom".to_string());
        assert_eq!(
            FailureInfo::from_decode(Side::Reference, &decode).kind,
            FailureKind::Decode
        );

        let process = DecodeError::Process {
            status: 2,
            stderr: "bad magic".to_string(),
        };
        assert_eq!(
            FailureInfo::from_decode(Side::Candidate, &process).kind,
            FailureKind::Process
        );

        let timeout = DecodeError::Timeout {
            elapsed: Duration::from_secs(60),
        };
        // Timeout handled like a process failure, with its own reason code.
        assert_eq!(
            FailureInfo::from_decode(Side::Candidate, &timeout).kind,
            FailureKind::Timeout
        );
    }

    #[test]
    fn speedup_requires_candidate_time() {
        let reference = SideMetrics {
            mean_secs: 2.0,
            ..Default::default()
        };
        let candidate = SideMetrics {
            mean_secs: 0.5,
            ..Default::default()
        };
        let comparison = Comparison {
            is_match: true,
            mismatched_tracks: Default::default(),
            differences: Default::default(),
        };
        let result = FileReportResult::compared(
            "a.vital".to_string(),
            1024,
            reference,
            candidate,
            comparison,
        );
        assert_eq!(result.speedup, Some(4.0));
        assert_eq!(result.status, FileStatus::Matched);

        let zero_candidate = SideMetrics::default();
        let comparison = Comparison {
            is_match: true,
            mismatched_tracks: Default::default(),
            differences: Default::default(),
        };
        let result = FileReportResult::compared(
            "b.vital".to_string(),
            1024,
            SideMetrics::default(),
            zero_candidate,
            comparison,
        );
        assert_eq!(result.speedup, None);
    }
}
