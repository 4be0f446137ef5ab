//! Batch Runner
//!
//! Setup validation, file discovery, and the per-file decode/compare
//! pipeline. Files are processed sequentially by default; a bounded rayon
//! pool handles directory batches in parallel, with each file's
//! reference/candidate decode pair executing as one atomic unit and
//! aggregation serialized under a mutex.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use thiserror::Error;

use vitalcmp_compare::{compare, CompareConfig};
use vitalcmp_model::{DecodeOutcome, Decoder};
use vitalcmp_profile::{sample, TimedRun, TimingPolicy};
use vitalcmp_report::{Aggregator, FileReportResult, Side, SideMetrics, Summary};

/// Fatal problems found before any file is processed.
#[derive(Debug, Error)]
pub enum SetupError {
    /// No candidate binary was configured.
    #[error("no candidate binary configured (pass --candidate or set [candidate].binary)")]
    CandidateUnset,

    /// The configured candidate binary does not exist.
    #[error("candidate binary not found: {}", .0.display())]
    CandidateMissing(PathBuf),

    /// The input file or directory does not exist.
    #[error("input path not found: {}", .0.display())]
    InputMissing(PathBuf),

    /// The input directory contains no vital files.
    #[error("no .vital files found in {}", .0.display())]
    NoInputFiles(PathBuf),
}

/// Per-file pipeline knobs.
#[derive(Debug, Clone, Default)]
pub struct RunPolicy {
    /// Timing policy for both decode thunks.
    pub timing: TimingPolicy,
    /// Comparison configuration.
    pub compare: CompareConfig,
}

/// Cancellation flag set by Ctrl+C and checked between files.
///
/// In-flight single-file comparisons run to completion before the flag is
/// honored; no partial per-file result is ever reported.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    flag: Arc<AtomicBool>,
}

impl CancelFlag {
    /// Flag wired to SIGINT. Registration failure (a handler already
    /// exists) leaves a valid, manually-triggerable flag.
    pub fn new() -> Self {
        let flag = Arc::new(AtomicBool::new(false));
        let handler_flag = flag.clone();
        let _ = ctrlc::set_handler(move || {
            handler_flag.store(true, Ordering::SeqCst);
        });
        Self { flag }
    }

    /// Flag without a signal handler, for embedding and tests.
    pub fn detached() -> Self {
        Self::default()
    }

    /// Whether an abort was requested.
    pub fn stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Request an abort.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

/// Collect the batch's input files.
///
/// Single-file mode checks existence; directory mode requires at least one
/// `.vital` file and returns them sorted for deterministic processing.
pub fn discover_files(data_dir: &Path, single: Option<&Path>) -> Result<Vec<PathBuf>, SetupError> {
    if let Some(file) = single {
        if !file.is_file() {
            return Err(SetupError::InputMissing(file.to_path_buf()));
        }
        return Ok(vec![file.to_path_buf()]);
    }

    let entries = std::fs::read_dir(data_dir)
        .map_err(|_| SetupError::InputMissing(data_dir.to_path_buf()))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().is_some_and(|ext| ext == "vital")
        })
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(SetupError::NoInputFiles(data_dir.to_path_buf()));
    }
    Ok(files)
}

/// Run the full pipeline for one file: profile both decoders back-to-back,
/// then diff the two snapshots.
///
/// Decode failures on either side are recovered into the result rather
/// than propagated; the batch always continues.
pub fn process_file(
    reference: &dyn Decoder,
    candidate: &dyn Decoder,
    path: &Path,
    policy: &RunPolicy,
) -> FileReportResult {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let file_size_bytes = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

    tracing::info!(file = %file_name, "profiling");

    let reference_run = match sample(&policy.timing, || reference.decode(path)) {
        Ok(run) => run,
        Err(error) => {
            tracing::warn!(file = %file_name, %error, "reference decode failed");
            return FileReportResult::failed(
                file_name,
                file_size_bytes,
                Side::Reference,
                &error,
                None,
            );
        }
    };

    let candidate_run = match sample(&policy.timing, || candidate.decode(path)) {
        Ok(run) => run,
        Err(error) => {
            tracing::warn!(file = %file_name, %error, "candidate decode failed");
            return FileReportResult::failed(
                file_name,
                file_size_bytes,
                Side::Candidate,
                &error,
                Some((Side::Reference, side_metrics(&reference_run))),
            );
        }
    };

    let comparison = compare(
        &reference_run.value.snapshot,
        &candidate_run.value.snapshot,
        &policy.compare,
    );
    if comparison.is_match {
        tracing::info!(file = %file_name, "outputs match");
    } else {
        tracing::warn!(
            file = %file_name,
            mismatched = comparison.mismatched_tracks.len(),
            "outputs diverge"
        );
    }

    FileReportResult::compared(
        file_name,
        file_size_bytes,
        side_metrics(&reference_run),
        side_metrics(&candidate_run),
        comparison,
    )
}

fn side_metrics(run: &TimedRun<DecodeOutcome>) -> SideMetrics {
    SideMetrics {
        mean_secs: run.mean.as_secs_f64(),
        samples_secs: run.samples_secs(),
        peak_memory_bytes: run.value.peak_memory_bytes,
        payload_bytes: run.value.payload_bytes,
        tracks_count: run.value.snapshot.tracks.len() as u64,
        total_records: run.value.snapshot.total_records(),
        anomalous_timing: run.anomalous,
    }
}

/// Process a batch of files and fold the results.
///
/// `jobs <= 1` runs sequentially (the default: concurrent decodes perturb
/// timing). Higher values use a bounded worker pool; results keep input
/// order regardless.
pub fn run_batch(
    reference: &dyn Decoder,
    candidate: &dyn Decoder,
    files: &[PathBuf],
    policy: &RunPolicy,
    jobs: usize,
    cancel: &CancelFlag,
) -> (Summary, Vec<FileReportResult>) {
    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let mut aggregator = Aggregator::new();

    if jobs <= 1 {
        for path in files {
            if cancel.stopped() {
                tracing::warn!("abort requested; stopping between files");
                break;
            }
            progress.set_message(
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            );
            aggregator.push(process_file(reference, candidate, path, policy));
            progress.inc(1);
        }
    } else {
        let worker_count = jobs.min(files.len().max(1));
        match ThreadPoolBuilder::new().num_threads(worker_count).build() {
            Ok(pool) => {
                let collected = Mutex::new(Vec::<(usize, FileReportResult)>::new());
                pool.install(|| {
                    files.par_iter().enumerate().for_each(|(index, path)| {
                        if cancel.stopped() {
                            return;
                        }
                        let result = process_file(reference, candidate, path, policy);
                        let mut guard = collected.lock().unwrap_or_else(|e| e.into_inner());
                        guard.push((index, result));
                        progress.inc(1);
                    });
                });
                let mut indexed = collected.into_inner().unwrap_or_else(|e| e.into_inner());
                indexed.sort_by_key(|(index, _)| *index);
                for (_, result) in indexed {
                    aggregator.push(result);
                }
            }
            Err(error) => {
                tracing::warn!(%error, "failed to build worker pool; running sequentially");
                for path in files {
                    if cancel.stopped() {
                        break;
                    }
                    aggregator.push(process_file(reference, candidate, path, policy));
                    progress.inc(1);
                }
            }
        }
    }

    progress.finish_with_message("Complete");
    aggregator.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vitalcmp_model::{DecodeError, FileInfo, Snapshot};

    /// Decoder stub returning a fixed snapshot or a fixed error.
    struct StubDecoder {
        label: &'static str,
        outcome: Result<Snapshot, &'static str>,
    }

    impl StubDecoder {
        fn ok(label: &'static str, snapshot: Snapshot) -> Self {
            Self {
                label,
                outcome: Ok(snapshot),
            }
        }

        fn failing(label: &'static str, message: &'static str) -> Self {
            Self {
                label,
                outcome: Err(message),
            }
        }
    }

    impl Decoder for StubDecoder {
        fn label(&self) -> &str {
            self.label
        }

        fn decode(&self, _: &Path) -> Result<DecodeOutcome, DecodeError> {
            match &self.outcome {
                Ok(snapshot) => Ok(DecodeOutcome {
                    snapshot: snapshot.clone(),
                    elapsed: Duration::from_millis(1),
                    peak_memory_bytes: None,
                    payload_bytes: None,
                }),
                Err(message) => Err(DecodeError::Reference(message.to_string())),
            }
        }
    }

    fn snapshot() -> Snapshot {
        Snapshot {
            file_info: FileInfo {
                dt_start: 1000.0,
                dt_end: 1600.0,
                duration: 600.0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn discovery_rejects_missing_directory() {
        let err = discover_files(Path::new("/no/such/dir"), None).unwrap_err();
        assert!(matches!(err, SetupError::InputMissing(_)));
    }

    #[test]
    fn discovery_requires_vital_files() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"not a vital file").unwrap();

        let err = discover_files(dir.path(), None).unwrap_err();
        assert!(matches!(err, SetupError::NoInputFiles(_)));
    }

    #[test]
    fn discovery_sorts_vital_files() {
        let dir = tempfile::TempDir::new().unwrap();
        for name in ["b.vital", "a.vital", "skip.json"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let files = discover_files(dir.path(), None).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.vital", "b.vital"]);
    }

    #[test]
    fn matching_decoders_produce_a_matched_result() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("case.vital");
        std::fs::write(&path, b"payload").unwrap();

        let reference = StubDecoder::ok("reference", snapshot());
        let candidate = StubDecoder::ok("candidate", snapshot());
        let result = process_file(&reference, &candidate, &path, &RunPolicy::default());

        assert!(result.accuracy_match);
        assert_eq!(result.file_size_bytes, 7);
        assert_eq!(result.reference.as_ref().unwrap().samples_secs.len(), 3);
    }

    #[test]
    fn candidate_failure_is_recovered_into_the_result() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("case.vital");
        std::fs::write(&path, b"payload").unwrap();

        let reference = StubDecoder::ok("reference", snapshot());
        let candidate = StubDecoder::failing("candidate", "no output");
        let result = process_file(&reference, &candidate, &path, &RunPolicy::default());

        assert!(!result.accuracy_match);
        assert!(result.failure.is_some());
        // The surviving side's measurements are still reported.
        assert!(result.reference.is_some());
        assert!(result.candidate.is_none());
    }

    #[test]
    fn batch_keeps_input_order_under_parallelism() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut files = Vec::new();
        for i in 0..6 {
            let path = dir.path().join(format!("{i}.vital"));
            std::fs::write(&path, b"x").unwrap();
            files.push(path);
        }

        let reference = StubDecoder::ok("reference", snapshot());
        let candidate = StubDecoder::ok("candidate", snapshot());
        let (summary, results) = run_batch(
            &reference,
            &candidate,
            &files,
            &RunPolicy::default(),
            3,
            &CancelFlag::detached(),
        );

        assert_eq!(summary.total_files, 6);
        assert!(summary.all_matched());
        let names: Vec<_> = results.iter().map(|r| r.file_name.clone()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn cancelled_batch_stops_between_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("only.vital");
        std::fs::write(&path, b"x").unwrap();

        let cancel = CancelFlag::detached();
        cancel.trigger();

        let reference = StubDecoder::ok("reference", snapshot());
        let candidate = StubDecoder::ok("candidate", snapshot());
        let (summary, results) = run_batch(
            &reference,
            &candidate,
            &[path],
            &RunPolicy::default(),
            1,
            &cancel,
        );

        assert_eq!(summary.total_files, 0);
        assert!(results.is_empty());
    }
}
