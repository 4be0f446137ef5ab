//! Batch Aggregation
//!
//! Folds per-file results into the batch summary. The runner pushes one
//! result at a time (under a mutex when files are processed in parallel),
//! so there is no partial or interleaved accumulation.

use crate::report::{FileReportResult, FileStatus, Summary};

/// Accumulates per-file results into a summary.
#[derive(Debug, Default)]
pub struct Aggregator {
    results: Vec<FileReportResult>,
}

impl Aggregator {
    /// Empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one per-file result.
    pub fn push(&mut self, result: FileReportResult) {
        self.results.push(result);
    }

    /// Number of results recorded so far.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// True when no results were recorded.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Fold everything recorded into a summary plus the result list.
    pub fn finish(self) -> (Summary, Vec<FileReportResult>) {
        let total_files = self.results.len();
        let mut summary = Summary {
            total_files,
            ..Default::default()
        };

        let mut speedups = Vec::new();
        for result in &self.results {
            match result.status {
                FileStatus::Matched => {
                    summary.files_compared += 1;
                    summary.accuracy_matches += 1;
                }
                FileStatus::Mismatched => summary.files_compared += 1,
                FileStatus::Failed => summary.decode_failures += 1,
            }
            if let Some(reference) = &result.reference {
                summary.total_reference_secs += reference.mean_secs;
            }
            if let Some(candidate) = &result.candidate {
                summary.total_candidate_secs += candidate.mean_secs;
            }
            if let Some(speedup) = result.speedup {
                speedups.push(speedup);
            }
        }

        if total_files > 0 {
            summary.match_percent = summary.accuracy_matches as f64 / total_files as f64 * 100.0;
        }
        if !speedups.is_empty() {
            summary.mean_speedup = speedups.iter().sum::<f64>() / speedups.len() as f64;
        }
        if summary.total_candidate_secs > 0.0 {
            summary.overall_speedup = summary.total_reference_secs / summary.total_candidate_secs;
        }

        (summary, self.results)
    }
}
