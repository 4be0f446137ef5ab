//! Encoding Benchmark
//!
//! Times the candidate over one file with each payload encoding (JSON
//! pretty, JSON compact, MessagePack) and reports wall time plus payload
//! size per encoding. Answers the "which wire format should the candidate
//! speak" question independently of accuracy checking.

use std::path::Path;

use vitalcmp_decode::{CandidateAdapter, CandidateOptions, Encoding};
use vitalcmp_model::Decoder;
use vitalcmp_profile::{sample, TimingPolicy};

/// Measurements for one encoding.
#[derive(Debug, Clone)]
pub struct EncodingRun {
    /// Encoding label.
    pub encoding: Encoding,
    /// Mean wall time across runs, seconds.
    pub mean_secs: f64,
    /// Fastest run, seconds.
    pub min_secs: f64,
    /// Slowest run, seconds.
    pub max_secs: f64,
    /// Encoded payload size in bytes.
    pub payload_bytes: u64,
    /// Error text when this encoding failed outright.
    pub error: Option<String>,
}

/// Benchmark every encoding against one file.
///
/// A failing encoding is reported in place (with its error) rather than
/// aborting the others — partial information still answers the question.
pub fn bench_encodings(options: &CandidateOptions, path: &Path, runs: usize) -> Vec<EncodingRun> {
    let policy = TimingPolicy::with_iterations(runs.max(1));

    Encoding::all()
        .into_iter()
        .map(|encoding| {
            let mut encoded_options = options.clone();
            encoded_options.encoding = encoding;
            let adapter = CandidateAdapter::new(encoded_options);

            match sample(&policy, || adapter.decode(path)) {
                Ok(run) => {
                    let samples = run.samples_secs();
                    EncodingRun {
                        encoding,
                        mean_secs: run.mean.as_secs_f64(),
                        min_secs: samples.iter().copied().fold(f64::INFINITY, f64::min),
                        max_secs: samples.iter().copied().fold(0.0, f64::max),
                        payload_bytes: run.value.payload_bytes.unwrap_or(0),
                        error: None,
                    }
                }
                Err(error) => {
                    tracing::warn!(%encoding, %error, "encoding benchmark failed");
                    EncodingRun {
                        encoding,
                        mean_secs: 0.0,
                        min_secs: 0.0,
                        max_secs: 0.0,
                        payload_bytes: 0,
                        error: Some(error.to_string()),
                    }
                }
            }
        })
        .collect()
}

/// Render the benchmark as a terminal table.
pub fn format_encoding_table(file_name: &str, runs: usize, results: &[EncodingRun]) -> String {
    let mut output = String::new();
    output.push('\n');
    output.push_str(&format!("Encoding benchmark: {file_name} ({runs} runs)\n"));
    output.push_str(&"=".repeat(64));
    output.push('\n');
    output.push_str(&format!(
        "{:<14} {:>10} {:>10} {:>10} {:>12}\n",
        "Encoding", "Avg(s)", "Min(s)", "Max(s)", "Size(MB)"
    ));
    output.push_str(&"-".repeat(64));
    output.push('\n');

    for run in results {
        if let Some(error) = &run.error {
            output.push_str(&format!("{:<14} error: {}\n", run.encoding.to_string(), error));
            continue;
        }
        output.push_str(&format!(
            "{:<14} {:>10.4} {:>10.4} {:>10.4} {:>12.2}\n",
            run.encoding.to_string(),
            run.mean_secs,
            run.min_secs,
            run.max_secs,
            run.payload_bytes as f64 / 1024.0 / 1024.0
        ));
    }

    output
}
