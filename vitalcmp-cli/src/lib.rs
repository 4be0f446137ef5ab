#![warn(missing_docs)]
//! vitalcmp CLI Library
//!
//! CLI infrastructure for harness binaries. The reference decoder is an
//! external collaborator linked into the user's binary, so the entry point
//! takes a [`ReferenceLibrary`] implementation and drives everything else:
//!
//! ```ignore
//! use vitalcmp::prelude::*;
//!
//! #[global_allocator]
//! static ALLOC: TrackingAllocator = TrackingAllocator;
//!
//! struct MyReference;
//!
//! impl ReferenceLibrary for MyReference {
//!     fn open(&self, path: &Path, formats: &SampleFormatTable)
//!         -> Result<RawVitalFile, LibraryError> {
//!         // call into your reference decoder here
//!     }
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     vitalcmp_cli::run(MyReference)
//! }
//! ```
//!
//! Exit codes: `0` all files matched, `1` at least one file mismatched or
//! failed to decode, `2` harness-level error before any file ran.

mod config;
mod formats;
mod runner;

pub use config::{CandidateConfig, HarnessConfig, OutputConfig, RunnerConfig};
pub use formats::{bench_encodings, format_encoding_table, EncodingRun};
pub use runner::{discover_files, process_file, run_batch, CancelFlag, RunPolicy, SetupError};

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use vitalcmp_compare::CompareConfig;
use vitalcmp_decode::{CandidateAdapter, CandidateOptions, Encoding, ReferenceAdapter, ReferenceLibrary};
use vitalcmp_profile::TimingPolicy;
use vitalcmp_report::{
    format_human_output, generate_json_report, write_report, OutputFormat, Report, ReportMeta,
    RunConfig,
};

/// Exit code for a batch with at least one mismatch or per-file failure.
const EXIT_MISMATCH: i32 = 1;
/// Exit code for harness-level errors that prevented any comparison.
const EXIT_SETUP: i32 = 2;

/// vitalcmp CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "vitalcmp")]
#[command(
    author,
    version,
    about = "Differential validation and benchmarking of vital-file decoders"
)]
pub struct Cli {
    /// Optional subcommand; defaults to Run.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Directory containing .vital files
    #[arg(long, default_value = "./data")]
    pub data_dir: PathBuf,

    /// Process a single file instead of a directory
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Path to the candidate decoder binary
    #[arg(long)]
    pub candidate: Option<PathBuf>,

    /// Candidate payload encoding: json, json-compact, msgpack
    #[arg(long)]
    pub encoding: Option<String>,

    /// Timed decode iterations per file (plus one discarded warm-up)
    #[arg(long, default_value = "3")]
    pub iterations: usize,

    /// Candidate subprocess timeout in seconds
    #[arg(long, default_value = "60")]
    pub timeout: u64,

    /// Number of files processed in parallel
    #[arg(long, default_value = "1")]
    pub jobs: usize,

    /// Compare record payloads element-wise, not just counts and metadata
    #[arg(long)]
    pub compare_records: bool,

    /// Max tracks requested from the candidate (0 = unlimited)
    #[arg(long, default_value = "0")]
    pub max_tracks: u32,

    /// Max samples per track requested from the candidate (0 = unlimited)
    #[arg(long, default_value = "0")]
    pub max_samples: u32,

    /// Output format: human, json
    #[arg(long, default_value = "human")]
    pub format: String,

    /// Write the JSON report to this path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compare and profile (default)
    Run,
    /// Benchmark candidate payload encodings against one file
    Formats {
        /// Timed runs per encoding
        #[arg(long, default_value = "5")]
        runs: usize,
    },
}

/// Run the vitalcmp CLI with the given reference library.
///
/// This is the main entry point for harness binaries.
pub fn run<L: ReferenceLibrary + 'static>(library: L) -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli, library)
}

/// Run the vitalcmp CLI with pre-parsed arguments.
pub fn run_with_cli<L: ReferenceLibrary + 'static>(cli: Cli, library: L) -> anyhow::Result<()> {
    // Initialize logging
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("vitalcmp=debug")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("vitalcmp=info")
            .init();
    }

    // Discover vitalcmp.toml configuration (CLI flags override)
    let config = HarnessConfig::discover().unwrap_or_default();

    match cli.command {
        Some(Commands::Formats { runs }) => run_formats(&cli, &config, runs),
        Some(Commands::Run) | None => run_comparison(&cli, &config, library),
    }
}

/// Build candidate invocation options by layering vitalcmp.toml under the
/// CLI flags. clap defaults lose to config values; anything the user set
/// explicitly wins.
fn build_candidate_options(cli: &Cli, config: &HarnessConfig) -> Result<CandidateOptions, SetupError> {
    let binary = cli
        .candidate
        .clone()
        .or_else(|| config.candidate.binary.as_ref().map(PathBuf::from))
        .ok_or(SetupError::CandidateUnset)?;

    let encoding_str = cli
        .encoding
        .clone()
        .unwrap_or_else(|| config.candidate.encoding.clone());
    let encoding: Encoding = encoding_str.parse().unwrap_or_else(|message: String| {
        eprintln!("Warning: {message}; falling back to json");
        Encoding::Json
    });

    let timeout_secs = if cli.timeout != 60 {
        cli.timeout
    } else {
        config.runner.timeout_secs
    };
    let max_tracks = if cli.max_tracks != 0 {
        cli.max_tracks
    } else {
        config.candidate.max_tracks
    };
    let max_samples = if cli.max_samples != 0 {
        cli.max_samples
    } else {
        config.candidate.max_samples
    };

    Ok(CandidateOptions {
        binary,
        encoding,
        max_tracks,
        max_samples,
        timeout: Duration::from_secs(timeout_secs),
    })
}

fn build_run_policy(cli: &Cli, config: &HarnessConfig) -> RunPolicy {
    let iterations = if cli.iterations != 3 {
        cli.iterations
    } else {
        config.runner.iterations
    };
    RunPolicy {
        timing: TimingPolicy::with_iterations(iterations),
        compare: CompareConfig {
            compare_records: cli.compare_records || config.runner.compare_records,
            ..Default::default()
        },
    }
}

/// Setup phase: every problem here is fatal before any file runs.
fn setup_run(
    cli: &Cli,
    config: &HarnessConfig,
) -> Result<(CandidateAdapter, Vec<PathBuf>), SetupError> {
    let options = build_candidate_options(cli, config)?;
    let candidate = CandidateAdapter::new(options);
    if !candidate.binary_exists() {
        return Err(SetupError::CandidateMissing(
            candidate.options().binary.clone(),
        ));
    }
    let files = discover_files(&cli.data_dir, cli.file.as_deref())?;
    Ok((candidate, files))
}

fn run_comparison<L: ReferenceLibrary + 'static>(
    cli: &Cli,
    config: &HarnessConfig,
    library: L,
) -> anyhow::Result<()> {
    let (candidate, files) = match setup_run(cli, config) {
        Ok(ready) => ready,
        Err(error) => {
            eprintln!("Error: {error}");
            std::process::exit(EXIT_SETUP);
        }
    };

    let policy = build_run_policy(cli, config);
    let jobs = if cli.jobs != 1 {
        cli.jobs
    } else {
        config.runner.jobs
    }
    .max(1);

    println!(
        "Comparing {} file(s) against {} ({}, {} iteration(s), {} worker(s))\n",
        files.len(),
        candidate.options().binary.display(),
        candidate.options().encoding,
        policy.timing.iterations,
        jobs
    );

    let reference = ReferenceAdapter::new(library);
    let cancel = CancelFlag::new();
    let (summary, results) = run_batch(&reference, &candidate, &files, &policy, jobs, &cancel);

    // Memory tracking sanity: zero peaks everywhere means the tracking
    // allocator is not installed in this binary.
    if results.iter().all(|r| {
        r.reference
            .as_ref()
            .and_then(|m| m.peak_memory_bytes)
            .unwrap_or(0)
            == 0
    }) && !results.is_empty()
    {
        eprintln!(
            "Warning: all reference decodes reported 0 peak bytes.\n\
             Ensure TrackingAllocator is set as #[global_allocator] in your harness binary."
        );
    }

    let report = Report {
        meta: ReportMeta::now(RunConfig {
            iterations: policy.timing.iterations,
            encoding: candidate.options().encoding.to_string(),
            compare_records: policy.compare.compare_records,
            timeout_secs: candidate.options().timeout.as_secs(),
            jobs,
        }),
        summary,
        results,
    };

    // Render to stdout
    let format: OutputFormat = cli.format.parse().unwrap_or_default();
    match format {
        OutputFormat::Human => print!("{}", format_human_output(&report)),
        OutputFormat::Json => println!("{}", generate_json_report(&report)?),
    }

    // Persist the report if requested; a write failure downgrades to a
    // warning and the accuracy-based exit code stands.
    let report_path = cli
        .output
        .clone()
        .or_else(|| config.output.report_path.as_ref().map(PathBuf::from));
    if let Some(path) = report_path {
        match write_report(&path, &report) {
            Ok(()) => eprintln!("Report saved to: {}", path.display()),
            Err(error) => eprintln!("Warning: {error}"),
        }
    }

    if !report.summary.all_matched() {
        std::process::exit(EXIT_MISMATCH);
    }
    Ok(())
}

fn run_formats(cli: &Cli, config: &HarnessConfig, runs: usize) -> anyhow::Result<()> {
    let (candidate, files) = match setup_run(cli, config) {
        Ok(ready) => ready,
        Err(error) => {
            eprintln!("Error: {error}");
            std::process::exit(EXIT_SETUP);
        }
    };
    let options = candidate.options().clone();

    // One file answers the encoding question; the first is the target
    // unless --file picked one.
    let target = &files[0];
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| target.display().to_string());

    let results = bench_encodings(&options, target, runs);
    let table = format_encoding_table(&file_name, runs, &results);
    let mut stdout = std::io::stdout();
    stdout.write_all(table.as_bytes())?;

    Ok(())
}
