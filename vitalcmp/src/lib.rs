#![warn(missing_docs)]
//! # vitalcmp
//!
//! Differential-validation and benchmarking harness for vital-file
//! decoders. Two independent decoders exist for the format: an in-process
//! reference library (the golden standard) and a candidate binary invoked
//! as a subprocess. vitalcmp decodes each file with both, canonicalizes
//! the outputs into one shared data model, diffs them under a 1e-6
//! absolute tolerance, and profiles decode time, peak memory, and payload
//! size — folding a batch of files into a persisted JSON report and a
//! three-way exit status.
//!
//! ## Quick Start
//!
//! The reference decoder is linked into your harness binary; implement
//! [`ReferenceLibrary`] over it and hand everything else to the CLI:
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
//!     vitalcmp::run(MyReference)
//! }
//! ```
//!
//! Exit codes: `0` all files matched, `1` at least one mismatch or
//! per-file decode failure, `2` harness-level error (candidate binary
//! missing, no input files, ...).

// Re-export the model
pub use vitalcmp_model::{
    DecodeError, DecodeOutcome, Decoder, Device, FileInfo, Record, SampleValue, Snapshot, Track,
    TrackType,
};

// Re-export adapters
pub use vitalcmp_decode::{
    CandidateAdapter, CandidateOptions, Encoding, LibraryError, RawDevice, RawRecord, RawRecords,
    RawTrack, RawVitalFile, ReferenceAdapter, ReferenceLibrary, SampleFormatTable,
};

// Re-export comparison
pub use vitalcmp_compare::{compare, CompareConfig, Comparison, Difference, ValuePair};

// Re-export profiling
pub use vitalcmp_profile::{sample, MemoryScope, TimedRun, TimingPolicy, TrackingAllocator};

// Re-export reporting
pub use vitalcmp_report::{
    format_human_output, generate_json_report, write_report, Aggregator, FileReportResult,
    FileStatus, Report, Side, SideMetrics, Summary,
};

// Re-export the CLI entry points and runner
pub use vitalcmp_cli::{
    discover_files, process_file, run, run_batch, run_with_cli, CancelFlag, Cli, HarnessConfig,
    RunPolicy, SetupError,
};

/// Prelude for convenient imports in harness binaries.
pub mod prelude {
    pub use crate::{
        compare, run, CandidateAdapter, CandidateOptions, CompareConfig, DecodeError,
        DecodeOutcome, Decoder, Encoding, LibraryError, RawDevice, RawRecord, RawRecords, RawTrack,
        RawVitalFile, ReferenceAdapter, ReferenceLibrary, SampleFormatTable, Snapshot,
        TrackingAllocator,
    };
    pub use std::path::Path;
}
