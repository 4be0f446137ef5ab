#![warn(missing_docs)]
//! vitalcmp Report - Batch Aggregation and Output
//!
//! Folds per-file comparison results into a batch summary, decides the
//! overall verdict, and renders the report as JSON (persisted) or
//! human-readable text.

mod aggregate;
mod human;
mod json;
mod report;

pub use aggregate::Aggregator;
pub use human::format_human_output;
pub use json::{generate_json_report, write_report, ReportError};
pub use report::{
    FailureInfo, FailureKind, FileReportResult, FileStatus, OutputFormat, Report, ReportMeta,
    RunConfig, Side, SideMetrics, Summary,
};
