//! JSON Output

use std::path::Path;

use crate::report::Report;
use thiserror::Error;

/// Why a report could not be persisted.
///
/// A write failure does not invalidate the in-memory results; callers
/// surface it as a warning and keep the accuracy-based exit code.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The report did not serialize.
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The destination could not be written.
    #[error("failed to write report to {path}: {source}")]
    Io {
        /// Destination path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Generate a prettified JSON report.
pub fn generate_json_report(report: &Report) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

/// Persist the report to a destination path, creating parent directories.
pub fn write_report(path: &Path, report: &Report) -> Result<(), ReportError> {
    let json = generate_json_report(report)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| ReportError::Io {
                path: path.display().to_string(),
                source,
            })?;
        }
    }
    std::fs::write(path, json).map_err(|source| ReportError::Io {
        path: path.display().to_string(),
        source,
    })
}
