//! The decoder capability interface.
//!
//! A decoder is anything that can turn a file path into a canonical
//! snapshot plus its own cost measurements. Both the in-process reference
//! and the out-of-process candidate implement this, which keeps the
//! comparator and profiler decoder-agnostic.

use crate::Snapshot;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Why a decode attempt failed.
///
/// Per-file failures are isolated and recovered locally by the batch
/// runner; none of these abort a run.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The in-process reference library raised.
    #[error("reference decoder failed: {0}")]
    Reference(String),

    /// The candidate process could not be spawned or waited on.
    #[error("candidate process error: {0}")]
    Spawn(#[from] std::io::Error),

    /// The candidate exited with a non-zero status.
    #[error("candidate exited with status {status}: {stderr}")]
    Process {
        /// Exit status code (-1 when killed by signal).
        status: i32,
        /// Captured standard-error text.
        stderr: String,
    },

    /// The candidate did not exit within the caller-supplied timeout.
    #[error("candidate timed out after {:.1}s", .elapsed.as_secs_f64())]
    Timeout {
        /// Time waited before giving up.
        elapsed: Duration,
    },

    /// The candidate exited cleanly but its output did not parse as the
    /// declared encoding.
    #[error("candidate payload not decodable as {encoding}: {message}")]
    Payload {
        /// Encoding the payload was declared to be in.
        encoding: String,
        /// Parser diagnostic.
        message: String,
    },
}

/// One successful decode: the canonical snapshot plus its cost.
#[derive(Debug, Clone)]
pub struct DecodeOutcome {
    /// Canonical representation of the decoded file.
    pub snapshot: Snapshot,
    /// Time spent in the decoder itself. For the reference this wraps the
    /// library call; for the candidate it spans subprocess spawn-to-exit.
    pub elapsed: Duration,
    /// Allocator peak during the decode. `None` means unavailable (the
    /// candidate runs out of process), never zero.
    pub peak_memory_bytes: Option<u64>,
    /// Size of the encoded payload, when one exists (candidate stdout).
    pub payload_bytes: Option<u64>,
}

/// Anything providing `decode(path) -> Result<DecodeOutcome, DecodeError>`.
pub trait Decoder: Send + Sync {
    /// Short label for logs and reports ("reference", "candidate").
    fn label(&self) -> &str;

    /// Decode one file into a canonical snapshot with cost measurements.
    fn decode(&self, path: &Path) -> Result<DecodeOutcome, DecodeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_render_with_context() {
        let err = DecodeError::Process {
            status: 3,
            stderr: "bad magic".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("status 3"));
        assert!(msg.contains("bad magic"));

        let err = DecodeError::Timeout {
            elapsed: Duration::from_secs(60),
        };
        assert!(err.to_string().contains("60.0s"));
    }
}
