//! Configuration loading from vitalcmp.toml
//!
//! Harness configuration can be specified in a `vitalcmp.toml` file,
//! discovered by walking up from the current directory. CLI flags override
//! file values.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// vitalcmp configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HarnessConfig {
    /// Runner configuration.
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Candidate invocation configuration.
    #[serde(default)]
    pub candidate: CandidateConfig,
    /// Output configuration.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Runner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Timed decode iterations per file (plus one discarded warm-up).
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    /// Candidate subprocess timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Files processed in parallel.
    #[serde(default = "default_jobs")]
    pub jobs: usize,
    /// Compare record payloads element-wise instead of counts only.
    #[serde(default)]
    pub compare_records: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            timeout_secs: default_timeout_secs(),
            jobs: default_jobs(),
            compare_records: false,
        }
    }
}

fn default_iterations() -> usize {
    3
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_jobs() -> usize {
    1
}

/// Candidate invocation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateConfig {
    /// Path to the candidate binary.
    #[serde(default)]
    pub binary: Option<String>,
    /// Payload encoding: "json", "json-compact", or "msgpack".
    #[serde(default = "default_encoding")]
    pub encoding: String,
    /// `-max-tracks` value (0 = unlimited).
    #[serde(default)]
    pub max_tracks: u32,
    /// `-max-samples` value (0 = unlimited).
    #[serde(default)]
    pub max_samples: u32,
}

impl Default for CandidateConfig {
    fn default() -> Self {
        Self {
            binary: None,
            encoding: default_encoding(),
            max_tracks: 0,
            max_samples: 0,
        }
    }
}

fn default_encoding() -> String {
    "json".to_string()
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output format: "human" or "json".
    #[serde(default = "default_format")]
    pub format: String,
    /// Report destination; no report is persisted when unset.
    #[serde(default)]
    pub report_path: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            report_path: None,
        }
    }
}

fn default_format() -> String {
    "human".to_string()
}

impl HarnessConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Discover and load configuration by walking up from the current
    /// directory.
    pub fn discover() -> Option<Self> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let config_path = dir.join("vitalcmp.toml");
            if config_path.exists() {
                return Self::load(&config_path).ok();
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }

    /// Default configuration as a TOML string.
    pub fn default_toml() -> String {
        r#"# vitalcmp configuration

[runner]
# Timed decode iterations per file (plus one discarded warm-up)
iterations = 3
# Candidate subprocess timeout in seconds
timeout_secs = 60
# Files processed in parallel
jobs = 1
# Compare record payloads element-wise, not just counts and metadata
compare_records = false

[candidate]
# Path to the candidate decoder binary (uncomment to set)
# binary = "./vital_candidate"
# Payload encoding: json, json-compact, or msgpack
encoding = "json"
# Track/sample limits passed through to the candidate (0 = unlimited)
max_tracks = 0
max_samples = 0

[output]
# Output format: human or json
format = "human"
# Persist the JSON report here (uncomment to enable)
# report_path = "target/vitalcmp/report.json"
"#
        .to_string()
    }
}
