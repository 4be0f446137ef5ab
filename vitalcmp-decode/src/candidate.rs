//! Candidate Adapter
//!
//! Invokes the candidate decoder as a subprocess per its CLI contract:
//!
//! ```text
//! <candidate-binary> -format {json|msgpack} [-compact] \
//!     -max-tracks N -max-samples N -quiet <file-path>
//! ```
//!
//! Standard output is the encoded payload, standard error is diagnostic
//! text. Elapsed time spans spawn-to-exit; the candidate's memory is out
//! of scope and recorded as unavailable. Timeouts follow the graceful
//! SIGTERM -> drain -> SIGKILL shape.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use vitalcmp_model::{DecodeError, DecodeOutcome, Decoder};

use crate::wire::parse_payload;

/// Window after SIGTERM before escalating to SIGKILL.
const TERM_GRACE: Duration = Duration::from_millis(500);

/// Poll interval while waiting for the candidate to exit.
const WAIT_POLL: Duration = Duration::from_millis(10);

/// Wire encoding requested from the candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Indented JSON.
    Json,
    /// JSON with no indentation (`-compact`).
    JsonCompact,
    /// MessagePack.
    Msgpack,
}

impl Encoding {
    /// Value passed to the candidate's `-format` flag.
    pub fn format_flag(self) -> &'static str {
        match self {
            Encoding::Json | Encoding::JsonCompact => "json",
            Encoding::Msgpack => "msgpack",
        }
    }

    /// Whether `-compact` is also passed.
    pub fn is_compact(self) -> bool {
        matches!(self, Encoding::JsonCompact)
    }

    /// All encodings, in the order the formats benchmark reports them.
    pub fn all() -> [Encoding; 3] {
        [Encoding::Json, Encoding::JsonCompact, Encoding::Msgpack]
    }
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Encoding::Json => write!(f, "json"),
            Encoding::JsonCompact => write!(f, "json-compact"),
            Encoding::Msgpack => write!(f, "msgpack"),
        }
    }
}

impl std::str::FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Encoding::Json),
            "json-compact" | "compact" => Ok(Encoding::JsonCompact),
            "msgpack" => Ok(Encoding::Msgpack),
            other => Err(format!(
                "unknown encoding '{other}' (expected json, json-compact, or msgpack)"
            )),
        }
    }
}

/// How the candidate is invoked.
#[derive(Debug, Clone)]
pub struct CandidateOptions {
    /// Path to the candidate binary.
    pub binary: PathBuf,
    /// Payload encoding to request.
    pub encoding: Encoding,
    /// `-max-tracks` value (0 = unlimited).
    pub max_tracks: u32,
    /// `-max-samples` value (0 = unlimited).
    pub max_samples: u32,
    /// Subprocess timeout.
    pub timeout: Duration,
}

impl CandidateOptions {
    /// Options with the contract defaults: JSON, unlimited, 60s timeout.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            encoding: Encoding::Json,
            max_tracks: 0,
            max_samples: 0,
            timeout: Duration::from_secs(60),
        }
    }
}

/// `Decoder` implementation over the candidate subprocess.
#[derive(Debug)]
pub struct CandidateAdapter {
    options: CandidateOptions,
}

impl CandidateAdapter {
    /// Build an adapter for the given invocation options.
    pub fn new(options: CandidateOptions) -> Self {
        Self { options }
    }

    /// The configured invocation options.
    pub fn options(&self) -> &CandidateOptions {
        &self.options
    }

    /// Whether the configured binary exists on disk. Checked once at
    /// setup; a missing binary is a harness error, not a per-file one.
    pub fn binary_exists(&self) -> bool {
        self.options.binary.is_file()
    }

    fn build_command(&self, path: &Path) -> Command {
        let mut cmd = Command::new(&self.options.binary);
        cmd.arg("-format").arg(self.options.encoding.format_flag());
        if self.options.encoding.is_compact() {
            cmd.arg("-compact");
        }
        cmd.arg("-max-tracks")
            .arg(self.options.max_tracks.to_string())
            .arg("-max-samples")
            .arg(self.options.max_samples.to_string())
            .arg("-quiet")
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    /// Run the candidate to completion, draining stdio on threads so a
    /// large payload cannot deadlock the pipe.
    fn run(&self, path: &Path) -> Result<(Vec<u8>, Duration), DecodeError> {
        let start = Instant::now();
        let mut child = self.build_command(path).spawn()?;

        let stdout = child.stdout.take().expect("stdout was piped");
        let stderr = child.stderr.take().expect("stderr was piped");
        let out_thread = std::thread::spawn(move || read_all(stdout));
        let err_thread = std::thread::spawn(move || read_all(stderr));

        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if start.elapsed() >= self.options.timeout {
                let elapsed = start.elapsed();
                terminate(&mut child);
                // Let the drain threads observe the closed pipes.
                let _ = out_thread.join();
                let _ = err_thread.join();
                return Err(DecodeError::Timeout { elapsed });
            }
            std::thread::sleep(WAIT_POLL);
        };
        let elapsed = start.elapsed();

        let stdout_buf = out_thread.join().unwrap_or_default();
        let stderr_buf = err_thread.join().unwrap_or_default();

        if !status.success() {
            return Err(DecodeError::Process {
                status: status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&stderr_buf).trim().to_string(),
            });
        }

        if !stderr_buf.is_empty() {
            tracing::debug!(
                candidate = %self.options.binary.display(),
                "candidate stderr: {}",
                String::from_utf8_lossy(&stderr_buf).trim()
            );
        }

        Ok((stdout_buf, elapsed))
    }
}

impl Decoder for CandidateAdapter {
    fn label(&self) -> &str {
        "candidate"
    }

    fn decode(&self, path: &Path) -> Result<DecodeOutcome, DecodeError> {
        let (payload, elapsed) = self.run(path)?;
        let payload_bytes = payload.len() as u64;
        let snapshot = parse_payload(&payload, self.options.encoding)?.into_snapshot();

        Ok(DecodeOutcome {
            snapshot,
            elapsed,
            peak_memory_bytes: None,
            payload_bytes: Some(payload_bytes),
        })
    }
}

fn read_all(mut stream: impl Read) -> Vec<u8> {
    let mut buf = Vec::new();
    let _ = stream.read_to_end(&mut buf);
    buf
}

/// Send SIGTERM to a process. `Err` means the signal was not delivered.
#[cfg(unix)]
fn send_sigterm(pid: u32) -> Result<(), std::io::Error> {
    let ret = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if ret == -1 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}

#[cfg(not(unix))]
fn send_sigterm(_pid: u32) -> Result<(), std::io::Error> {
    Ok(())
}

/// Graceful shutdown: SIGTERM, brief wait, then SIGKILL.
fn terminate(child: &mut Child) {
    let _ = send_sigterm(child.id());
    let deadline = Instant::now() + TERM_GRACE;
    while Instant::now() < deadline {
        if matches!(child.try_wait(), Ok(Some(_))) {
            return;
        }
        std::thread::sleep(WAIT_POLL);
    }
    let _ = child.kill();
    let _ = child.wait();
}
