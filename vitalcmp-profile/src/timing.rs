//! Multi-Iteration Timing
//!
//! Repeated wall-clock sampling of a decode thunk: one discarded warm-up
//! invocation to absorb cold-cache effects, then N timed runs reported as
//! individual samples plus their arithmetic mean.

use std::time::{Duration, Instant};

/// Iterations that disagree by more than this factor across a run are a
/// reportable anomaly (warned about, never a failure).
const SPREAD_ANOMALY_FACTOR: f64 = 10.0;

/// How a thunk is sampled.
#[derive(Debug, Clone)]
pub struct TimingPolicy {
    /// Number of timed invocations.
    pub iterations: usize,
    /// Whether to run (and discard) one warm-up invocation first.
    pub discard_warmup: bool,
}

impl Default for TimingPolicy {
    fn default() -> Self {
        Self {
            iterations: 3,
            discard_warmup: true,
        }
    }
}

impl TimingPolicy {
    /// Fixed iteration count with the default warm-up behavior.
    pub fn with_iterations(iterations: usize) -> Self {
        Self {
            iterations,
            ..Default::default()
        }
    }
}

/// Result of sampling a thunk.
#[derive(Debug, Clone)]
pub struct TimedRun<T> {
    /// Value produced by the final invocation.
    pub value: T,
    /// Wall-clock duration of each timed invocation, in order.
    pub samples: Vec<Duration>,
    /// Arithmetic mean of `samples`.
    pub mean: Duration,
    /// Set when samples disagree by more than an order of magnitude.
    pub anomalous: bool,
}

impl<T> TimedRun<T> {
    /// Samples as seconds, for serialization.
    pub fn samples_secs(&self) -> Vec<f64> {
        self.samples.iter().map(Duration::as_secs_f64).collect()
    }
}

/// Sample a fallible thunk under the given policy.
///
/// The first error aborts sampling and is returned as-is, warm-up
/// included: a thunk that cannot run once will not produce a timing
/// estimate worth reporting.
pub fn sample<T, E>(
    policy: &TimingPolicy,
    mut thunk: impl FnMut() -> Result<T, E>,
) -> Result<TimedRun<T>, E> {
    let iterations = policy.iterations.max(1);

    if policy.discard_warmup {
        thunk()?;
    }

    let mut samples = Vec::with_capacity(iterations);
    let mut value = None;
    for _ in 0..iterations {
        let start = Instant::now();
        value = Some(thunk()?);
        samples.push(start.elapsed());
    }

    let total: Duration = samples.iter().sum();
    let mean = total / iterations as u32;
    let anomalous = spread_exceeds(&samples, SPREAD_ANOMALY_FACTOR);
    if anomalous {
        tracing::warn!(
            min_secs = min_sample(&samples).as_secs_f64(),
            max_secs = max_sample(&samples).as_secs_f64(),
            "timing samples disagree by more than {}x; estimate is unstable",
            SPREAD_ANOMALY_FACTOR
        );
    }

    Ok(TimedRun {
        value: value.expect("at least one iteration ran"),
        samples,
        mean,
        anomalous,
    })
}

fn min_sample(samples: &[Duration]) -> Duration {
    samples.iter().copied().min().unwrap_or(Duration::ZERO)
}

fn max_sample(samples: &[Duration]) -> Duration {
    samples.iter().copied().max().unwrap_or(Duration::ZERO)
}

fn spread_exceeds(samples: &[Duration], factor: f64) -> bool {
    let min = min_sample(samples).as_secs_f64();
    let max = max_sample(samples).as_secs_f64();
    min > 0.0 && max / min > factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[test]
    fn mean_tracks_a_fixed_duration_thunk() {
        let policy = TimingPolicy::default();
        let run = sample(&policy, || -> Result<(), Infallible> {
            std::thread::sleep(Duration::from_millis(10));
            Ok(())
        })
        .unwrap();

        assert_eq!(run.samples.len(), 3);
        // Should be at least the sleep, and well under 10x it even on a
        // loaded machine.
        assert!(run.mean >= Duration::from_millis(5));
        assert!(run.mean < Duration::from_millis(100));
    }

    #[test]
    fn warmup_is_discarded() {
        let mut calls = 0u32;
        let policy = TimingPolicy::default();
        let run = sample(&policy, || -> Result<u32, Infallible> {
            calls += 1;
            Ok(calls)
        })
        .unwrap();

        // 1 warm-up + 3 timed, samples only cover the timed ones.
        assert_eq!(calls, 4);
        assert_eq!(run.samples.len(), 3);
        assert_eq!(run.value, 4);
    }

    #[test]
    fn first_error_propagates() {
        let policy = TimingPolicy::default();
        let result = sample(&policy, || -> Result<(), &str> { Err("boom") });
        assert_eq!(result.unwrap_err(), "boom");
    }

    #[test]
    fn spread_anomaly_detection() {
        let tight = vec![Duration::from_millis(10), Duration::from_millis(12)];
        assert!(!spread_exceeds(&tight, 10.0));

        let wide = vec![Duration::from_millis(1), Duration::from_millis(100)];
        assert!(spread_exceeds(&wide, 10.0));
    }

    #[test]
    fn zero_iterations_clamps_to_one() {
        let policy = TimingPolicy {
            iterations: 0,
            discard_warmup: false,
        };
        let run = sample(&policy, || -> Result<(), Infallible> { Ok(()) }).unwrap();
        assert_eq!(run.samples.len(), 1);
    }
}
