// crates/conformance-validator/src/benchmark.rs
// ============================================================================
// Module: Concurrency Benchmark
// Description: Verifies the function serves overlapping requests in parallel.
// Purpose: Compare one request's latency against a concurrent fan-out.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! The benchmark times one request as a baseline, then fires `fan_out`
//! requests from scoped threads and waits for all of them. A function that
//! serializes requests takes roughly `fan_out` times the baseline; one that
//! handles them concurrently stays close to the baseline.
//! Invariants:
//! - The baseline must take at least the configured floor.
//! - Every worker result is collected before any verdict is reached.
//! - Any worker failure fails the run with every worker error listed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use thiserror::Error;

use crate::config::BenchmarkConfig;
use crate::log::RunEvent;
use crate::log::RunLog;
use crate::log::RunPhase;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Identifies which request a send belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// The single timed baseline request.
    Baseline,
    /// One of the concurrent workers.
    Worker(usize),
}

/// Wall-clock span rendered in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Elapsed(pub Duration);

impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.0.as_secs_f64())
    }
}

/// Error reported by one concurrent worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerFailure {
    /// Worker index.
    pub worker: usize,
    /// Rendered error.
    pub message: String,
}

/// Measurements from a completed benchmark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkSample {
    /// Single-request latency.
    pub baseline: Duration,
    /// Wall-clock span of the concurrent fan-out.
    pub concurrent: Duration,
    /// Number of concurrent workers.
    pub fan_out: usize,
}

// ============================================================================
// SECTION: Benchmark
// ============================================================================

/// Concurrency benchmark bound to its thresholds and a run log.
pub struct ConcurrencyBenchmark<'a> {
    /// Thresholds and fan-out.
    settings: BenchmarkConfig,
    /// Progress sink.
    log: &'a dyn RunLog,
}

impl<'a> ConcurrencyBenchmark<'a> {
    /// Creates a benchmark.
    #[must_use]
    pub const fn new(settings: BenchmarkConfig, log: &'a dyn RunLog) -> Self {
        Self {
            settings,
            log,
        }
    }

    /// Runs the benchmark with `send_one` as the request to measure.
    ///
    /// # Errors
    ///
    /// Returns [`BenchmarkError`] when the baseline fails or is too fast, a
    /// worker fails, or the fan-out does not scale.
    pub fn run<F, E>(&self, send_one: F) -> Result<BenchmarkSample, BenchmarkError>
    where
        F: Fn(Slot) -> Result<(), E> + Sync,
        E: fmt::Display,
    {
        let fan_out = self.settings.fan_out;
        if fan_out == 0 {
            return Err(BenchmarkError::NoWorkers);
        }

        let started = Instant::now();
        let single = send_one(Slot::Baseline);
        let baseline = started.elapsed();
        single.map_err(|err| BenchmarkError::Baseline(err.to_string()))?;

        let minimum = self.settings.min_baseline();
        if baseline < minimum {
            return Err(BenchmarkError::FloorViolation {
                minimum: Elapsed(minimum),
                baseline: Elapsed(baseline),
            });
        }
        self.note(format!(
            "Single request response time benchmarked, took {} for 1 request",
            Elapsed(baseline)
        ));

        self.note(format!("Starting {fan_out} concurrent workers to send requests"));
        let (results, concurrent) = fan_out_requests(fan_out, &send_one);

        let mut failures = Vec::new();
        for (worker, result) in results {
            match result {
                Ok(()) => self.note(format!("Worker #{worker} done")),
                Err(message) => failures.push(WorkerFailure {
                    worker,
                    message,
                }),
            }
        }
        if !failures.is_empty() {
            return Err(BenchmarkError::WorkerFailures {
                failures,
            });
        }

        let limit = baseline.saturating_mul(self.settings.scaling_factor);
        if concurrent > limit {
            return Err(BenchmarkError::ScalingViolation {
                fan_out,
                concurrent: Elapsed(concurrent),
                baseline: Elapsed(baseline),
            });
        }
        self.note(format!(
            "Concurrent request response time benchmarked, took {} for {fan_out} requests",
            Elapsed(concurrent)
        ));
        Ok(BenchmarkSample {
            baseline,
            concurrent,
            fan_out,
        })
    }

    /// Records a benchmark progress line.
    fn note(&self, message: String) {
        self.log.record(&RunEvent::new("benchmark_progress", RunPhase::Benchmark, message));
    }
}

/// Sends `fan_out` requests from scoped threads and times the whole span.
///
/// Results are sorted by worker index.
fn fan_out_requests<F, E>(fan_out: usize, send_one: &F) -> (Vec<(usize, Result<(), String>)>, Duration)
where
    F: Fn(Slot) -> Result<(), E> + Sync,
    E: fmt::Display,
{
    let (sender, receiver) = mpsc::sync_channel(fan_out);
    let started = Instant::now();
    thread::scope(|scope| {
        for worker in 0 .. fan_out {
            let sender = sender.clone();
            scope.spawn(move || {
                let result = send_one(Slot::Worker(worker)).map_err(|err| err.to_string());
                let _ = sender.send((worker, result));
            });
        }
    });
    let concurrent = started.elapsed();
    drop(sender);
    let mut results: Vec<(usize, Result<(), String>)> = receiver.iter().collect();
    results.sort_by_key(|(worker, _)| *worker);
    (results, concurrent)
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Benchmark failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BenchmarkError {
    /// Fan-out is zero.
    #[error("concurrent validation requires at least one worker")]
    NoWorkers,
    /// The baseline request failed.
    #[error(
        "concurrent validation unable to send single request to benchmark response time: {0}"
    )]
    Baseline(String),
    /// The baseline request was faster than the floor.
    #[error(
        "concurrent validation requires a function that waits at least {minimum} before \
         responding, function responded in {baseline}"
    )]
    FloorViolation {
        /// Required minimum latency.
        minimum: Elapsed,
        /// Observed baseline latency.
        baseline: Elapsed,
    },
    /// One or more workers failed.
    #[error("at least one concurrent request failed:\n{}", render_failures(.failures))]
    WorkerFailures {
        /// Failed workers in index order.
        failures: Vec<WorkerFailure>,
    },
    /// The fan-out took longer than the scaling threshold allows.
    #[error(
        "function took too long to complete {fan_out} concurrent requests. {fan_out} concurrent \
         request time: {concurrent}, single request time: {baseline}"
    )]
    ScalingViolation {
        /// Number of concurrent workers.
        fan_out: usize,
        /// Observed fan-out span.
        concurrent: Elapsed,
        /// Observed baseline latency.
        baseline: Elapsed,
    },
}

/// Renders worker failures one per line.
fn render_failures(failures: &[WorkerFailure]) -> String {
    failures.iter().map(|failure| format!("error #{}: {}\n", failure.worker, failure.message)).collect()
}

#[cfg(test)]
mod tests;
