// crates/conformance-validator/src/benchmark/tests.rs
// ============================================================================
// Module: Concurrency Benchmark Tests
// Description: Timing tests for baseline, fan-out and scaling checks.
// Purpose: Validate floor, worker failure and scaling verdicts.
// Dependencies: conformance-validator
// ============================================================================

//! ## Overview
//! Uses sleeping closures as stand-in requests.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use std::sync::Mutex;

use super::*;
use crate::log::MemoryRunLog;
use crate::log::NoopRunLog;

/// Returns settings with a custom fan-out and floor.
const fn settings(fan_out: usize, min_baseline_ms: u64) -> BenchmarkConfig {
    BenchmarkConfig {
        fan_out,
        scaling_factor: 2,
        min_baseline_ms,
    }
}

#[test]
fn concurrent_sleepers_pass() {
    let log = MemoryRunLog::new();
    let benchmark = ConcurrencyBenchmark::new(BenchmarkConfig::default(), &log);
    let sample = benchmark
        .run(|_slot| {
            thread::sleep(Duration::from_secs(1));
            Ok::<(), String>(())
        })
        .unwrap();
    assert_eq!(sample.fan_out, 10);
    assert!(sample.concurrent <= sample.baseline * 2);
    let messages: Vec<String> = log.events().into_iter().map(|event| event.message).collect();
    assert!(messages.iter().any(|message| message == "Starting 10 concurrent workers to send requests"));
    assert_eq!(messages.iter().filter(|message| message.starts_with("Worker #")).count(), 10);
}

#[test]
fn fast_baseline_violates_floor_before_fan_out() {
    let calls = Mutex::new(0_usize);
    let benchmark = ConcurrencyBenchmark::new(BenchmarkConfig::default(), &NoopRunLog);
    let err = benchmark
        .run(|_slot| {
            *calls.lock().unwrap() += 1;
            thread::sleep(Duration::from_millis(50));
            Ok::<(), String>(())
        })
        .unwrap_err();
    assert!(matches!(err, BenchmarkError::FloorViolation { .. }));
    assert!(err.to_string().contains("waits at least 1.000s"));
    assert_eq!(*calls.lock().unwrap(), 1);
}

#[test]
fn failing_worker_is_reported_by_index() {
    let benchmark = ConcurrencyBenchmark::new(BenchmarkConfig::default(), &NoopRunLog);
    let err = benchmark
        .run(|slot| {
            thread::sleep(Duration::from_secs(1));
            match slot {
                Slot::Worker(3) => Err("connection reset".to_string()),
                _ => Ok(()),
            }
        })
        .unwrap_err();
    let text = err.to_string();
    assert!(text.starts_with("at least one concurrent request failed:\n"));
    assert!(text.contains("error #3: connection reset"));
    let BenchmarkError::WorkerFailures {
        failures,
    } = err
    else {
        panic!("expected worker failures");
    };
    assert_eq!(failures.len(), 1);
}

#[test]
fn failing_baseline_aborts() {
    let benchmark = ConcurrencyBenchmark::new(settings(2, 0), &NoopRunLog);
    let err = benchmark.run(|_slot| Err::<(), _>("refused")).unwrap_err();
    assert_eq!(err, BenchmarkError::Baseline("refused".to_string()));
}

#[test]
fn serialized_handling_violates_scaling() {
    let gate = Mutex::new(());
    let benchmark = ConcurrencyBenchmark::new(settings(4, 100), &NoopRunLog);
    let err = benchmark
        .run(|_slot| {
            let _held = gate.lock().unwrap();
            thread::sleep(Duration::from_millis(150));
            Ok::<(), String>(())
        })
        .unwrap_err();
    let BenchmarkError::ScalingViolation {
        fan_out, ..
    } = err
    else {
        panic!("expected scaling violation, got {err}");
    };
    assert_eq!(fan_out, 4);
}

#[test]
fn zero_workers_is_rejected() {
    let benchmark = ConcurrencyBenchmark::new(settings(0, 0), &NoopRunLog);
    assert_eq!(benchmark.run(|_slot| Ok::<(), String>(())), Err(BenchmarkError::NoWorkers));
}

#[test]
fn elapsed_renders_seconds() {
    assert_eq!(Elapsed(Duration::from_millis(1500)).to_string(), "1.500s");
}
