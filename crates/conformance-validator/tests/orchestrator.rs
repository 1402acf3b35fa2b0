// crates/conformance-validator/tests/orchestrator.rs
// ============================================================================
// Module: Validation Orchestrator Tests
// Description: End-to-end runs against an in-process stand-in function.
// Purpose: Validate lifecycle ordering, aggregation and failure reporting.
// ============================================================================

//! ## Overview
//! A stand-in function answers every recorded fixture input with the
//! recorded output, optionally corrupting or rejecting chosen fixtures. The
//! stand-in server shares that output slot and counts lifecycle calls.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::fs;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use conformance_events::CloudEvent;
use conformance_events::Encoding;
use conformance_events::EventCorpus;
use conformance_validator::FunctionServer;
use conformance_validator::MemoryRunLog;
use conformance_validator::RunFailure;
use conformance_validator::RunPaths;
use conformance_validator::RunSummary;
use conformance_validator::ServerError;
use conformance_validator::SignatureType;
use conformance_validator::Transport;
use conformance_validator::TransportError;
use conformance_validator::ValidationError;
use conformance_validator::ValidationOrchestrator;
use conformance_validator::ValidatorConfig;
use conformance_validator::config::BenchmarkConfig;
use serde_json::Value;
use tempfile::TempDir;

// ============================================================================
// SECTION: Stand-ins
// ============================================================================

/// Lifecycle call counts shared with the test.
#[derive(Debug, Default)]
struct Calls {
    /// Successful starts.
    starts: usize,
    /// Shutdown invocations.
    shutdowns: usize,
    /// Output fetches.
    fetches: usize,
    /// Requests received.
    sends: usize,
}

/// Shared state between the stand-in function and server.
#[derive(Debug, Default)]
struct Shared {
    /// Most recent function output.
    output: Mutex<Option<Vec<u8>>>,
    /// Lifecycle counters.
    calls: Mutex<Calls>,
}

/// Stand-in function reached through the transport.
struct StandInFunction {
    /// Signature the function was deployed with.
    signature: SignatureType,
    /// Shared output slot.
    shared: Arc<Shared>,
    /// Fixture whose output is corrupted.
    corrupt: Option<&'static str>,
    /// Fixture whose requests are rejected.
    reject: Option<&'static str>,
    /// HTTP output override.
    http_output: Option<&'static [u8]>,
    /// Latency per request.
    latency: Duration,
}

impl StandInFunction {
    /// Creates a well-behaved function for a signature type.
    fn new(signature: SignatureType, shared: &Arc<Shared>) -> Self {
        Self {
            signature,
            shared: Arc::clone(shared),
            corrupt: None,
            reject: None,
            http_output: None,
            latency: Duration::ZERO,
        }
    }

    /// Answers a fixture input delivered in `sent` encoding.
    fn answer(&self, name: &str, sent: Encoding) -> Result<(), TransportError> {
        if self.reject == Some(name) {
            return Err(TransportError::Status {
                status: 500,
                body: "function crashed".to_string(),
            });
        }
        let target = self.signature.encoding().unwrap();
        let corpus = EventCorpus::builtin();
        let bytes = corpus.expected_output(name, target, sent != target).unwrap();
        let mut output: Value = serde_json::from_slice(bytes).unwrap();
        if self.corrupt == Some(name) {
            output["data"] = Value::String("corrupted".to_string());
        }
        *self.shared.output.lock().unwrap() = Some(serde_json::to_vec(&output).unwrap());
        Ok(())
    }

    /// Counts one received request.
    fn count_send(&self) {
        self.shared.calls.lock().unwrap().sends += 1;
        thread::sleep(self.latency);
    }
}

impl Transport for StandInFunction {
    fn send_plain(&self, body: &[u8]) -> Result<(), TransportError> {
        self.count_send();
        if self.signature == SignatureType::Http {
            let output = self.http_output.map_or_else(|| body.to_vec(), <[u8]>::to_vec);
            *self.shared.output.lock().unwrap() = Some(output);
            return Ok(());
        }
        let corpus = EventCorpus::builtin();
        let name = corpus
            .names_for(Encoding::Legacy)
            .into_iter()
            .find(|name| corpus.input(name, Encoding::Legacy) == Some(body));
        match name {
            Some(name) => self.answer(name, Encoding::Legacy),
            None => Ok(()),
        }
    }

    fn send_structured(&self, event: &CloudEvent) -> Result<(), TransportError> {
        self.count_send();
        let corpus = EventCorpus::builtin();
        let name = corpus.names_for(Encoding::CloudEvent).into_iter().find(|name| {
            corpus
                .input(name, Encoding::CloudEvent)
                .and_then(|bytes| CloudEvent::from_slice(bytes).ok())
                .is_some_and(|recorded| &recorded == event)
        });
        match name {
            Some(name) => self.answer(name, Encoding::CloudEvent),
            None => Ok(()),
        }
    }
}

/// Stand-in server reading from the shared output slot.
struct StandInServer {
    /// Shared state.
    shared: Arc<Shared>,
    /// Fail on start.
    fail_start: bool,
    /// Fail on shutdown.
    fail_shutdown: bool,
}

impl StandInServer {
    /// Creates a well-behaved server.
    fn new(shared: &Arc<Shared>) -> Self {
        Self {
            shared: Arc::clone(shared),
            fail_start: false,
            fail_shutdown: false,
        }
    }
}

impl FunctionServer for StandInServer {
    fn start(&mut self, paths: &RunPaths) -> Result<(), ServerError> {
        if self.fail_start {
            return Err(ServerError::EmptyCommand);
        }
        fs::write(&paths.stdout, "listening on :8080\n").unwrap();
        fs::write(&paths.stderr, "warning: debug build\n").unwrap();
        self.shared.calls.lock().unwrap().starts += 1;
        Ok(())
    }

    fn fetch_output(&self) -> Result<Vec<u8>, ServerError> {
        self.shared.calls.lock().unwrap().fetches += 1;
        self.shared.output.lock().unwrap().clone().ok_or(ServerError::Io {
            path: "function_output.json".to_string(),
            message: "No such file or directory".to_string(),
        })
    }

    fn shutdown(&mut self) -> Result<(), ServerError> {
        self.shared.calls.lock().unwrap().shutdowns += 1;
        if self.fail_shutdown {
            return Err(ServerError::Stop("process already gone".to_string()));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "stand-in server".to_string()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds a configuration with run paths in `dir`.
fn config_in(dir: &TempDir, signature: SignatureType) -> ValidatorConfig {
    ValidatorConfig {
        signature_type: signature,
        paths: RunPaths {
            stdout: dir.path().join("stdout.txt"),
            stderr: dir.path().join("stderr.txt"),
            output_file: dir.path().join("function_output.json"),
        },
        ..ValidatorConfig::default()
    }
}

/// Runs a validation with the given stand-ins.
fn run(
    config: ValidatorConfig,
    server: StandInServer,
    function: StandInFunction,
    log: &Arc<MemoryRunLog>,
) -> Result<RunSummary, ValidationError> {
    ValidationOrchestrator::new(config, Box::new(server), Box::new(function), Arc::<MemoryRunLog>::clone(log)).run()
}

/// Returns the report of a matrix run.
fn matrix_names(summary: &RunSummary) -> Vec<String> {
    let RunSummary::Matrix(report) = summary else {
        panic!("expected matrix summary");
    };
    report.outcomes().iter().map(|outcome| outcome.name().to_string()).collect()
}

// ============================================================================
// SECTION: HTTP
// ============================================================================

#[test]
fn http_echo_passes_and_tears_down_once() {
    let dir = TempDir::new().unwrap();
    let shared = Arc::new(Shared::default());
    let log = Arc::new(MemoryRunLog::new());
    let summary = run(
        config_in(&dir, SignatureType::Http),
        StandInServer::new(&shared),
        StandInFunction::new(SignatureType::Http, &shared),
        &log,
    )
    .unwrap();

    assert_eq!(matrix_names(&summary), vec!["HTTP"]);
    let calls = shared.calls.lock().unwrap();
    assert_eq!((calls.starts, calls.shutdowns, calls.sends, calls.fetches), (1, 1, 1, 1));
    assert_eq!(log.event_names(), vec![
        "run_started",
        "server_started",
        "matrix_started",
        "scenario_passed",
        "matrix_passed",
        "server_stopped",
        "run_completed",
    ]);
}

#[test]
fn http_output_with_different_formatting_passes() {
    let dir = TempDir::new().unwrap();
    let shared = Arc::new(Shared::default());
    let mut function = StandInFunction::new(SignatureType::Http, &shared);
    function.http_output = Some(b"{ \"res\" : \"PASS\" }\n");
    let log = Arc::new(MemoryRunLog::new());
    let result =
        run(config_in(&dir, SignatureType::Http), StandInServer::new(&shared), function, &log);
    assert!(result.is_ok());
}

#[test]
fn http_mismatch_is_named_failure_with_logs() {
    let dir = TempDir::new().unwrap();
    let shared = Arc::new(Shared::default());
    let mut function = StandInFunction::new(SignatureType::Http, &shared);
    function.http_output = Some(br#"{"res":"FAIL"}"#);
    let log = Arc::new(MemoryRunLog::new());
    let err = run(config_in(&dir, SignatureType::Http), StandInServer::new(&shared), function, &log)
        .unwrap_err();

    let ValidationError::Failed(report) = &err else {
        panic!("expected validation failure, got {err}");
    };
    assert!(matches!(report.failure, RunFailure::Scenarios(_)));
    assert!(report.teardown.is_none());
    let text = err.to_string();
    assert!(text.contains("\t- HTTP:"));
    assert!(text.contains(r#"got {"res":"FAIL"}, want {"res":"PASS"}"#));
    assert!(text.contains("listening on :8080"));
    assert!(text.contains("warning: debug build"));
    assert_eq!(shared.calls.lock().unwrap().shutdowns, 1);
}

// ============================================================================
// SECTION: Lifecycle
// ============================================================================

#[test]
fn startup_failure_skips_teardown() {
    let dir = TempDir::new().unwrap();
    let shared = Arc::new(Shared::default());
    let mut server = StandInServer::new(&shared);
    server.fail_start = true;
    let log = Arc::new(MemoryRunLog::new());
    let err = run(
        config_in(&dir, SignatureType::Cloudevent),
        server,
        StandInFunction::new(SignatureType::Cloudevent, &shared),
        &log,
    )
    .unwrap_err();

    assert_eq!(err, ValidationError::Startup(ServerError::EmptyCommand));
    let calls = shared.calls.lock().unwrap();
    assert_eq!((calls.shutdowns, calls.sends), (0, 0));
    assert_eq!(log.event_names(), vec!["run_started", "server_start_failed"]);
}

#[test]
fn teardown_failure_is_appended_to_validation_failure() {
    let dir = TempDir::new().unwrap();
    let shared = Arc::new(Shared::default());
    let mut server = StandInServer::new(&shared);
    server.fail_shutdown = true;
    let mut function = StandInFunction::new(SignatureType::Legacyevent, &shared);
    function.corrupt = Some("storage");
    let log = Arc::new(MemoryRunLog::new());
    let err = run(config_in(&dir, SignatureType::Legacyevent), server, function, &log).unwrap_err();

    let ValidationError::Failed(report) = &err else {
        panic!("expected validation failure, got {err}");
    };
    assert!(matches!(report.failure, RunFailure::Scenarios(_)));
    assert_eq!(report.teardown, Some(ServerError::Stop("process already gone".to_string())));
    let text = err.to_string();
    let primary = text.find("Validation failure:").unwrap();
    let teardown = text.find("Teardown failure:").unwrap();
    assert!(primary < teardown);
}

#[test]
fn teardown_failure_alone_fails_the_run() {
    let dir = TempDir::new().unwrap();
    let shared = Arc::new(Shared::default());
    let mut server = StandInServer::new(&shared);
    server.fail_shutdown = true;
    let log = Arc::new(MemoryRunLog::new());
    let err = run(
        config_in(&dir, SignatureType::Http),
        server,
        StandInFunction::new(SignatureType::Http, &shared),
        &log,
    )
    .unwrap_err();
    assert!(matches!(err, ValidationError::Teardown(_)));
}

// ============================================================================
// SECTION: Event Matrix
// ============================================================================

#[test]
fn cloud_event_matrix_with_mapping_passes() {
    let dir = TempDir::new().unwrap();
    let shared = Arc::new(Shared::default());
    let log = Arc::new(MemoryRunLog::new());
    let summary = run(
        config_in(&dir, SignatureType::Cloudevent),
        StandInServer::new(&shared),
        StandInFunction::new(SignatureType::Cloudevent, &shared),
        &log,
    )
    .unwrap();

    let names = matrix_names(&summary);
    assert_eq!(&names[.. 3], ["firebase-auth", "pubsub", "storage"]);
    assert!(names.contains(&"firestore (legacy event to cloud event)".to_string()));
    assert!(names.contains(&"pubsub (legacy event to cloud event)".to_string()));
    let summary_event = log
        .events()
        .into_iter()
        .find(|event| event.event == "matrix_summary")
        .unwrap();
    assert!(summary_event.message.starts_with("Events tried:"));
}

#[test]
fn mapping_can_be_disabled() {
    let dir = TempDir::new().unwrap();
    let shared = Arc::new(Shared::default());
    let mut config = config_in(&dir, SignatureType::Legacyevent);
    config.validate_mapping = false;
    let log = Arc::new(MemoryRunLog::new());
    let summary = run(
        config,
        StandInServer::new(&shared),
        StandInFunction::new(SignatureType::Legacyevent, &shared),
        &log,
    )
    .unwrap();
    let names = matrix_names(&summary);
    assert_eq!(names, vec!["firebase-auth", "firestore", "pubsub", "storage"]);
}

#[test]
fn every_failing_scenario_is_reported_together() {
    let dir = TempDir::new().unwrap();
    let shared = Arc::new(Shared::default());
    let mut function = StandInFunction::new(SignatureType::Legacyevent, &shared);
    function.corrupt = Some("storage");
    function.reject = Some("pubsub");
    let log = Arc::new(MemoryRunLog::new());
    let err = run(config_in(&dir, SignatureType::Legacyevent), StandInServer::new(&shared), function, &log)
        .unwrap_err();

    let text = err.to_string();
    assert!(text.contains("\t- storage:"));
    assert!(text.contains("\t- pubsub:"));
    assert!(text.contains("unexpected status 500: function crashed"));
    assert!(text.contains("\t- storage (cloud event to legacy event):"));
    assert!(!text.contains("\t- firestore:"));

    let failed = log.events().into_iter().filter(|event| event.event == "scenario_failed").count();
    let passed = log.events().into_iter().filter(|event| event.event == "scenario_passed").count();
    assert_eq!(failed, 4);
    assert_eq!(passed, 3);
    assert_eq!(shared.calls.lock().unwrap().shutdowns, 1);
}

// ============================================================================
// SECTION: Benchmark Mode
// ============================================================================

#[test]
fn benchmark_mode_replaces_the_matrix() {
    let dir = TempDir::new().unwrap();
    let shared = Arc::new(Shared::default());
    let mut config = config_in(&dir, SignatureType::Http);
    config.validate_concurrency = true;
    config.benchmark = BenchmarkConfig {
        fan_out: 4,
        scaling_factor: 2,
        min_baseline_ms: 100,
    };
    let mut function = StandInFunction::new(SignatureType::Http, &shared);
    function.latency = Duration::from_millis(200);
    let log = Arc::new(MemoryRunLog::new());
    let summary = run(config, StandInServer::new(&shared), function, &log).unwrap();

    let RunSummary::Benchmark(sample) = summary else {
        panic!("expected benchmark summary");
    };
    assert_eq!(sample.fan_out, 4);
    let calls = shared.calls.lock().unwrap();
    assert_eq!((calls.sends, calls.fetches, calls.shutdowns), (5, 0, 1));
}

#[test]
fn benchmark_floor_violation_fails_the_run() {
    let dir = TempDir::new().unwrap();
    let shared = Arc::new(Shared::default());
    let mut config = config_in(&dir, SignatureType::Cloudevent);
    config.validate_concurrency = true;
    let log = Arc::new(MemoryRunLog::new());
    let err = run(
        config,
        StandInServer::new(&shared),
        StandInFunction::new(SignatureType::Cloudevent, &shared),
        &log,
    )
    .unwrap_err();
    let ValidationError::Failed(report) = err else {
        panic!("expected validation failure");
    };
    assert!(matches!(report.failure, RunFailure::Benchmark(_)));
    assert_eq!(shared.calls.lock().unwrap().shutdowns, 1);
}
