// crates/conformance-validator/src/orchestrator.rs
// ============================================================================
// Module: Validation Orchestrator
// Description: Drives one validation run against the function under test.
// Purpose: Sequence startup, scenario dispatch, judging and teardown.
// Dependencies: conformance-events, thiserror
// ============================================================================

//! ## Overview
//! A run moves through `Starting`, then either `Benchmark` or `Matrix`,
//! then `Teardown` and `Completed`. Teardown runs exactly once whenever the
//! server started, whatever the validation outcome.
//! Invariants:
//! - A startup failure skips teardown and fails the run.
//! - Scenarios run sequentially; every outcome is collected before judging
//!   the run.
//! - Teardown errors are appended to, never substituted for, a validation
//!   failure.
//! - Failing runs carry the captured server stdout and stderr.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use conformance_events::Encoding;
use conformance_events::EquivalenceEngine;
use conformance_events::ScenarioFailure;
use conformance_events::ScenarioOutcome;
use conformance_events::ValidationReport;
use conformance_events::Verdict;
use conformance_events::compare_documents;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::benchmark::BenchmarkError;
use crate::benchmark::BenchmarkSample;
use crate::benchmark::ConcurrencyBenchmark;
use crate::canned::canned_delivery;
use crate::config::SignatureType;
use crate::config::ValidatorConfig;
use crate::log::RunEvent;
use crate::log::RunLog;
use crate::log::RunPhase;
use crate::server::FunctionServer;
use crate::server::ServerError;
use crate::transport::Delivery;
use crate::transport::Transport;
use crate::transport::TransportError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Scenario name of the plain HTTP check.
pub const HTTP_SCENARIO: &str = "HTTP";
/// Body the HTTP function is expected to echo into its output file.
pub const HTTP_REQUEST: &[u8] = br#"{"res":"PASS"}"#;
/// Field label of the HTTP output comparison.
const HTTP_OUTPUT_FIELD: &str = "HTTP output data";
/// Upper bound on captured log bytes kept per stream, from the end.
pub const MAX_CAPTURED_LOG_BYTES: usize = 64 * 1024;

// ============================================================================
// SECTION: Results
// ============================================================================

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunSummary {
    /// Scenario matrix outcomes.
    Matrix(ValidationReport),
    /// Concurrency benchmark measurements.
    Benchmark(BenchmarkSample),
}

/// Primary reason a run failed after startup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RunFailure {
    /// One or more scenarios failed; carries the rendered failure list.
    #[error("{0}")]
    Scenarios(String),
    /// The concurrency benchmark failed.
    #[error(transparent)]
    Benchmark(#[from] BenchmarkError),
    /// The benchmark request could not be prepared.
    #[error("preparing benchmark request: {0}")]
    Request(TransportError),
}

/// Server log contents captured after teardown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogCapture {
    /// Log file path.
    pub path: PathBuf,
    /// File contents, or the read error.
    pub contents: Result<String, String>,
}

impl LogCapture {
    /// Reads the tail of a log file.
    #[must_use]
    pub fn read(path: &Path) -> Self {
        let contents = fs::read(path).map(|bytes| tail_text(&bytes)).map_err(|err| err.to_string());
        Self {
            path: path.to_path_buf(),
            contents,
        }
    }
}

impl fmt::Display for LogCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.contents {
            Ok(text) => write!(f, "--- {} ---\n{}", self.path.display(), text.trim_end()),
            Err(err) => write!(f, "--- {} (unavailable: {err}) ---", self.path.display()),
        }
    }
}

/// Everything reported for a failed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    /// Primary failure.
    pub failure: RunFailure,
    /// Teardown failure, if teardown also failed.
    pub teardown: Option<ServerError>,
    /// Captured server stdout.
    pub stdout: LogCapture,
    /// Captured server stderr.
    pub stderr: LogCapture,
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failure: {}", self.failure)?;
        if let Some(teardown) = &self.teardown {
            write!(f, "\nTeardown failure: {teardown}")?;
        }
        write!(f, "\nServer logs:\n{}\n{}", self.stdout, self.stderr)
    }
}

/// Run-level errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The server could not be started; nothing was torn down.
    #[error("unable to start server: {0}")]
    Startup(ServerError),
    /// Validation failed after a successful start.
    #[error("{0}")]
    Failed(Box<FailureReport>),
    /// Validation passed but the server could not be stopped.
    #[error("teardown failure: {0}")]
    Teardown(ServerError),
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// Top-level driver for one validation run.
pub struct ValidationOrchestrator {
    /// Immutable run configuration.
    config: ValidatorConfig,
    /// Function under test; exclusively owned for the run.
    server: Box<dyn FunctionServer>,
    /// Request delivery.
    transport: Box<dyn Transport>,
    /// Output judge.
    engine: EquivalenceEngine<'static>,
    /// Run event sink.
    log: Arc<dyn RunLog>,
}

impl ValidationOrchestrator {
    /// Creates an orchestrator over the built-in event corpus.
    #[must_use]
    pub fn new(
        config: ValidatorConfig,
        server: Box<dyn FunctionServer>,
        transport: Box<dyn Transport>,
        log: Arc<dyn RunLog>,
    ) -> Self {
        Self {
            config,
            server,
            transport,
            engine: EquivalenceEngine::builtin(),
            log,
        }
    }

    /// Executes the run, consuming the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when startup, validation or teardown fails.
    pub fn run(mut self) -> Result<RunSummary, ValidationError> {
        let signature = self.config.signature_type;
        self.emit(RunEvent::new(
            "run_started",
            RunPhase::Starting,
            format!("Validating {} for {signature}", self.server.describe()),
        ));
        if let Err(err) = self.server.start(&self.config.paths) {
            self.emit(RunEvent::new("server_start_failed", RunPhase::Starting, err.to_string()));
            return Err(ValidationError::Startup(err));
        }
        self.emit(RunEvent::new("server_started", RunPhase::Starting, "Framework server started."));

        let primary = if self.config.validate_concurrency {
            self.run_benchmark()
        } else {
            self.run_matrix()
        };

        let teardown = self.server.shutdown();
        match &teardown {
            Ok(()) => self.emit(RunEvent::new(
                "server_stopped",
                RunPhase::Teardown,
                "Framework server shut down.",
            )),
            Err(err) => {
                self.emit(RunEvent::new("teardown_failed", RunPhase::Teardown, err.to_string()));
            }
        }

        match (primary, teardown) {
            (Ok(summary), Ok(())) => {
                self.emit(RunEvent::new("run_completed", RunPhase::Completed, "All validation passed!"));
                Ok(summary)
            }
            (Ok(_), Err(err)) => Err(ValidationError::Teardown(err)),
            (Err(failure), teardown) => {
                let report = FailureReport {
                    failure,
                    teardown: teardown.err(),
                    stdout: LogCapture::read(&self.config.paths.stdout),
                    stderr: LogCapture::read(&self.config.paths.stderr),
                };
                self.emit(RunEvent::new("run_failed", RunPhase::Completed, report.failure.to_string()));
                Err(ValidationError::Failed(Box::new(report)))
            }
        }
    }

    // ------------------------------------------------------------------------
    // Benchmark mode
    // ------------------------------------------------------------------------

    /// Runs the concurrency benchmark with the signature type's canned request.
    fn run_benchmark(&self) -> Result<RunSummary, RunFailure> {
        let signature = self.config.signature_type;
        self.emit(RunEvent::new(
            "benchmark_started",
            RunPhase::Benchmark,
            format!("{signature} validation with concurrent requests..."),
        ));
        let delivery = canned_delivery(signature).map_err(RunFailure::Request)?;
        let transport = self.transport.as_ref();
        let benchmark = ConcurrencyBenchmark::new(self.config.benchmark, self.log.as_ref());
        let sample = benchmark.run(|_slot| delivery.send(transport))?;
        self.emit(RunEvent::new(
            "benchmark_passed",
            RunPhase::Benchmark,
            "Concurrency validation passed!",
        ));
        Ok(RunSummary::Benchmark(sample))
    }

    // ------------------------------------------------------------------------
    // Matrix mode
    // ------------------------------------------------------------------------

    /// Runs the scenario matrix for the configured signature type.
    fn run_matrix(&self) -> Result<RunSummary, RunFailure> {
        let signature = self.config.signature_type;
        self.emit(RunEvent::new(
            "matrix_started",
            RunPhase::Matrix,
            format!("{signature} validation started..."),
        ));
        let mut report = ValidationReport::new();
        match signature.encoding() {
            None => report.push(self.record_outcome(self.validate_http())),
            Some(encoding) => {
                report.extend(self.validate_events(encoding, encoding));
                if self.config.validate_mapping {
                    report.extend(self.validate_events(encoding.other(), encoding));
                }
            }
        }
        if signature != SignatureType::Http {
            self.emit(RunEvent::new("matrix_summary", RunPhase::Matrix, report.summary()));
        }
        match report.failure_message() {
            Some(message) => Err(RunFailure::Scenarios(message)),
            None => {
                self.emit(RunEvent::new(
                    "matrix_passed",
                    RunPhase::Matrix,
                    format!("{signature} validation passed!"),
                ));
                Ok(RunSummary::Matrix(report))
            }
        }
    }

    /// Sends the HTTP check request and verifies the function echoed it.
    fn validate_http(&self) -> ScenarioOutcome {
        if let Err(err) = self.transport.send_plain(HTTP_REQUEST) {
            return ScenarioOutcome::failed(HTTP_SCENARIO, ScenarioFailure::Transport(err.to_string()));
        }
        let actual = match self.server.fetch_output() {
            Ok(actual) => actual,
            Err(err) => {
                return ScenarioOutcome::failed(HTTP_SCENARIO, ScenarioFailure::Output(err.to_string()));
            }
        };
        ScenarioOutcome::judged(HTTP_SCENARIO, compare_http_output(&actual).into_iter().collect())
    }

    /// Runs every fixture with `input` encoding, judging output as `output`.
    fn validate_events(&self, input: Encoding, output: Encoding) -> Vec<ScenarioOutcome> {
        let converted = input != output;
        let corpus = self.engine.corpus();
        corpus
            .names_for(input)
            .into_iter()
            .map(|name| {
                let outcome = if corpus.expected_output(name, output, converted).is_none() {
                    ScenarioOutcome::skipped(name, format!("no expected {output} output"))
                } else {
                    self.run_scenario(name, input, output)
                };
                let outcome = if converted {
                    outcome.relabeled(format!("{name} ({input} to {output})"))
                } else {
                    outcome
                };
                self.record_outcome(outcome)
            })
            .collect()
    }

    /// Sends one fixture, fetches the output and judges it.
    fn run_scenario(&self, name: &str, input: Encoding, output: Encoding) -> ScenarioOutcome {
        let corpus = self.engine.corpus();
        let Some(bytes) = corpus.input(name, input) else {
            return ScenarioOutcome::skipped(name, format!("no {input} input"));
        };
        let sent = Delivery::for_input(input, bytes).and_then(|delivery| delivery.send(self.transport.as_ref()));
        if let Err(err) = sent {
            return ScenarioOutcome::failed(name, ScenarioFailure::Transport(err.to_string()));
        }
        let actual = match self.server.fetch_output() {
            Ok(actual) => actual,
            Err(err) => return ScenarioOutcome::failed(name, ScenarioFailure::Output(err.to_string())),
        };
        if input == output {
            self.engine.judge(name, output, &actual)
        } else {
            self.engine.judge_converted(name, output, &actual)
        }
    }

    /// Logs a scenario outcome and passes it through.
    fn record_outcome(&self, outcome: ScenarioOutcome) -> ScenarioOutcome {
        let event = match outcome.verdict() {
            Verdict::Skipped(_) => "scenario_skipped",
            Verdict::Judged(failures) if failures.is_empty() => "scenario_passed",
            Verdict::Judged(_) => "scenario_failed",
        };
        self.emit(RunEvent::new(event, RunPhase::Matrix, outcome.status()).with_scenario(outcome.name()));
        outcome
    }

    /// Records a run event.
    fn emit(&self, event: RunEvent) {
        self.log.record(&event);
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Compares HTTP function output against the request body.
///
/// Serialization differences are ignored; non-JSON output is a mismatch.
#[must_use]
pub fn compare_http_output(actual: &[u8]) -> Option<ScenarioFailure> {
    let want = json!({"res": "PASS"});
    match serde_json::from_slice::<Value>(actual) {
        Ok(got) => compare_documents(HTTP_OUTPUT_FIELD, &got, &want),
        Err(_) => Some(ScenarioFailure::mismatch(
            HTTP_OUTPUT_FIELD,
            String::from_utf8_lossy(actual).into_owned(),
            want.to_string(),
        )),
    }
}

/// Returns the last [`MAX_CAPTURED_LOG_BYTES`] of a log as text.
fn tail_text(bytes: &[u8]) -> String {
    let start = bytes.len().saturating_sub(MAX_CAPTURED_LOG_BYTES);
    let text = String::from_utf8_lossy(&bytes[start ..]).into_owned();
    if start == 0 { text } else { format!("...{text}") }
}

#[cfg(test)]
mod tests;
