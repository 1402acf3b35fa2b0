// crates/conformance-validator/src/log.rs
// ============================================================================
// Module: Run Log
// Description: Structured run events and pluggable sinks.
// Purpose: Record run progress without binding to a logging backend.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every phase transition, server lifecycle step, scenario verdict and
//! benchmark timing is emitted as a [`RunEvent`] through a [`RunLog`] sink.
//! Sinks never fail the run; write errors are dropped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::config::LogFormat;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Phase of a validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// Bringing up the function server.
    Starting,
    /// Running the concurrency benchmark.
    Benchmark,
    /// Running the scenario matrix.
    Matrix,
    /// Tearing down the function server.
    Teardown,
    /// Run finished.
    Completed,
}

impl RunPhase {
    /// Returns a stable label for the phase.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Benchmark => "benchmark",
            Self::Matrix => "matrix",
            Self::Teardown => "teardown",
            Self::Completed => "completed",
        }
    }
}

/// One structured run log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Run phase the event belongs to.
    pub phase: RunPhase,
    /// Scenario label when the event concerns one scenario.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
    /// Human-readable message.
    pub message: String,
}

impl RunEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(event: &'static str, phase: RunPhase, message: impl Into<String>) -> Self {
        Self {
            event,
            timestamp_ms: now_millis(),
            phase,
            scenario: None,
            message: message.into(),
        }
    }

    /// Attaches a scenario label.
    #[must_use]
    pub fn with_scenario(mut self, scenario: impl Into<String>) -> Self {
        self.scenario = Some(scenario.into());
        self
    }

    /// Renders the event as a text line.
    #[must_use]
    pub fn render_text(&self) -> String {
        match &self.scenario {
            Some(scenario) => format!("[{}] {scenario}: {}", self.phase.as_str(), self.message),
            None => format!("[{}] {}", self.phase.as_str(), self.message),
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Run log sink.
pub trait RunLog: Send + Sync {
    /// Records a run event.
    fn record(&self, event: &RunEvent);
}

/// Sink that writes events to stderr.
pub struct StderrRunLog {
    /// Line rendering.
    format: LogFormat,
}

impl StderrRunLog {
    /// Creates a stderr sink with the given rendering.
    #[must_use]
    pub const fn new(format: LogFormat) -> Self {
        Self {
            format,
        }
    }
}

impl RunLog for StderrRunLog {
    fn record(&self, event: &RunEvent) {
        let line = match self.format {
            LogFormat::Text => event.render_text(),
            LogFormat::Json => match serde_json::to_string(event) {
                Ok(payload) => payload,
                Err(_) => return,
            },
        };
        let _ = writeln!(io::stderr(), "{line}");
    }
}

/// Sink that appends JSON lines to a file.
pub struct FileRunLog {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileRunLog {
    /// Opens the run log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl RunLog for FileRunLog {
    fn record(&self, event: &RunEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// Sink that keeps events in memory.
#[derive(Default)]
pub struct MemoryRunLog {
    /// Recorded events in order.
    events: Mutex<Vec<RunEvent>>,
}

impl MemoryRunLog {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<RunEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Returns the identifiers of recorded events in order.
    #[must_use]
    pub fn event_names(&self) -> Vec<&'static str> {
        self.events().iter().map(|event| event.event).collect()
    }
}

impl RunLog for MemoryRunLog {
    fn record(&self, event: &RunEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Sink that discards events.
pub struct NoopRunLog;

impl RunLog for NoopRunLog {
    fn record(&self, _event: &RunEvent) {}
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns milliseconds since the Unix epoch, or zero if the clock is skewed.
fn now_millis() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|elapsed| elapsed.as_millis()).unwrap_or(0)
}

#[cfg(test)]
mod tests;
