// crates/conformance-validator/src/log/tests.rs
// ============================================================================
// Module: Run Log Tests
// Description: Unit tests for run event rendering and sinks.
// Purpose: Validate text and JSON renderings and file appends.
// Dependencies: conformance-validator, tempfile
// ============================================================================

//! ## Overview
//! Checks event renderings and that the file sink appends one JSON object per
//! line.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use serde_json::Value;

use super::*;

#[test]
fn text_rendering_includes_phase_and_scenario() {
    let event = RunEvent::new("scenario_passed", RunPhase::Matrix, "PASSED").with_scenario("pubsub");
    assert_eq!(event.render_text(), "[matrix] pubsub: PASSED");
    let event = RunEvent::new("server_started", RunPhase::Starting, "server started");
    assert_eq!(event.render_text(), "[starting] server started");
}

#[test]
fn file_sink_appends_json_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.jsonl");
    let sink = FileRunLog::new(&path).unwrap();
    sink.record(&RunEvent::new("phase", RunPhase::Starting, "one"));
    sink.record(&RunEvent::new("phase", RunPhase::Teardown, "two").with_scenario("storage"));

    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<Value> = text.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["phase"], "starting");
    assert!(lines[0].get("scenario").is_none());
    assert_eq!(lines[1]["scenario"], "storage");
}

#[test]
fn memory_sink_keeps_order() {
    let sink = MemoryRunLog::new();
    sink.record(&RunEvent::new("a", RunPhase::Starting, ""));
    sink.record(&RunEvent::new("b", RunPhase::Completed, ""));
    assert_eq!(sink.event_names(), vec!["a", "b"]);
}
