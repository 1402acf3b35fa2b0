// crates/conformance-validator/src/orchestrator/tests.rs
// ============================================================================
// Module: Validation Orchestrator Tests
// Description: Unit tests for HTTP judging and failure rendering.
// Purpose: Validate HTTP output tolerance, log tails and report layout.
// Dependencies: conformance-validator, tempfile
// ============================================================================

//! ## Overview
//! Covers the helpers behind the orchestrator; full runs live in the crate's
//! integration tests.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use tempfile::TempDir;

use super::*;

#[test]
fn http_output_ignores_whitespace_and_key_order() {
    assert_eq!(compare_http_output(b"{ \"res\": \"PASS\" }\n"), None);
}

#[test]
fn http_output_value_change_names_the_path() {
    let failure = compare_http_output(br#"{"res":"FAIL"}"#).unwrap();
    let ScenarioFailure::PayloadMismatch {
        field,
        paths,
        ..
    } = failure
    else {
        panic!("expected payload mismatch");
    };
    assert_eq!(field, "HTTP output data");
    assert_eq!(paths, vec!["$.res".to_string()]);
}

#[test]
fn http_output_that_is_not_json_is_a_mismatch() {
    let failure = compare_http_output(b"PASS").unwrap();
    assert_eq!(failure.to_string(), r#"unexpected HTTP output data: got PASS, want {"res":"PASS"}"#);
}

#[test]
fn log_tail_keeps_the_end() {
    let bytes = vec![b'a'; MAX_CAPTURED_LOG_BYTES + 5];
    let text = tail_text(&bytes);
    assert!(text.starts_with("..."));
    assert_eq!(text.len(), MAX_CAPTURED_LOG_BYTES + 3);
    assert_eq!(tail_text(b"short"), "short");
}

#[test]
fn failure_report_lists_primary_teardown_then_logs() {
    let dir = TempDir::new().unwrap();
    let stdout = dir.path().join("stdout.txt");
    fs::write(&stdout, "served 3 requests\n").unwrap();
    let report = FailureReport {
        failure: RunFailure::Scenarios("Validation errors:\n\t- pubsub:".to_string()),
        teardown: Some(ServerError::NotRunning),
        stdout: LogCapture::read(&stdout),
        stderr: LogCapture::read(&dir.path().join("missing.txt")),
    };
    let text = report.to_string();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "Validation failure: Validation errors:");
    assert_eq!(lines[2], "Teardown failure: server is not running");
    assert_eq!(lines[3], "Server logs:");
    assert!(lines[4].ends_with("stdout.txt ---"));
    assert_eq!(lines[5], "served 3 requests");
    assert!(lines[6].contains("missing.txt (unavailable:"));
}
