// crates/conformance-events/src/equivalence/tests.rs
// ============================================================================
// Module: Equivalence Helper Tests
// Description: Unit tests for structural diff and rendering helpers.
// Purpose: Validate diff path collection, caps and truncation.
// Dependencies: conformance-events
// ============================================================================

//! ## Overview
//! Exercises the private diff and rendering helpers behind the engine.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use serde_json::json;

use super::*;

#[test]
fn diff_paths_reports_nested_and_missing_keys() {
    let mut paths = Vec::new();
    diff_paths(
        "$",
        &json!({"a": {"b": 1, "c": [1, 2]}, "d": true}),
        &json!({"a": {"b": 2, "c": [1]}, "e": true}),
        &mut paths,
    );
    assert_eq!(paths, vec!["$.a.b", "$.a.c.length", "$.d", "$.e"]);
}

#[test]
fn diff_paths_are_capped() {
    let want: serde_json::Map<String, Value> =
        (0 .. 20).map(|index| (format!("k{index:02}"), json!(index))).collect();
    let mut paths = Vec::new();
    diff_paths("$", &Value::Object(want), &json!({}), &mut paths);
    assert_eq!(paths.len(), MAX_DIFF_PATHS);
}

#[test]
fn long_values_are_truncated() {
    let rendered = render_json(&Value::String("x".repeat(MAX_RENDERED_CHARS * 2)));
    assert!(rendered.ends_with("..."));
    assert_eq!(rendered.chars().count(), MAX_RENDERED_CHARS + 3);
}

#[test]
fn missing_timestamp_is_reported() {
    let mut failures = Vec::new();
    check_timestamp(&mut failures, "legacy event timestamp", None, "2020-01-01T00:00:00Z");
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].field(), Some("legacy event timestamp"));
}
