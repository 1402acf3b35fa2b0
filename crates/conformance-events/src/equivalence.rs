// crates/conformance-events/src/equivalence.rs
// ============================================================================
// Module: Event Equivalence
// Description: Format-tolerant comparison of function output against fixtures.
// Purpose: Produce a complete verdict per scenario without aborting.
// Dependencies: serde_json, crate::{corpus, legacy, cloud_event, outcome}
// ============================================================================

//! ## Overview
//! [`EquivalenceEngine`] looks up the expected output for a fixture and
//! encoding, decodes both sides, and records every disagreement as its own
//! [`ScenarioFailure`]. A missing expectation is a skip. Decode errors are
//! failures. Nothing here panics or short-circuits on a mismatch.
//!
//! Legacy events tolerate camelCase or snake_case identifiers, a nested or
//! root-level context, and a flat or structured resource. CloudEvents compare
//! header attributes exactly, the occurrence time as an instant and the
//! payload as parsed JSON.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;

use serde_json::Number;
use serde_json::Value;

use crate::cloud_event::CloudEvent;
use crate::cloud_event::Payload;
use crate::cloud_event::same_instant;
use crate::corpus::EventCorpus;
use crate::encoding::Encoding;
use crate::legacy::ExpectedLegacy;
use crate::legacy::LegacyDocument;
use crate::legacy::LegacyResource;
use crate::outcome::DecodeSide;
use crate::outcome::ScenarioFailure;
use crate::outcome::ScenarioOutcome;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum number of diverging paths listed per payload mismatch.
pub const MAX_DIFF_PATHS: usize = 8;
/// Maximum characters of a rendered value in a failure message.
pub const MAX_RENDERED_CHARS: usize = 512;
/// Placeholder rendered for an absent field.
const MISSING: &str = "<missing>";

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Judges function output against a corpus.
#[derive(Debug, Clone, Copy)]
pub struct EquivalenceEngine<'a> {
    /// Corpus holding expected outputs.
    corpus: &'a EventCorpus,
}

impl<'a> EquivalenceEngine<'a> {
    /// Creates an engine over a corpus.
    #[must_use]
    pub const fn new(corpus: &'a EventCorpus) -> Self {
        Self {
            corpus,
        }
    }

    /// Returns the corpus backing the engine.
    #[must_use]
    pub const fn corpus(&self) -> &'a EventCorpus {
        self.corpus
    }

    /// Judges output produced from an input in the same encoding.
    #[must_use]
    pub fn judge(&self, name: &str, encoding: Encoding, actual: &[u8]) -> ScenarioOutcome {
        self.judge_with(name, encoding, false, actual)
    }

    /// Judges output produced from an input in the other encoding.
    ///
    /// Uses the fixture's converted output when one is recorded.
    #[must_use]
    pub fn judge_converted(&self, name: &str, encoding: Encoding, actual: &[u8]) -> ScenarioOutcome {
        self.judge_with(name, encoding, true, actual)
    }

    /// Resolves the expectation and compares.
    fn judge_with(
        &self,
        name: &str,
        encoding: Encoding,
        is_conversion: bool,
        actual: &[u8],
    ) -> ScenarioOutcome {
        match self.corpus.expected_output(name, encoding, is_conversion) {
            Some(expected) => ScenarioOutcome::judged(name, compare(encoding, expected, actual)),
            None => ScenarioOutcome::skipped(name, format!("no expected {encoding} output")),
        }
    }
}

impl EquivalenceEngine<'static> {
    /// Creates an engine over the built-in corpus.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(EventCorpus::builtin())
    }
}

// ============================================================================
// SECTION: Comparison Entry Points
// ============================================================================

/// Compares raw expected and actual bytes under an encoding.
#[must_use]
pub fn compare(encoding: Encoding, expected: &[u8], actual: &[u8]) -> Vec<ScenarioFailure> {
    match encoding {
        Encoding::Legacy => compare_legacy(expected, actual),
        Encoding::CloudEvent => compare_cloud_event(expected, actual),
    }
}

/// Compares two legacy events.
#[must_use]
pub fn compare_legacy(expected: &[u8], actual: &[u8]) -> Vec<ScenarioFailure> {
    let want = match ExpectedLegacy::from_slice(expected) {
        Ok(want) => want,
        Err(message) => return vec![decode_failure(DecodeSide::Expected, Encoding::Legacy, message)],
    };
    let got = match LegacyDocument::from_slice(actual) {
        Ok(got) => got,
        Err(message) => return vec![decode_failure(DecodeSide::Actual, Encoding::Legacy, message)],
    };

    let mut failures = Vec::new();
    let got_data = got.data().unwrap_or(&Value::Null);
    failures.extend(compare_documents("legacy event data", got_data, &want.data));
    check_text(&mut failures, "legacy event ID", got.event_id(), &want.event_id);
    check_text(&mut failures, "legacy event type", got.event_type(), &want.event_type);
    check_timestamp(&mut failures, "legacy event timestamp", got.timestamp(), &want.timestamp);
    check_resource(&mut failures, got.resource(), &want.resource);
    failures
}

/// Compares two CloudEvents in JSON structured form.
#[must_use]
pub fn compare_cloud_event(expected: &[u8], actual: &[u8]) -> Vec<ScenarioFailure> {
    let want = match CloudEvent::from_slice(expected) {
        Ok(want) => want,
        Err(err) => {
            return vec![decode_failure(DecodeSide::Expected, Encoding::CloudEvent, err.to_string())];
        }
    };
    let got = match CloudEvent::from_slice(actual) {
        Ok(got) => got,
        Err(err) => {
            return vec![decode_failure(DecodeSide::Actual, Encoding::CloudEvent, err.to_string())];
        }
    };

    let mut failures = Vec::new();
    check_exact(&mut failures, "cloud event id", Some(&got.id), Some(&want.id));
    check_exact(&mut failures, "cloud event source", Some(&got.source), Some(&want.source));
    check_exact(&mut failures, "cloud event type", Some(&got.event_type), Some(&want.event_type));
    check_exact(
        &mut failures,
        "cloud event datacontenttype",
        got.datacontenttype.as_ref(),
        want.datacontenttype.as_ref(),
    );
    if want.subject.is_some() {
        check_exact(&mut failures, "cloud event subject", got.subject.as_ref(), want.subject.as_ref());
    }
    match (got.time.as_deref(), want.time.as_deref()) {
        (None, None) => {}
        (Some(got), Some(want)) if same_instant(got, want) => {}
        (got, want) => failures.push(ScenarioFailure::mismatch(
            "cloud event time",
            render_text(got),
            render_text(want),
        )),
    }
    match (got.payload(), want.payload()) {
        (Err(message), _) => {
            failures.push(decode_failure(DecodeSide::Actual, Encoding::CloudEvent, message));
        }
        (_, Err(message)) => {
            failures.push(decode_failure(DecodeSide::Expected, Encoding::CloudEvent, message));
        }
        (Ok(got), Ok(want)) => failures.extend(compare_payloads(&got, &want)),
    }
    failures
}

/// Compares two JSON documents structurally.
///
/// Returns a payload mismatch listing diverging paths, or `None` when equal.
#[must_use]
pub fn compare_documents(field: &str, got: &Value, want: &Value) -> Option<ScenarioFailure> {
    if json_equal(got, want) {
        return None;
    }
    let mut paths = Vec::new();
    diff_paths("$", want, got, &mut paths);
    Some(ScenarioFailure::PayloadMismatch {
        field: field.to_string(),
        paths,
        got: render_json(got),
        want: render_json(want),
    })
}

// ============================================================================
// SECTION: Field Checks
// ============================================================================

/// Builds a decode failure entry.
fn decode_failure(side: DecodeSide, encoding: Encoding, message: String) -> ScenarioFailure {
    ScenarioFailure::Decode {
        side,
        encoding,
        message,
    }
}

/// Records a mismatch unless `got` is the string `want`.
fn check_text(failures: &mut Vec<ScenarioFailure>, field: &str, got: Option<&Value>, want: &str) {
    if got.and_then(Value::as_str) != Some(want) {
        failures.push(ScenarioFailure::mismatch(field, render_value(got), render_text(Some(want))));
    }
}

/// Records a mismatch unless both optional strings are equal.
fn check_exact(
    failures: &mut Vec<ScenarioFailure>,
    field: &str,
    got: Option<&String>,
    want: Option<&String>,
) {
    if got != want {
        failures.push(ScenarioFailure::mismatch(
            field,
            render_text(got.map(String::as_str)),
            render_text(want.map(String::as_str)),
        ));
    }
}

/// Records a mismatch unless the timestamps denote the same instant.
fn check_timestamp(
    failures: &mut Vec<ScenarioFailure>,
    field: &str,
    got: Option<&Value>,
    want: &str,
) {
    let matches = got.and_then(Value::as_str).is_some_and(|got| same_instant(got, want));
    if !matches {
        failures.push(ScenarioFailure::mismatch(field, render_value(got), render_text(Some(want))));
    }
}

/// Records resource mismatches for either accepted shape.
fn check_resource(failures: &mut Vec<ScenarioFailure>, got: Option<&Value>, want: &LegacyResource) {
    match got {
        Some(Value::String(path)) => {
            if path != &want.raw_path {
                failures.push(ScenarioFailure::mismatch(
                    "legacy event resource path",
                    render_text(Some(path)),
                    render_text(Some(&want.raw_path)),
                ));
            }
        }
        Some(Value::Object(fields)) => {
            let parts = [
                ("service", want.service.as_deref()),
                ("name", want.name.as_deref()),
                ("type", want.kind.as_deref()),
            ];
            for (key, expected) in parts {
                let actual = fields.get(key).filter(|value| !value.is_null());
                if actual.and_then(Value::as_str) != expected
                    || (expected.is_none() && actual.is_some())
                {
                    failures.push(ScenarioFailure::mismatch(
                        format!("legacy event resource {key}"),
                        render_value(actual),
                        render_text(expected),
                    ));
                }
            }
        }
        other => failures.push(ScenarioFailure::mismatch(
            "legacy event resource",
            render_value(other),
            render_text(Some(&want.raw_path)),
        )),
    }
}

/// Compares decoded CloudEvent payloads.
fn compare_payloads(got: &Payload, want: &Payload) -> Option<ScenarioFailure> {
    const FIELD: &str = "cloud event data";
    match (got, want) {
        (Payload::Json(got), Payload::Json(want)) => compare_documents(FIELD, got, want),
        _ if got == want => None,
        _ => Some(ScenarioFailure::PayloadMismatch {
            field: FIELD.to_string(),
            paths: vec!["$".to_string()],
            got: render_payload(got),
            want: render_payload(want),
        }),
    }
}

// ============================================================================
// SECTION: Structural Diff
// ============================================================================

/// Collects JSON paths where `want` and `got` diverge, up to the cap.
fn diff_paths(path: &str, want: &Value, got: &Value, out: &mut Vec<String>) {
    if out.len() >= MAX_DIFF_PATHS {
        return;
    }
    match (want, got) {
        (Value::Object(want), Value::Object(got)) => {
            let mut keys: Vec<&String> = want.keys().chain(got.keys()).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                let child = format!("{path}.{key}");
                match (want.get(key), got.get(key)) {
                    (Some(want), Some(got)) => diff_paths(&child, want, got, out),
                    _ => push_path(out, child),
                }
            }
        }
        (Value::Array(want), Value::Array(got)) => {
            if want.len() != got.len() {
                push_path(out, format!("{path}.length"));
            }
            for (index, (want, got)) in want.iter().zip(got).enumerate() {
                diff_paths(&format!("{path}[{index}]"), want, got, out);
            }
        }
        _ if !json_equal(want, got) => push_path(out, path.to_string()),
        _ => {}
    }
}

/// Structural JSON equality where numbers compare by value.
///
/// `1`, `1.0` and `1e0` are equal; map key order never matters.
#[must_use]
pub fn json_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => numbers_equal(left, right),
        (Value::Array(left), Value::Array(right)) => {
            left.len() == right.len() && left.iter().zip(right).all(|(left, right)| json_equal(left, right))
        }
        (Value::Object(left), Value::Object(right)) => {
            left.len() == right.len()
                && left
                    .iter()
                    .all(|(key, value)| right.get(key).is_some_and(|other| json_equal(value, other)))
        }
        _ => left == right,
    }
}

/// Compares integers exactly and everything else as `f64`.
fn numbers_equal(left: &Number, right: &Number) -> bool {
    if let (Some(left), Some(right)) = (left.as_i64(), right.as_i64()) {
        return left == right;
    }
    if let (Some(left), Some(right)) = (left.as_u64(), right.as_u64()) {
        return left == right;
    }
    match (left.as_f64(), right.as_f64()) {
        (Some(left), Some(right)) => left.partial_cmp(&right) == Some(Ordering::Equal),
        _ => false,
    }
}

/// Appends a path while under the cap.
fn push_path(out: &mut Vec<String>, path: String) {
    if out.len() < MAX_DIFF_PATHS {
        out.push(path);
    }
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders an optional JSON value.
fn render_value(value: Option<&Value>) -> String {
    value.map_or_else(|| MISSING.to_string(), render_json)
}

/// Renders an optional string as a JSON string literal.
fn render_text(text: Option<&str>) -> String {
    text.map_or_else(|| MISSING.to_string(), |text| render_json(&Value::String(text.to_string())))
}

/// Renders a payload for failure messages.
fn render_payload(payload: &Payload) -> String {
    match payload {
        Payload::Absent => MISSING.to_string(),
        Payload::Json(value) => render_json(value),
        Payload::Bytes(bytes) => truncate(String::from_utf8_lossy(bytes).into_owned()),
    }
}

/// Renders JSON compactly, truncated to the display limit.
fn render_json(value: &Value) -> String {
    truncate(value.to_string())
}

/// Truncates on a character boundary.
fn truncate(text: String) -> String {
    match text.char_indices().nth(MAX_RENDERED_CHARS) {
        Some((cut, _)) => format!("{}...", &text[.. cut]),
        None => text,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
