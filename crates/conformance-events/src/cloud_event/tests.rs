// crates/conformance-events/src/cloud_event/tests.rs
// ============================================================================
// Module: CloudEvent Envelope Tests
// Description: Unit tests for envelope decoding and payload access.
// Purpose: Validate instant comparison and payload decoding.
// Dependencies: conformance-events
// ============================================================================

//! ## Overview
//! Covers base64 payloads, raw text bodies and RFC 3339 instants.

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
fn instants_compare_across_formats() {
    assert!(same_instant("2020-09-29T11:32:00.000Z", "2020-09-29T11:32:00Z"));
    assert!(same_instant("2020-09-29T13:32:00+02:00", "2020-09-29T11:32:00Z"));
    assert!(!same_instant("2020-09-29T11:32:01Z", "2020-09-29T11:32:00Z"));
    assert!(!same_instant("yesterday", "2020-09-29T11:32:00Z"));
}

#[test]
fn base64_payload_decodes_to_json() {
    let event = CloudEvent::from_slice(
        br#"{"id":"1","source":"s","type":"t","data_base64":"eyJhIjogMX0="}"#,
    )
    .unwrap();
    assert_eq!(event.payload().unwrap(), Payload::Json(json!({"a": 1})));
    assert_eq!(event.specversion, DEFAULT_SPEC_VERSION);
}

#[test]
fn text_payload_is_sent_raw_for_non_json_content() {
    let event = CloudEvent::from_slice(
        br#"{"id":"1","source":"s","type":"t","datacontenttype":"text/plain","data":"hi"}"#,
    )
    .unwrap();
    assert_eq!(event.body_bytes().unwrap(), b"hi");
}

#[test]
fn missing_required_attribute_fails_to_decode() {
    assert!(CloudEvent::from_slice(br#"{"id":"1","type":"t"}"#).is_err());
}
