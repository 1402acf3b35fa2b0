// crates/conformance-validator/src/canned/tests.rs
// ============================================================================
// Module: Canned Request Tests
// Description: Unit tests for benchmark payload selection.
// Purpose: Ensure every signature type has a deliverable payload.
// Dependencies: conformance-validator, serde_json
// ============================================================================

//! ## Overview
//! Checks that canned payloads parse and map to the right delivery mode.

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
fn http_payload_is_plain_json() {
    let Delivery::Plain(body) = canned_delivery(SignatureType::Http).unwrap() else {
        panic!("http payload must be plain");
    };
    let parsed: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed["data"], "hello");
}

#[test]
fn cloud_event_payload_is_structured() {
    let Delivery::Structured(event) = canned_delivery(SignatureType::Cloudevent).unwrap() else {
        panic!("cloud event payload must be structured");
    };
    assert_eq!(event.event_type, "google.firebase.auth.user.v1.created");
    assert_eq!(event.subject.as_deref(), Some("users/UUpby3s4spZre6kHsgVSPetzQ8l2"));
}

#[test]
fn legacy_payload_is_plain_with_camel_case_context() {
    let Delivery::Plain(body) = canned_delivery(SignatureType::Legacyevent).unwrap() else {
        panic!("legacy payload must be plain");
    };
    let parsed: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed["eventType"], "providers/firebase.auth/eventTypes/user.create");
    assert_eq!(parsed["resource"], "projects/my-project-id");
}
