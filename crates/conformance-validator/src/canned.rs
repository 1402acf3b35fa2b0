// crates/conformance-validator/src/canned.rs
// ============================================================================
// Module: Canned Requests
// Description: Fixed request payloads for the concurrency benchmark.
// Purpose: Provide one representative request per signature type.
// Dependencies: conformance-events
// ============================================================================

//! ## Overview
//! The benchmark only measures response timing, so any payload that
//! conforms to the signature type's schema works. These mirror a Firebase
//! Auth user-creation event in each encoding.

// ============================================================================
// SECTION: Imports
// ============================================================================

use conformance_events::Encoding;

use crate::config::SignatureType;
use crate::transport::Delivery;
use crate::transport::TransportError;

// ============================================================================
// SECTION: Payloads
// ============================================================================

/// Plain HTTP request body.
pub const HTTP_BODY: &str = r#"{"data": "hello"}"#;

/// Structured CloudEvent request.
pub const CLOUD_EVENT_BODY: &str = r#"{
  "specversion": "1.0",
  "type": "google.firebase.auth.user.v1.created",
  "source": "//firebaseauth.googleapis.com/projects/my-project-id",
  "subject": "users/UUpby3s4spZre6kHsgVSPetzQ8l2",
  "id": "aaaaaa-1111-bbbb-2222-cccccccccccc",
  "time": "2020-09-29T11:32:00.123Z",
  "datacontenttype": "application/json",
  "data": {
    "email": "test@nowhere.com",
    "metadata": {
      "createTime": "2020-05-26T10:42:27Z",
      "lastSignInTime": "2020-10-24T11:00:00Z"
    },
    "providerData": [
      {
        "email": "test@nowhere.com",
        "providerId": "password",
        "uid": "test@nowhere.com"
      }
    ],
    "uid": "UUpby3s4spZre6kHsgVSPetzQ8l2"
  }
}"#;

/// Legacy event request.
pub const LEGACY_EVENT_BODY: &str = r#"{
  "data": {
    "email": "test@nowhere.com",
    "metadata": {
      "createdAt": "2020-05-26T10:42:27Z",
      "lastSignedInAt": "2020-10-24T11:00:00Z"
    },
    "providerData": [
      {
        "email": "test@nowhere.com",
        "providerId": "password",
        "uid": "test@nowhere.com"
      }
    ],
    "uid": "UUpby3s4spZre6kHsgVSPetzQ8l2"
  },
  "eventId": "aaaaaa-1111-bbbb-2222-cccccccccccc",
  "eventType": "providers/firebase.auth/eventTypes/user.create",
  "notSupported": {},
  "resource": "projects/my-project-id",
  "timestamp": "2020-09-29T11:32:00.123Z"
}"#;

// ============================================================================
// SECTION: Selection
// ============================================================================

/// Returns the benchmark request for a signature type.
///
/// # Errors
///
/// Returns [`TransportError::Encode`] when the canned CloudEvent does not parse.
pub fn canned_delivery(signature_type: SignatureType) -> Result<Delivery, TransportError> {
    match signature_type {
        SignatureType::Http => Ok(Delivery::Plain(HTTP_BODY.as_bytes().to_vec())),
        SignatureType::Cloudevent => {
            Delivery::for_input(Encoding::CloudEvent, CLOUD_EVENT_BODY.as_bytes())
        }
        SignatureType::Legacyevent => {
            Delivery::for_input(Encoding::Legacy, LEGACY_EVENT_BODY.as_bytes())
        }
    }
}

#[cfg(test)]
mod tests;
