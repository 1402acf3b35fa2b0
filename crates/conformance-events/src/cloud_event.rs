// crates/conformance-events/src/cloud_event.rs
// ============================================================================
// Module: CloudEvent Envelope
// Description: Typed CloudEvent envelope in JSON structured form.
// Purpose: Decode envelopes and expose their payload and instant.
// Dependencies: serde, serde_json, base64, time
// ============================================================================

//! ## Overview
//! [`CloudEvent`] is the JSON structured rendering of a CloudEvent: required
//! `id`, `source` and `type` attributes, optional `datacontenttype`,
//! `subject` and `time`, and a payload carried either as `data` or as
//! `data_base64`. Unknown attributes are kept as extensions.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Envelope
// ============================================================================

/// Default spec version when an envelope omits it.
pub const DEFAULT_SPEC_VERSION: &str = "1.0";

/// CloudEvent envelope in JSON structured form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudEvent {
    /// Spec version attribute.
    #[serde(default = "default_spec_version")]
    pub specversion: String,
    /// Event identifier.
    pub id: String,
    /// Event source URI reference.
    pub source: String,
    /// Event type.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Payload media type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datacontenttype: Option<String>,
    /// Payload schema URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataschema: Option<String>,
    /// Subject within the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Occurrence time as RFC 3339 text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    /// Structured payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Binary payload, base64 encoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_base64: Option<String>,
    /// Extension attributes.
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

/// Returns the default spec version for serde.
fn default_spec_version() -> String {
    DEFAULT_SPEC_VERSION.to_string()
}

/// Decoded CloudEvent payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// No payload present.
    Absent,
    /// Structured JSON payload.
    Json(Value),
    /// Opaque bytes that are not JSON.
    Bytes(Vec<u8>),
}

impl CloudEvent {
    /// Parses a JSON structured CloudEvent.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] when the bytes are not a valid envelope.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Returns true when the payload media type is JSON or unspecified.
    #[must_use]
    pub fn is_json_content(&self) -> bool {
        self.datacontenttype.as_deref().is_none_or(|media| media.contains("json"))
    }

    /// Decodes the payload for structural comparison.
    ///
    /// JSON text embedded as a string (or as base64 bytes) is parsed so
    /// differently serialized documents compare equal.
    ///
    /// # Errors
    ///
    /// Returns a message when `data_base64` is not valid base64.
    pub fn payload(&self) -> Result<Payload, String> {
        if let Some(encoded) = &self.data_base64 {
            let bytes =
                STANDARD.decode(encoded).map_err(|err| format!("invalid data_base64: {err}"))?;
            return Ok(match serde_json::from_slice::<Value>(&bytes) {
                Ok(value) => Payload::Json(value),
                Err(_) => Payload::Bytes(bytes),
            });
        }
        Ok(match &self.data {
            None => Payload::Absent,
            Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
                Ok(parsed @ (Value::Object(_) | Value::Array(_))) => Payload::Json(parsed),
                _ => Payload::Json(Value::String(text.clone())),
            },
            Some(value) => Payload::Json(value.clone()),
        })
    }

    /// Returns the payload bytes for binary content mode delivery.
    ///
    /// # Errors
    ///
    /// Returns a message when the payload cannot be encoded.
    pub fn body_bytes(&self) -> Result<Vec<u8>, String> {
        if let Some(encoded) = &self.data_base64 {
            return STANDARD.decode(encoded).map_err(|err| format!("invalid data_base64: {err}"));
        }
        match &self.data {
            None => Ok(Vec::new()),
            Some(Value::String(text)) if !self.is_json_content() => Ok(text.clone().into_bytes()),
            Some(value) => serde_json::to_vec(value).map_err(|err| err.to_string()),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses RFC 3339 text into an instant.
#[must_use]
pub fn parse_instant(text: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(text, &Rfc3339).ok()
}

/// Returns true when two RFC 3339 strings denote the same instant.
///
/// Falls back to string equality when either side does not parse.
#[must_use]
pub fn same_instant(left: &str, right: &str) -> bool {
    if left == right {
        return true;
    }
    match (parse_instant(left), parse_instant(right)) {
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
