// crates/conformance-validator/src/transport.rs
// ============================================================================
// Module: Event Transport
// Description: Delivers requests and events to the function under test.
// Purpose: POST plain bodies and binary-mode CloudEvents over HTTP.
// Dependencies: conformance-events, reqwest, url
// ============================================================================

//! ## Overview
//! [`Transport`] is the delivery seam used by the orchestrator and the
//! concurrency benchmark. [`HttpTransport`] sends every request to one target
//! URL with a blocking client.
//! Invariants:
//! - Non-success status codes are errors carrying the status and body.
//! - CloudEvents are delivered in binary content mode.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use conformance_events::CloudEvent;
use conformance_events::Encoding;
use reqwest::blocking::Client;
use reqwest::blocking::RequestBuilder;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Content type for plain JSON requests.
const JSON_CONTENT_TYPE: &str = "application/json";
/// Prefix of binary-mode CloudEvent attribute headers.
const CE_HEADER_PREFIX: &str = "ce-";
/// Upper bound on response body text carried in errors.
const MAX_ERROR_BODY_CHARS: usize = 1024;

// ============================================================================
// SECTION: Contract
// ============================================================================

/// Request delivery to the function under test.
pub trait Transport: Sync {
    /// Sends a plain JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when delivery fails or is rejected.
    fn send_plain(&self, body: &[u8]) -> Result<(), TransportError>;

    /// Sends a CloudEvent.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when delivery fails or is not acknowledged.
    fn send_structured(&self, event: &CloudEvent) -> Result<(), TransportError>;
}

// ============================================================================
// SECTION: HTTP Transport
// ============================================================================

/// Blocking HTTP transport bound to one target URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// HTTP client.
    client: Client,
    /// Target URL.
    url: Url,
}

impl HttpTransport {
    /// Builds a transport for `url` with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the URL or client is invalid.
    pub fn new(url: &str) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| TransportError::Client(err.to_string()))?;
        Self::with_client(client, url)
    }

    /// Builds a transport with a preconfigured client.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the URL is invalid.
    pub fn with_client(client: Client, url: &str) -> Result<Self, TransportError> {
        let url = Url::parse(url).map_err(|err| TransportError::Url(err.to_string()))?;
        Ok(Self {
            client,
            url,
        })
    }

    /// Sends a prepared request and checks the status.
    fn dispatch(request: RequestBuilder) -> Result<(), TransportError> {
        let response = request.send().map_err(|err| TransportError::Request(err.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().unwrap_or_default();
        Err(TransportError::Status {
            status: status.as_u16(),
            body: truncate(body.trim()),
        })
    }
}

impl Transport for HttpTransport {
    fn send_plain(&self, body: &[u8]) -> Result<(), TransportError> {
        let request = self
            .client
            .post(self.url.as_str())
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(body.to_vec());
        Self::dispatch(request)
    }

    fn send_structured(&self, event: &CloudEvent) -> Result<(), TransportError> {
        let body = event.body_bytes().map_err(TransportError::Encode)?;
        let content_type = event.datacontenttype.as_deref().unwrap_or(JSON_CONTENT_TYPE);
        let mut request = self.client.post(self.url.as_str()).header(CONTENT_TYPE, content_type);
        for (name, value) in binary_headers(event) {
            request = request.header(name, value);
        }
        Self::dispatch(request.body(body))
    }
}

// ============================================================================
// SECTION: Deliveries
// ============================================================================

/// One request ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Plain JSON body.
    Plain(Vec<u8>),
    /// CloudEvent delivered in binary content mode.
    Structured(CloudEvent),
}

impl Delivery {
    /// Prepares fixture input bytes for delivery in `encoding`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Encode`] when CloudEvent input does not parse.
    pub fn for_input(encoding: Encoding, bytes: &[u8]) -> Result<Self, TransportError> {
        match encoding {
            Encoding::Legacy => Ok(Self::Plain(bytes.to_vec())),
            Encoding::CloudEvent => CloudEvent::from_slice(bytes)
                .map(Self::Structured)
                .map_err(|err| TransportError::Encode(format!("parsing cloud event input: {err}"))),
        }
    }

    /// Sends the request through `transport`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when delivery fails.
    pub fn send(&self, transport: &dyn Transport) -> Result<(), TransportError> {
        match self {
            Self::Plain(body) => transport.send_plain(body),
            Self::Structured(event) => transport.send_structured(event),
        }
    }
}

// ============================================================================
// SECTION: Binary Mode
// ============================================================================

/// Returns the `ce-*` headers for a CloudEvent in binary content mode.
#[must_use]
pub fn binary_headers(event: &CloudEvent) -> Vec<(String, String)> {
    let mut headers = vec![
        (format!("{CE_HEADER_PREFIX}specversion"), event.specversion.clone()),
        (format!("{CE_HEADER_PREFIX}id"), event.id.clone()),
        (format!("{CE_HEADER_PREFIX}source"), event.source.clone()),
        (format!("{CE_HEADER_PREFIX}type"), event.event_type.clone()),
    ];
    let optional = [
        ("subject", event.subject.as_ref()),
        ("time", event.time.as_ref()),
        ("dataschema", event.dataschema.as_ref()),
    ];
    for (name, value) in optional.into_iter().filter_map(|(name, value)| Some((name, value?))) {
        headers.push((format!("{CE_HEADER_PREFIX}{name}"), value.clone()));
    }
    for (name, value) in &event.extensions {
        let rendered = match value {
            Value::String(text) => text.clone(),
            Value::Null => continue,
            other => other.to_string(),
        };
        headers.push((format!("{CE_HEADER_PREFIX}{name}"), rendered));
    }
    headers
}

/// Caps response text carried in errors.
fn truncate(text: &str) -> String {
    match text.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((cut, _)) => format!("{}...", &text[.. cut]),
        None => text.to_string(),
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Transport errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// HTTP client could not be built.
    #[error("http client error: {0}")]
    Client(String),
    /// Target URL is invalid.
    #[error("invalid target url: {0}")]
    Url(String),
    /// Request body could not be encoded.
    #[error("encoding request: {0}")]
    Encode(String),
    /// Request could not be sent or no response was received.
    #[error("sending request: {0}")]
    Request(String),
    /// Target responded with a non-success status.
    #[error("unexpected status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },
}
