// crates/conformance-events/src/legacy.rs
// ============================================================================
// Module: Legacy Event Documents
// Description: Tolerant accessors over legacy background-event documents.
// Purpose: Resolve context fields across nesting and naming conventions.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Legacy events are JSON objects carrying a `data` payload and four context
//! fields. The context may be nested under `context` or sit at the document
//! root, and identifier keys may be camelCase (`eventId`) or snake_case
//! (`event_id`). [`LegacyDocument`] hides those differences; [`ExpectedLegacy`]
//! is the strict form decoded from recorded fixtures.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Keys
// ============================================================================

/// Accepted keys for the event identifier.
pub const EVENT_ID_KEYS: [&str; 2] = ["eventId", "event_id"];
/// Accepted keys for the event type.
pub const EVENT_TYPE_KEYS: [&str; 2] = ["eventType", "event_type"];
/// Accepted keys for the event timestamp.
pub const TIMESTAMP_KEYS: [&str; 1] = ["timestamp"];
/// Accepted keys for the event resource.
pub const RESOURCE_KEYS: [&str; 1] = ["resource"];

// ============================================================================
// SECTION: Document
// ============================================================================

/// A legacy event decoded as a JSON object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyDocument {
    /// Top-level object.
    root: Map<String, Value>,
}

impl LegacyDocument {
    /// Parses bytes as a legacy document.
    ///
    /// # Errors
    ///
    /// Returns a message when the bytes are not a JSON object.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, String> {
        let value: Value = serde_json::from_slice(bytes).map_err(|err| err.to_string())?;
        match value {
            Value::Object(root) => Ok(Self {
                root,
            }),
            other => Err(format!("expected a JSON object, got {}", json_kind(&other))),
        }
    }

    /// Returns the `data` payload, if any.
    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        self.root.get("data")
    }

    /// Returns the context object, falling back to the root.
    #[must_use]
    pub fn context(&self) -> &Map<String, Value> {
        match self.root.get("context") {
            Some(Value::Object(context)) => context,
            _ => &self.root,
        }
    }

    /// Returns the first non-null context value among `keys`.
    #[must_use]
    pub fn context_field(&self, keys: &[&str]) -> Option<&Value> {
        let context = self.context();
        keys.iter().filter_map(|key| context.get(*key)).find(|value| !value.is_null())
    }

    /// Returns the event identifier under either naming convention.
    #[must_use]
    pub fn event_id(&self) -> Option<&Value> {
        self.context_field(&EVENT_ID_KEYS)
    }

    /// Returns the event type under either naming convention.
    #[must_use]
    pub fn event_type(&self) -> Option<&Value> {
        self.context_field(&EVENT_TYPE_KEYS)
    }

    /// Returns the event timestamp.
    #[must_use]
    pub fn timestamp(&self) -> Option<&Value> {
        self.context_field(&TIMESTAMP_KEYS)
    }

    /// Returns the event resource in whichever shape it was given.
    #[must_use]
    pub fn resource(&self) -> Option<&Value> {
        self.context_field(&RESOURCE_KEYS)
    }
}

// ============================================================================
// SECTION: Expected Form
// ============================================================================

/// Resource of an expected legacy event, in both flat and decomposed form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyResource {
    /// Flat resource path.
    pub raw_path: String,
    /// Owning service, when known.
    pub service: Option<String>,
    /// Resource name.
    pub name: Option<String>,
    /// Resource type, when known.
    pub kind: Option<String>,
}

impl LegacyResource {
    /// Decodes a resource given as a flat path or a structured object.
    ///
    /// A flat path decomposes to a name equal to the path with no service or
    /// type. A structured resource uses its name as the flat path.
    ///
    /// # Errors
    ///
    /// Returns a message when the value is neither shape or lacks a name.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::String(path) => Ok(Self {
                raw_path: path.clone(),
                service: None,
                name: Some(path.clone()),
                kind: None,
            }),
            Value::Object(fields) => {
                let text = |key: &str| fields.get(key).and_then(Value::as_str).map(str::to_string);
                let name = text("name").ok_or_else(|| "resource object missing name".to_string())?;
                Ok(Self {
                    raw_path: name.clone(),
                    service: text("service"),
                    name: Some(name),
                    kind: text("type"),
                })
            }
            other => Err(format!("resource must be a string or object, got {}", json_kind(other))),
        }
    }
}

/// Strictly decoded expected legacy event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedLegacy {
    /// Expected payload; `null` when the fixture omits it.
    pub data: Value,
    /// Expected event identifier.
    pub event_id: String,
    /// Expected event type.
    pub event_type: String,
    /// Expected timestamp text.
    pub timestamp: String,
    /// Expected resource.
    pub resource: LegacyResource,
}

impl ExpectedLegacy {
    /// Decodes a recorded legacy output.
    ///
    /// # Errors
    ///
    /// Returns a message when the document is malformed or a context field
    /// is missing.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, String> {
        let document = LegacyDocument::from_slice(bytes)?;
        let text = |value: Option<&Value>, label: &str| {
            value
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| format!("missing string field {label}"))
        };
        let resource = document.resource().ok_or_else(|| "missing field resource".to_string())?;
        Ok(Self {
            data: document.data().cloned().unwrap_or(Value::Null),
            event_id: text(document.event_id(), "eventId")?,
            event_type: text(document.event_type(), "eventType")?,
            timestamp: text(document.timestamp(), "timestamp")?,
            resource: LegacyResource::from_value(resource)?,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Names the JSON type of a value for error messages.
pub(crate) const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
