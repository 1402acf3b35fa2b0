// crates/conformance-events/src/corpus.rs
// ============================================================================
// Module: Event Corpus
// Description: Named event fixtures with per-encoding inputs and outputs.
// Purpose: Provide read-only lookup of fixture bytes by name and encoding.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! The corpus is a fixed catalog of recorded events. Each fixture carries an
//! input, an expected output, and an optional converted output for each
//! encoding. Converted outputs override the canonical expectation when the
//! input arrived in the other encoding.
//!
//! The built-in catalog is embedded at compile time from `fixtures/` and is
//! immutable for the lifetime of the process.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::OnceLock;

use thiserror::Error;

use crate::encoding::Encoding;

// ============================================================================
// SECTION: Fixture Types
// ============================================================================

/// Byte blobs keyed by encoding; either side may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedBlobs {
    /// Legacy-encoded bytes.
    pub legacy: Option<Vec<u8>>,
    /// CloudEvent-encoded bytes.
    pub cloud_event: Option<Vec<u8>>,
}

impl EncodedBlobs {
    /// Returns the blob for the encoding, if present.
    #[must_use]
    pub fn get(&self, encoding: Encoding) -> Option<&[u8]> {
        match encoding {
            Encoding::Legacy => self.legacy.as_deref(),
            Encoding::CloudEvent => self.cloud_event.as_deref(),
        }
    }

    /// Stores a blob for the encoding, replacing any previous value.
    fn set(&mut self, encoding: Encoding, bytes: Vec<u8>) {
        match encoding {
            Encoding::Legacy => self.legacy = Some(bytes),
            Encoding::CloudEvent => self.cloud_event = Some(bytes),
        }
    }

    /// Returns true when neither encoding has a blob.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.legacy.is_none() && self.cloud_event.is_none()
    }
}

/// A named, pre-recorded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFixture {
    /// Unique fixture name.
    name: String,
    /// Inputs sent to the function.
    input: EncodedBlobs,
    /// Canonical expected outputs.
    output: EncodedBlobs,
    /// Expected outputs when the input was delivered in the other encoding.
    converted_output: EncodedBlobs,
}

impl EventFixture {
    /// Creates an empty fixture with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input: EncodedBlobs::default(),
            output: EncodedBlobs::default(),
            converted_output: EncodedBlobs::default(),
        }
    }

    /// Sets the input blob for an encoding.
    #[must_use]
    pub fn with_input(mut self, encoding: Encoding, bytes: impl Into<Vec<u8>>) -> Self {
        self.input.set(encoding, bytes.into());
        self
    }

    /// Sets the canonical expected output for an encoding.
    #[must_use]
    pub fn with_output(mut self, encoding: Encoding, bytes: impl Into<Vec<u8>>) -> Self {
        self.output.set(encoding, bytes.into());
        self
    }

    /// Sets the cross-encoding expected output for an encoding.
    #[must_use]
    pub fn with_converted_output(mut self, encoding: Encoding, bytes: impl Into<Vec<u8>>) -> Self {
        self.converted_output.set(encoding, bytes.into());
        self
    }

    /// Returns the fixture name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the input for an encoding.
    #[must_use]
    pub fn input(&self, encoding: Encoding) -> Option<&[u8]> {
        self.input.get(encoding)
    }

    /// Returns the expected output for an encoding.
    ///
    /// When `converted` is true and a converted output exists for the
    /// encoding, it takes precedence over the canonical output.
    #[must_use]
    pub fn output(&self, encoding: Encoding, converted: bool) -> Option<&[u8]> {
        if converted && let Some(bytes) = self.converted_output.get(encoding) {
            return Some(bytes);
        }
        self.output.get(encoding)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Corpus construction errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CorpusError {
    /// Fixture name is empty.
    #[error("fixture name must not be empty")]
    EmptyName,
    /// Two fixtures share a name.
    #[error("duplicate fixture name: {0}")]
    Duplicate(String),
    /// Fixture has no input in any encoding.
    #[error("fixture {0} defines no input for any encoding")]
    MissingInput(String),
}

// ============================================================================
// SECTION: Corpus
// ============================================================================

/// Read-only catalog of event fixtures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventCorpus {
    /// Fixtures keyed by name; iteration order is lexicographic.
    fixtures: BTreeMap<String, EventFixture>,
}

impl EventCorpus {
    /// Builds a corpus from fixtures, enforcing fixture invariants.
    ///
    /// # Errors
    ///
    /// Returns [`CorpusError`] when a fixture has an empty name, duplicates
    /// another fixture, or defines no input at all.
    pub fn new(fixtures: impl IntoIterator<Item = EventFixture>) -> Result<Self, CorpusError> {
        let mut map = BTreeMap::new();
        for fixture in fixtures {
            if fixture.name.trim().is_empty() {
                return Err(CorpusError::EmptyName);
            }
            if fixture.input.is_empty() {
                return Err(CorpusError::MissingInput(fixture.name));
            }
            if map.contains_key(&fixture.name) {
                return Err(CorpusError::Duplicate(fixture.name));
            }
            map.insert(fixture.name.clone(), fixture);
        }
        Ok(Self {
            fixtures: map,
        })
    }

    /// Returns the process-wide built-in corpus.
    #[must_use]
    pub fn builtin() -> &'static Self {
        static BUILTIN: OnceLock<EventCorpus> = OnceLock::new();
        BUILTIN.get_or_init(|| Self {
            fixtures: builtin_fixtures()
                .into_iter()
                .map(|fixture| (fixture.name.clone(), fixture))
                .collect(),
        })
    }

    /// Returns fixture names that have an input for the encoding, sorted.
    #[must_use]
    pub fn names_for(&self, encoding: Encoding) -> Vec<&str> {
        self.fixtures
            .values()
            .filter(|fixture| fixture.input(encoding).is_some())
            .map(EventFixture::name)
            .collect()
    }

    /// Returns the input bytes for a fixture and encoding.
    #[must_use]
    pub fn input(&self, name: &str, encoding: Encoding) -> Option<&[u8]> {
        self.fixture(name).and_then(|fixture| fixture.input(encoding))
    }

    /// Returns the expected output for a fixture and encoding.
    ///
    /// Unknown names and encodings without an expectation yield `None`.
    #[must_use]
    pub fn expected_output(
        &self,
        name: &str,
        encoding: Encoding,
        is_conversion: bool,
    ) -> Option<&[u8]> {
        self.fixture(name).and_then(|fixture| fixture.output(encoding, is_conversion))
    }

    /// Returns a fixture by name.
    #[must_use]
    pub fn fixture(&self, name: &str) -> Option<&EventFixture> {
        self.fixtures.get(name)
    }

    /// Iterates fixtures in name order.
    pub fn fixtures(&self) -> impl Iterator<Item = &EventFixture> {
        self.fixtures.values()
    }

    /// Returns the number of fixtures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    /// Returns true when the corpus holds no fixtures.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }
}

// ============================================================================
// SECTION: Built-in Catalog
// ============================================================================

/// Embeds a fixture file from the crate's `fixtures/` directory.
macro_rules! fixture_bytes {
    ($file:literal) => {
        include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/", $file, ".json")).as_slice()
    };
}

/// Returns the built-in fixture catalog.
fn builtin_fixtures() -> Vec<EventFixture> {
    vec![
        EventFixture::new("firebase-auth")
            .with_input(Encoding::Legacy, fixture_bytes!("firebase-auth-legacy-input"))
            .with_output(Encoding::Legacy, fixture_bytes!("firebase-auth-legacy-output"))
            .with_input(Encoding::CloudEvent, fixture_bytes!("firebase-auth-cloudevent-input"))
            .with_output(Encoding::CloudEvent, fixture_bytes!("firebase-auth-cloudevent-output")),
        EventFixture::new("firestore")
            .with_input(Encoding::Legacy, fixture_bytes!("firestore-legacy-input"))
            .with_output(Encoding::Legacy, fixture_bytes!("firestore-legacy-output"))
            .with_converted_output(
                Encoding::CloudEvent,
                fixture_bytes!("firestore-cloudevent-converted-output"),
            ),
        EventFixture::new("pubsub")
            .with_input(Encoding::Legacy, fixture_bytes!("pubsub-legacy-input"))
            .with_output(Encoding::Legacy, fixture_bytes!("pubsub-legacy-output"))
            .with_converted_output(Encoding::Legacy, fixture_bytes!("pubsub-legacy-converted-output"))
            .with_input(Encoding::CloudEvent, fixture_bytes!("pubsub-cloudevent-input"))
            .with_output(Encoding::CloudEvent, fixture_bytes!("pubsub-cloudevent-output"))
            .with_converted_output(
                Encoding::CloudEvent,
                fixture_bytes!("pubsub-cloudevent-converted-output"),
            ),
        EventFixture::new("storage")
            .with_input(Encoding::Legacy, fixture_bytes!("storage-legacy-input"))
            .with_output(Encoding::Legacy, fixture_bytes!("storage-legacy-output"))
            .with_converted_output(
                Encoding::Legacy,
                fixture_bytes!("storage-legacy-converted-output"),
            )
            .with_input(Encoding::CloudEvent, fixture_bytes!("storage-cloudevent-input"))
            .with_output(Encoding::CloudEvent, fixture_bytes!("storage-cloudevent-output"))
            .with_converted_output(
                Encoding::CloudEvent,
                fixture_bytes!("storage-cloudevent-converted-output"),
            ),
    ]
}

// ============================================================================
// SECTION: Tests
// ============================================================================
