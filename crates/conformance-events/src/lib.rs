// crates/conformance-events/src/lib.rs
// ============================================================================
// Module: Conformance Events Library
// Description: Event fixture corpus and format-tolerant equivalence engine.
// Purpose: Decide whether function output is an acceptable event rendering.
// Dependencies: serde, serde_json, base64, time, thiserror
// ============================================================================

//! ## Overview
//! Conformance Events holds the recorded event fixtures a function runtime is
//! validated against, and the [`EquivalenceEngine`] that judges observed
//! output against them.
//! Invariants:
//! - The built-in [`EventCorpus`] is immutable for the life of the process.
//! - Judging never aborts; every mismatch becomes a [`ScenarioFailure`].
//! - A missing expectation is a skip, never a failure.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod cloud_event;
pub mod corpus;
pub mod encoding;
pub mod equivalence;
pub mod legacy;
pub mod outcome;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cloud_event::CloudEvent;
pub use cloud_event::Payload;
pub use corpus::CorpusError;
pub use corpus::EncodedBlobs;
pub use corpus::EventCorpus;
pub use corpus::EventFixture;
pub use encoding::Encoding;
pub use equivalence::EquivalenceEngine;
pub use equivalence::compare_documents;
pub use equivalence::json_equal;
pub use outcome::DecodeSide;
pub use outcome::ScenarioFailure;
pub use outcome::ScenarioOutcome;
pub use outcome::ValidationReport;
pub use outcome::Verdict;
