// crates/conformance-events/src/encoding.rs
// ============================================================================
// Module: Event Encodings
// Description: Wire encodings understood by the conformance corpus.
// Purpose: Discriminate fixture tables and equivalence rules by encoding.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Events reach a function either in the legacy background-event shape or as
//! a CloudEvent envelope. [`Encoding`] is only a lookup key; it carries no
//! ordering semantics.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Encoding
// ============================================================================

/// Event wire encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// Legacy background event (`context` / `data` document).
    Legacy,
    /// CloudEvent envelope with header attributes and a payload.
    CloudEvent,
}

impl Encoding {
    /// Both encodings, legacy first.
    pub const ALL: [Self; 2] = [Self::Legacy, Self::CloudEvent];

    /// Returns the human label used in logs and reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Legacy => "legacy event",
            Self::CloudEvent => "cloud event",
        }
    }

    /// Returns the other encoding.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Legacy => Self::CloudEvent,
            Self::CloudEvent => Self::Legacy,
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
