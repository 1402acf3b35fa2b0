// crates/conformance-events/src/outcome.rs
// ============================================================================
// Module: Scenario Outcomes
// Description: Per-scenario verdicts and the aggregated validation report.
// Purpose: Collect every failure of a run and render it in one pass.
// Dependencies: thiserror, crate::encoding
// ============================================================================

//! ## Overview
//! A [`ScenarioOutcome`] is either judged (zero or more failures, empty means
//! pass) or skipped with a reason. The two are mutually exclusive.
//! [`ValidationReport`] keeps outcomes in execution order and renders the
//! run summary and the aggregated failure message.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;

use thiserror::Error;

use crate::encoding::Encoding;

// ============================================================================
// SECTION: Failures
// ============================================================================

/// Which side of a comparison failed to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeSide {
    /// Output produced by the function under test.
    Actual,
    /// Recorded fixture output.
    Expected,
}

impl DecodeSide {
    /// Returns a stable label for the side.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Actual => "actual",
            Self::Expected => "expected",
        }
    }
}

/// A single reason a scenario failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScenarioFailure {
    /// The event could not be delivered or was not acknowledged.
    #[error("failed to send event: {0}")]
    Transport(String),
    /// The function output could not be fetched.
    #[error("reading function output: {0}")]
    Output(String),
    /// Output bytes could not be parsed as the target encoding.
    #[error("unmarshalling {} {encoding}: {message}", .side.as_str())]
    Decode {
        /// Side that failed to decode.
        side: DecodeSide,
        /// Encoding the bytes were decoded as.
        encoding: Encoding,
        /// Parser message.
        message: String,
    },
    /// A named field disagreed.
    #[error("unexpected {field}: got {got}, want {want}")]
    FieldMismatch {
        /// Field label.
        field: String,
        /// Rendered actual value.
        got: String,
        /// Rendered expected value.
        want: String,
    },
    /// A structured payload disagreed at one or more paths.
    #[error("unexpected {field} (differs at {}): got {got}, want {want}", .paths.join(", "))]
    PayloadMismatch {
        /// Field label.
        field: String,
        /// Paths where the documents diverge.
        paths: Vec<String>,
        /// Rendered actual payload.
        got: String,
        /// Rendered expected payload.
        want: String,
    },
}

impl ScenarioFailure {
    /// Builds a field mismatch entry.
    #[must_use]
    pub fn mismatch(
        field: impl Into<String>,
        got: impl Into<String>,
        want: impl Into<String>,
    ) -> Self {
        Self::FieldMismatch {
            field: field.into(),
            got: got.into(),
            want: want.into(),
        }
    }

    /// Returns the field label for mismatch entries.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::FieldMismatch {
                field, ..
            }
            | Self::PayloadMismatch {
                field, ..
            } => Some(field),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Verdict for one scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Scenario ran and was judged; empty failures means pass.
    Judged(Vec<ScenarioFailure>),
    /// Scenario was not attempted.
    Skipped(String),
}

/// Result of executing one scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioOutcome {
    /// Scenario label, normally the fixture name.
    name: String,
    /// Judged failures or skip reason.
    verdict: Verdict,
}

impl ScenarioOutcome {
    /// Creates a judged outcome.
    #[must_use]
    pub fn judged(name: impl Into<String>, failures: Vec<ScenarioFailure>) -> Self {
        Self {
            name: name.into(),
            verdict: Verdict::Judged(failures),
        }
    }

    /// Creates a passing outcome.
    #[must_use]
    pub fn passed(name: impl Into<String>) -> Self {
        Self::judged(name, Vec::new())
    }

    /// Creates an outcome with a single failure.
    #[must_use]
    pub fn failed(name: impl Into<String>, failure: ScenarioFailure) -> Self {
        Self::judged(name, vec![failure])
    }

    /// Creates a skipped outcome.
    #[must_use]
    pub fn skipped(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            verdict: Verdict::Skipped(reason.into()),
        }
    }

    /// Returns the outcome with a different label.
    #[must_use]
    pub fn relabeled(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            verdict: self.verdict,
        }
    }

    /// Returns the scenario label.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the verdict.
    #[must_use]
    pub const fn verdict(&self) -> &Verdict {
        &self.verdict
    }

    /// Returns recorded failures; empty for passes and skips.
    #[must_use]
    pub fn failures(&self) -> &[ScenarioFailure] {
        match &self.verdict {
            Verdict::Judged(failures) => failures,
            Verdict::Skipped(_) => &[],
        }
    }

    /// Returns the skip reason when skipped.
    #[must_use]
    pub fn skip_reason(&self) -> Option<&str> {
        match &self.verdict {
            Verdict::Skipped(reason) => Some(reason),
            Verdict::Judged(_) => None,
        }
    }

    /// Returns true when judged with at least one failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        !self.failures().is_empty()
    }

    /// Returns true when judged with no failures.
    #[must_use]
    pub fn is_pass(&self) -> bool {
        matches!(&self.verdict, Verdict::Judged(failures) if failures.is_empty())
    }

    /// Returns the status label used in run summaries.
    #[must_use]
    pub fn status(&self) -> String {
        match &self.verdict {
            Verdict::Skipped(reason) => format!("SKIPPED: {reason}"),
            Verdict::Judged(failures) if failures.is_empty() => "PASSED".to_string(),
            Verdict::Judged(_) => "FAILED".to_string(),
        }
    }
}

// ============================================================================
// SECTION: Report
// ============================================================================

/// Ordered outcomes of one validation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Outcomes in execution order.
    outcomes: Vec<ScenarioOutcome>,
}

impl ValidationReport {
    /// Creates an empty report.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            outcomes: Vec::new(),
        }
    }

    /// Appends an outcome.
    pub fn push(&mut self, outcome: ScenarioOutcome) {
        self.outcomes.push(outcome);
    }

    /// Returns outcomes in execution order.
    #[must_use]
    pub fn outcomes(&self) -> &[ScenarioOutcome] {
        &self.outcomes
    }

    /// Returns true when any outcome failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(ScenarioOutcome::is_failure)
    }

    /// Renders the per-scenario status summary.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = String::from("Events tried:");
        for outcome in &self.outcomes {
            let _ = write!(out, "\n\t- {} ({})", outcome.name(), outcome.status());
        }
        out
    }

    /// Renders every failure grouped by scenario, or `None` when all passed.
    #[must_use]
    pub fn failure_message(&self) -> Option<String> {
        if !self.has_failures() {
            return None;
        }
        let mut out = String::from("Validation errors:");
        for outcome in self.outcomes.iter().filter(|outcome| outcome.is_failure()) {
            let _ = write!(out, "\n\t- {}:", outcome.name());
            for failure in outcome.failures() {
                let _ = write!(out, "\n\t\t- {failure}");
            }
        }
        Some(out)
    }
}

impl Extend<ScenarioOutcome> for ValidationReport {
    fn extend<T: IntoIterator<Item = ScenarioOutcome>>(&mut self, iter: T) {
        self.outcomes.extend(iter);
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
