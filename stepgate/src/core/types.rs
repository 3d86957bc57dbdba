//! Shared deterministic types for gate decisions.
//!
//! These types define stable contracts between the verifier, the push gate
//! and the CLI. Lock reasons are part of that contract: they are written to
//! the lock marker and shown verbatim to the actor.

use std::fmt;

/// Lock reason when the hash ledger no longer matches the documents.
pub const REASON_TAMPERING: &str = "tampering detected";
/// Lock reason when the active step still has unchecked items.
pub const REASON_INCOMPLETE_CHECKLIST: &str = "incomplete checklist items";
/// Lock reason when the active step contains an open-question marker.
pub const REASON_PENDING_QUESTIONS: &str = "pending questions";
/// Lock reason when an expected-output check fails for the active step.
pub const REASON_EXPECTED_OUTPUT: &str = "expected output validation failed";
/// Lock reason when publishing with open tree entries.
pub const REASON_CHECKLIST_INCOMPLETE: &str = "checklist incomplete";
/// Lock reason when publishing with questions left in the scratchpad.
pub const REASON_SCRATCHPAD_QUESTIONS: &str = "pending questions in scratchpad";
/// Lock reason when publishing with inconsistencies left in the scratchpad.
pub const REASON_INCONSISTENCIES: &str = "unresolved inconsistencies";
/// Lock reason when the output validator fails.
pub const REASON_OUTPUT_VALIDATION: &str = "output validation failed";

pub fn missing_child_reason(child: &str) -> String {
    format!("missing child step: {child}")
}

pub fn incomplete_child_reason(child: &str) -> String {
    format!("incomplete child step: {child}")
}

pub fn command_failed_reason(command: &str) -> String {
    format!("command failed: {command}")
}

pub fn publish_error_reason(error: &str) -> String {
    format!("error publishing changes: {error}")
}

/// Named boolean precondition of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Every checklist item of the step is checked.
    Checklist,
    /// The step holds no open-question marker.
    OpenQuestions,
    /// Every referenced child step exists and is complete.
    ChildSteps,
    /// The step's expected-output specification holds.
    ExpectedOutput,
    /// No lock marker is present.
    Unlocked,
    /// Every tree entry is checked.
    TreeComplete,
    /// The open-question log is empty.
    ScratchpadQuestions,
    /// The inconsistency log is empty.
    ScratchpadInconsistencies,
    /// The output validator exits zero.
    OutputValidation,
    /// The version-control publish action succeeded.
    Publish,
}

impl Gate {
    pub fn as_str(self) -> &'static str {
        match self {
            Gate::Checklist => "checklist",
            Gate::OpenQuestions => "open-questions",
            Gate::ChildSteps => "child-steps",
            Gate::ExpectedOutput => "expected-output",
            Gate::Unlocked => "unlocked",
            Gate::TreeComplete => "tree-complete",
            Gate::ScratchpadQuestions => "scratchpad-questions",
            Gate::ScratchpadInconsistencies => "scratchpad-inconsistencies",
            Gate::OutputValidation => "output-validation",
            Gate::Publish => "publish",
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed gate: which one, the lock reason it left behind, and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateFailure {
    pub gate: Gate,
    /// Reason written to the lock marker.
    pub reason: String,
    /// Extra lines for the actor (open items, captured subprocess output).
    pub detail: Option<String>,
}

impl GateFailure {
    pub fn new(gate: Gate, reason: impl Into<String>) -> Self {
        Self {
            gate,
            reason: reason.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        if !detail.trim().is_empty() {
            self.detail = Some(detail);
        }
        self
    }
}
