//! Per-stage failure policy table.

use crate::core::Phase;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the orchestrator reacts when a stage fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the error, mark the run FAILED and stop.
    AbortOnError,
    /// Record the error, store the stage's placeholder output and continue.
    ContinueWithPlaceholder,
    /// Record the error, carry the stage's fallback value forward and continue.
    ContinueWithFallback,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AbortOnError => write!(f, "abort-on-error"),
            Self::ContinueWithPlaceholder => write!(f, "continue-with-placeholder"),
            Self::ContinueWithFallback => write!(f, "continue-with-fallback-value"),
        }
    }
}

/// The declared policy for every stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagePolicies {
    /// Source collection.
    #[serde(default = "abort")]
    pub retrieve: FailurePolicy,
    /// Draft composition.
    #[serde(default = "placeholder")]
    pub write: FailurePolicy,
    /// Refinement.
    #[serde(default = "fallback")]
    pub refine: FailurePolicy,
    /// Rendering.
    #[serde(default = "abort")]
    pub render: FailurePolicy,
}

fn abort() -> FailurePolicy {
    FailurePolicy::AbortOnError
}

fn placeholder() -> FailurePolicy {
    FailurePolicy::ContinueWithPlaceholder
}

fn fallback() -> FailurePolicy {
    FailurePolicy::ContinueWithFallback
}

impl Default for StagePolicies {
    fn default() -> Self {
        Self {
            retrieve: abort(),
            write: placeholder(),
            refine: fallback(),
            render: abort(),
        }
    }
}

impl StagePolicies {
    /// Returns the policy for a working phase.
    ///
    /// Terminal phases have nothing to run and report `AbortOnError`.
    #[must_use]
    pub fn for_phase(&self, phase: Phase) -> FailurePolicy {
        match phase {
            Phase::Retrieve => self.retrieve,
            Phase::Write => self.write,
            Phase::Refine => self.refine,
            Phase::Render => self.render,
            Phase::Done | Phase::Failed => FailurePolicy::AbortOnError,
        }
    }

    /// Overrides the policy for one phase.
    #[must_use]
    pub fn with_policy(mut self, phase: Phase, policy: FailurePolicy) -> Self {
        match phase {
            Phase::Retrieve => self.retrieve = policy,
            Phase::Write => self.write = policy,
            Phase::Refine => self.refine = policy,
            Phase::Render => self.render = policy,
            Phase::Done | Phase::Failed => {}
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let policies = StagePolicies::default();
        assert_eq!(policies.for_phase(Phase::Retrieve), FailurePolicy::AbortOnError);
        assert_eq!(policies.for_phase(Phase::Write), FailurePolicy::ContinueWithPlaceholder);
        assert_eq!(policies.for_phase(Phase::Refine), FailurePolicy::ContinueWithFallback);
        assert_eq!(policies.for_phase(Phase::Render), FailurePolicy::AbortOnError);
    }

    #[test]
    fn test_override() {
        let policies =
            StagePolicies::default().with_policy(Phase::Refine, FailurePolicy::AbortOnError);
        assert_eq!(policies.for_phase(Phase::Refine), FailurePolicy::AbortOnError);
        assert_eq!(policies.for_phase(Phase::Write), FailurePolicy::ContinueWithPlaceholder);
    }

    #[test]
    fn test_deserialize_partial_table() {
        let policies: StagePolicies =
            serde_json::from_str(r#"{"refine": "abort_on_error"}"#).unwrap();
        assert_eq!(policies.refine, FailurePolicy::AbortOnError);
        assert_eq!(policies.write, FailurePolicy::ContinueWithPlaceholder);
    }

    #[test]
    fn test_display() {
        assert_eq!(FailurePolicy::ContinueWithFallback.to_string(), "continue-with-fallback-value");
    }
}
