//! Run status and pipeline phase enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Overall status of a pipeline run.
///
/// Status only moves forward: once a run is `Failed` it stays failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// The run is in progress.
    #[default]
    Running,
    /// An artifact was rendered.
    Completed,
    /// The run was aborted or produced no artifact.
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "RUNNING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

impl RunStatus {
    /// Returns the status after attempting a transition to `next`.
    ///
    /// `Failed` absorbs every later transition.
    #[must_use]
    pub fn advance(self, next: Self) -> Self {
        match self {
            Self::Failed => Self::Failed,
            _ => next,
        }
    }
}

/// A position in the pipeline state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Collecting sources.
    Retrieve,
    /// Composing the draft.
    Write,
    /// Polishing the draft.
    Refine,
    /// Producing the artifact.
    Render,
    /// Finished successfully.
    Done,
    /// Absorbing failure state.
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Retrieve => write!(f, "retrieve"),
            Self::Write => write!(f, "write"),
            Self::Refine => write!(f, "refine"),
            Self::Render => write!(f, "render"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl Phase {
    /// The four working phases in execution order.
    pub const STAGES: [Self; 4] = [Self::Retrieve, Self::Write, Self::Refine, Self::Render];

    /// Returns the phase that follows this one on success.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::Retrieve => Self::Write,
            Self::Write => Self::Refine,
            Self::Refine => Self::Render,
            Self::Render | Self::Done => Self::Done,
            Self::Failed => Self::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(RunStatus::Running.to_string(), "RUNNING");
        assert_eq!(RunStatus::Completed.to_string(), "COMPLETED");
        assert_eq!(RunStatus::Failed.to_string(), "FAILED");
    }

    #[test]
    fn test_status_never_regresses_from_failed() {
        assert_eq!(RunStatus::Failed.advance(RunStatus::Completed), RunStatus::Failed);
        assert_eq!(RunStatus::Failed.advance(RunStatus::Running), RunStatus::Failed);
        assert_eq!(RunStatus::Running.advance(RunStatus::Completed), RunStatus::Completed);
        assert_eq!(RunStatus::Running.advance(RunStatus::Failed), RunStatus::Failed);
    }

    #[test]
    fn test_status_serialize() {
        let json = serde_json::to_string(&RunStatus::Completed).unwrap();
        assert_eq!(json, r#""COMPLETED""#);

        let back: RunStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, RunStatus::Completed);
    }

    #[test]
    fn test_phase_order() {
        assert_eq!(Phase::Retrieve.next(), Phase::Write);
        assert_eq!(Phase::Write.next(), Phase::Refine);
        assert_eq!(Phase::Refine.next(), Phase::Render);
        assert_eq!(Phase::Render.next(), Phase::Done);
        assert_eq!(Phase::Failed.next(), Phase::Failed);
    }
}
