//! Progress events emitted while a run advances.

use super::status::{Phase, RunStatus};
use crate::errors::PaperflowError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Title reported when a run never produced one.
pub const UNTITLED: &str = "Untitled Research Paper";

/// Abstract reported when a run never produced one.
pub const NO_ABSTRACT: &str = "No abstract available.";

/// One element of the streaming protocol.
///
/// Serializes as `{"type": "log" | "error" | "result", "payload": ...}`.
/// Events arrive in stage-completion order and a `result` event, when one is
/// emitted, is always last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum ProgressEvent {
    /// Human-readable progress plus the stage's incremental output.
    Log {
        /// Stage that just finished, absent for run-level messages.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stage: Option<Phase>,
        /// Summary line.
        message: String,
        /// Incremental stage output.
        #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
        data: serde_json::Value,
    },
    /// A failure visible to the caller.
    Error {
        /// Stage that failed, absent for request rejection.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stage: Option<Phase>,
        /// Failure description.
        message: String,
        /// Structured failure record with the taxonomy `type` label.
        #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
        details: serde_json::Value,
    },
    /// The final run summary.
    Result(RunSummary),
}

impl ProgressEvent {
    /// Creates a run-level log event.
    #[must_use]
    pub fn log(message: impl Into<String>) -> Self {
        Self::Log {
            stage: None,
            message: message.into(),
            data: serde_json::Value::Null,
        }
    }

    /// Creates a log event for a finished stage.
    #[must_use]
    pub fn stage_log(stage: Phase, message: impl Into<String>, data: serde_json::Value) -> Self {
        Self::Log {
            stage: Some(stage),
            message: message.into(),
            data,
        }
    }

    /// Creates an error event.
    #[must_use]
    pub fn error(stage: Option<Phase>, message: impl Into<String>) -> Self {
        Self::Error {
            stage,
            message: message.into(),
            details: serde_json::Value::Null,
        }
    }

    /// Creates an error event carrying the failure's category and fields.
    #[must_use]
    pub fn failure(stage: Option<Phase>, err: &PaperflowError) -> Self {
        Self::Error {
            stage,
            message: err.to_string(),
            details: serde_json::Value::Object(err.to_dict().into_iter().collect()),
        }
    }

    /// Returns the wire name of the event type.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Log { .. } => "log",
            Self::Error { .. } => "error",
            Self::Result(_) => "result",
        }
    }

    /// Returns true for the final result event.
    #[must_use]
    pub fn is_result(&self) -> bool {
        matches!(self, Self::Result(_))
    }

    /// Returns the human-readable message, if the event carries one.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Log { message, .. } | Self::Error { message, .. } => Some(message),
            Self::Result(_) => None,
        }
    }
}

/// Final summary of a run, carried by the `result` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Identifier of the rendered artifact, if any.
    pub job_id: Option<String>,
    /// Paper title.
    pub title: String,
    /// Paper abstract.
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// Overall status.
    pub status: RunStatus,
    /// Location of the rendered artifact, if any.
    pub artifact_path: Option<String>,
    /// Wall time from pipeline start.
    pub elapsed_seconds: f64,
    /// Number of drafted sections.
    pub num_sections: usize,
    /// Number of collected references.
    pub num_references: usize,
    /// Recorded failures, oldest first.
    pub errors: Vec<String>,
    /// Request fingerprint.
    pub fingerprint: String,
}

impl RunSummary {
    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map.into_iter().collect(),
            _ => HashMap::new(),
        }
    }
}
