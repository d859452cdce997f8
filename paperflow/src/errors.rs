//! Error types for the paperflow pipeline.
//!
//! Failures are split into two layers: [`BackendError`] describes what went
//! wrong inside a collaborator (search, completion, rendering), while
//! [`PaperflowError`] classifies the failure from the pipeline's point of view
//! (retrieval abort, section failure, refinement failure, render failure).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for paperflow operations.
#[derive(Debug, Error)]
pub enum PaperflowError {
    /// The generation request was rejected before any backend call.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No usable sources were collected; the run cannot continue.
    #[error("Retrieval Error: {message}")]
    RetrievalAbort {
        /// Diagnostic carried by the retrieval sentinel.
        message: String,
    },

    /// A single structured-mode heading could not be generated.
    #[error("Failed to generate section '{heading}': {reason}")]
    SectionGeneration {
        /// The canonical heading that failed.
        heading: String,
        /// The underlying failure.
        reason: String,
    },

    /// The refinement call failed; the draft text is kept.
    #[error("Refinement failed: {0}")]
    Refinement(String),

    /// The rendering backend failed; no artifact exists.
    #[error("Render failed: {0}")]
    Render(String),

    /// A collaborator call failed.
    #[error("{0}")]
    Backend(#[from] BackendError),

    /// The configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for PaperflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl PaperflowError {
    /// Creates a retrieval abort error.
    #[must_use]
    pub fn retrieval_abort(message: impl Into<String>) -> Self {
        Self::RetrievalAbort {
            message: message.into(),
        }
    }

    /// Creates a section generation error.
    #[must_use]
    pub fn section_generation(heading: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SectionGeneration {
            heading: heading.into(),
            reason: reason.into(),
        }
    }

    /// Returns the stable taxonomy label for this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidRequest(_) => ErrorCategory::InvalidRequest,
            Self::RetrievalAbort { .. } => ErrorCategory::RetrievalAbort,
            Self::SectionGeneration { .. } => ErrorCategory::SectionGenerationFailure,
            Self::Refinement(_) => ErrorCategory::RefinementFailure,
            Self::Render(_) => ErrorCategory::RenderFailure,
            Self::Backend(_) => ErrorCategory::Backend,
            Self::Config(_) => ErrorCategory::Config,
            Self::Serialization(_) | Self::Io(_) => ErrorCategory::Internal,
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!(self.category()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        if let Self::SectionGeneration { heading, .. } = self {
            map.insert("heading".to_string(), serde_json::json!(heading));
        }
        map
    }
}

/// Taxonomy labels used in logs and progress payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Request rejected up front.
    InvalidRequest,
    /// Zero usable sources or search failure.
    RetrievalAbort,
    /// One heading failed in structured mode.
    SectionGenerationFailure,
    /// The refine call failed.
    RefinementFailure,
    /// The render backend failed.
    RenderFailure,
    /// Unclassified collaborator failure.
    Backend,
    /// Invalid configuration.
    Config,
    /// Anything else.
    Internal,
}

/// Errors raised by the external collaborators.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The text-generation backend failed.
    #[error("Completion backend error: {reason}")]
    Completion {
        /// The reason for failure.
        reason: String,
    },

    /// The bibliographic search backend failed.
    #[error("Search backend error: {reason}")]
    Search {
        /// The reason for failure.
        reason: String,
    },

    /// The rendering backend failed.
    #[error("Render backend error: {reason}")]
    Render {
        /// The reason for failure.
        reason: String,
    },

    /// A transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A malformed backend response.
    #[error("Malformed response: {0}")]
    Parse(String),

    /// A backend call exceeded its deadline.
    #[error("Backend call timed out: {0}")]
    Timeout(String),
}

impl BackendError {
    /// Creates a completion error.
    #[must_use]
    pub fn completion(reason: impl Into<String>) -> Self {
        Self::Completion {
            reason: reason.into(),
        }
    }

    /// Creates a search error.
    #[must_use]
    pub fn search(reason: impl Into<String>) -> Self {
        Self::Search {
            reason: reason.into(),
        }
    }

    /// Creates a render error.
    #[must_use]
    pub fn render(reason: impl Into<String>) -> Self {
        Self::Render {
            reason: reason.into(),
        }
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}
