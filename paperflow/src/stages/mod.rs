//! Pipeline stages.
//!
//! Each stage wraps one collaborator, reads the accumulated
//! [`PipelineState`] and returns a [`StageDelta`]. Stages are independent of
//! each other and of the orchestrator's failure policy; they only report what
//! happened.

mod collector;
mod composer;
mod refiner;
mod renderer;

pub use collector::{filter_relevant, Collection, SourceCollector, SENTINEL_KEY};
pub use composer::{
    clean_body, extract_abstract, Composition, DraftComposer, DraftMode, CANONICAL_HEADINGS,
    MONOLITHIC_HEADING, NO_ABSTRACT_GENERATED, SECTION_ERROR_MARKER,
};
pub use refiner::Refiner;
pub use renderer::{RenderAdapter, RENDERED_STATUS};

use crate::core::Phase;
use crate::errors::PaperflowError;
use crate::pipeline::{PipelineState, StageDelta};
use async_trait::async_trait;
use std::fmt::Debug;

/// What a stage hands back on success.
#[derive(Debug)]
pub struct StageOutput {
    /// Partial result to merge into the state.
    pub delta: StageDelta,
    /// Recoverable failures hit along the way.
    pub warnings: Vec<PaperflowError>,
    /// Human-readable progress line.
    pub summary: String,
    /// Incremental output for progress events.
    pub data: serde_json::Value,
}

impl StageOutput {
    /// Creates an output with no warnings and no event data.
    #[must_use]
    pub fn new(delta: StageDelta, summary: impl Into<String>) -> Self {
        Self {
            delta,
            warnings: Vec::new(),
            summary: summary.into(),
            data: serde_json::Value::Null,
        }
    }

    /// Attaches event data.
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    /// Attaches recoverable failures.
    #[must_use]
    pub fn with_warnings(mut self, warnings: Vec<PaperflowError>) -> Self {
        self.warnings = warnings;
        self
    }
}

/// Trait for pipeline stages.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// The phase this stage implements.
    fn phase(&self) -> Phase;

    /// Runs the stage against the state accumulated so far.
    async fn execute(&self, state: &PipelineState) -> Result<StageOutput, PaperflowError>;

    /// Output that marks the failure in place, used under
    /// [`FailurePolicy::ContinueWithPlaceholder`](crate::pipeline::FailurePolicy).
    fn placeholder(&self, _state: &PipelineState, _error: &PaperflowError) -> Option<StageDelta> {
        None
    }

    /// Best substitute built from earlier output, used under
    /// [`FailurePolicy::ContinueWithFallback`](crate::pipeline::FailurePolicy).
    fn fallback(&self, _state: &PipelineState, _error: &PaperflowError) -> Option<StageDelta> {
        None
    }
}
