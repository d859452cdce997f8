//! Accumulated run state and the per-stage deltas merged into it.
//!
//! Stages never mutate the state directly. Each one reads the fields written
//! by earlier stages and returns a [`StageDelta`]; the orchestrator merges the
//! delta with [`PipelineState::apply`].

use crate::core::{
    ArtifactDescriptor, Citation, GenerationRequest, PaperSection, Phase, RunStatus, RunSummary,
    SourceDocument, NO_ABSTRACT, UNTITLED,
};
use crate::errors::PaperflowError;
use crate::stages::DraftMode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Output of the retrieve stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalDelta {
    /// Accepted sources, in backend order.
    pub documents: Vec<SourceDocument>,
    /// Citations, index-aligned with `documents`.
    pub references: Vec<Citation>,
}

/// Output of the write stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftDelta {
    /// Strategy that produced the draft.
    pub mode: DraftMode,
    /// Paper title.
    pub title: String,
    /// Ordered sections.
    pub sections: Vec<PaperSection>,
    /// Section bodies joined with blank lines.
    pub composed_text: String,
    /// Extracted abstract, never empty.
    #[serde(rename = "abstract")]
    pub abstract_text: String,
}

/// Output of the refine stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinementDelta {
    /// Polished narrative, or the draft text when refinement failed.
    pub final_text: String,
    /// Replacement abstract, only when the draft had none.
    #[serde(rename = "abstract", default, skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    /// Replacement sections, only for monolithic drafts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<PaperSection>>,
}

/// Output of the render stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderDelta {
    /// Descriptor of the persisted artifact.
    pub artifact: ArtifactDescriptor,
}

/// A partial result produced by one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageDelta {
    /// From the retrieve stage.
    Retrieval(RetrievalDelta),
    /// From the write stage.
    Draft(DraftDelta),
    /// From the refine stage.
    Refinement(RefinementDelta),
    /// From the render stage.
    Render(RenderDelta),
}

impl StageDelta {
    /// Returns the phase that produces this kind of delta.
    #[must_use]
    pub fn phase(&self) -> Phase {
        match self {
            Self::Retrieval(_) => Phase::Retrieve,
            Self::Draft(_) => Phase::Write,
            Self::Refinement(_) => Phase::Refine,
            Self::Render(_) => Phase::Render,
        }
    }
}

/// The canonical state of one run.
///
/// Created once per request and discarded after the result is returned or
/// streamed. `errors` is append-only and `status` never leaves `Failed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    /// Unique run identifier.
    pub run_id: Uuid,
    /// The request being served.
    pub request: GenerationRequest,
    /// Request fingerprint.
    pub fingerprint: String,
    /// Collected sources.
    pub documents: Vec<SourceDocument>,
    /// Citations, index-aligned with `documents`.
    pub references: Vec<Citation>,
    /// Draft strategy, once the write stage ran.
    pub draft_mode: Option<DraftMode>,
    /// Paper title.
    pub draft_title: String,
    /// Ordered sections.
    pub sections: Vec<PaperSection>,
    /// Section bodies joined with blank lines.
    pub composed_text: String,
    /// Paper abstract.
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// Refined narrative.
    pub final_text: String,
    /// Rendered artifact, if any.
    pub artifact: Option<ArtifactDescriptor>,
    /// Artifact identifier, if rendered.
    pub job_id: Option<String>,
    /// Overall status.
    pub status: RunStatus,
    /// Current phase.
    pub phase: Phase,
    /// Wall time from pipeline start.
    pub elapsed_seconds: f64,
    /// Recorded failures, oldest first.
    pub errors: Vec<String>,
}

impl PipelineState {
    /// Creates the initial state for a request.
    #[must_use]
    pub fn new(request: GenerationRequest) -> Self {
        let fingerprint = request.fingerprint();
        Self {
            run_id: Uuid::new_v4(),
            request,
            fingerprint,
            documents: Vec::new(),
            references: Vec::new(),
            draft_mode: None,
            draft_title: String::new(),
            sections: Vec::new(),
            composed_text: String::new(),
            abstract_text: String::new(),
            final_text: String::new(),
            artifact: None,
            job_id: None,
            status: RunStatus::Running,
            phase: Phase::Retrieve,
            elapsed_seconds: 0.0,
            errors: Vec::new(),
        }
    }

    /// Merges a stage delta into the state.
    pub fn apply(&mut self, delta: StageDelta) {
        match delta {
            StageDelta::Retrieval(d) => {
                self.documents = d.documents;
                self.references = d.references;
            }
            StageDelta::Draft(d) => {
                self.draft_mode = Some(d.mode);
                self.draft_title = d.title;
                self.sections = d.sections;
                self.composed_text = d.composed_text;
                self.abstract_text = d.abstract_text;
            }
            StageDelta::Refinement(d) => {
                self.final_text = d.final_text;
                if let Some(abstract_text) = d.abstract_text {
                    self.abstract_text = abstract_text;
                }
                if let Some(sections) = d.sections {
                    self.sections = sections;
                }
            }
            StageDelta::Render(d) => {
                self.job_id = Some(d.artifact.artifact_id.clone());
                self.artifact = Some(d.artifact);
            }
        }
    }

    /// Appends a failure to the error log.
    pub fn record_error(&mut self, error: &PaperflowError) {
        self.errors.push(error.to_string());
    }

    /// Moves the run into the absorbing failure state.
    pub fn fail(&mut self) {
        self.status = self.status.advance(RunStatus::Failed);
        self.phase = Phase::Failed;
    }

    /// Marks the run completed unless it already failed.
    pub fn complete(&mut self) {
        self.status = self.status.advance(RunStatus::Completed);
        if self.status == RunStatus::Completed {
            self.phase = Phase::Done;
        }
    }

    /// Returns true once any stage produced output worth reporting.
    #[must_use]
    pub fn has_partial_output(&self) -> bool {
        !self.references.is_empty()
    }

    /// Builds the final run summary.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        let title = if self.draft_title.trim().is_empty() {
            UNTITLED.to_string()
        } else {
            self.draft_title.clone()
        };
        let abstract_text = if self.abstract_text.trim().is_empty() {
            NO_ABSTRACT.to_string()
        } else {
            self.abstract_text.clone()
        };

        RunSummary {
            job_id: self.job_id.clone(),
            title,
            abstract_text,
            status: self.status,
            artifact_path: self.artifact.as_ref().map(|a| a.path.clone()),
            elapsed_seconds: self.elapsed_seconds,
            num_sections: self.sections.len(),
            num_references: self.references.len(),
            errors: self.errors.clone(),
            fingerprint: self.fingerprint.clone(),
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map.into_iter().collect(),
            _ => HashMap::new(),
        }
    }
}
