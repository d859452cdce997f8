//! Best-effort rewrite of the draft into polished prose.

use super::composer::{DraftMode, NO_ABSTRACT_GENERATED, SECTION_ERROR_MARKER};
use super::{Stage, StageOutput};
use crate::backends::{CompletionBackend, CompletionRequest};
use crate::config::RefinementConfig;
use crate::core::{PaperSection, Phase};
use crate::errors::PaperflowError;
use crate::pipeline::{with_retry, PipelineState, RefinementDelta, RetryConfig, StageDelta};
use crate::utils::truncate_chars;
use async_trait::async_trait;
use std::sync::Arc;

fn refine_prompt(draft: &str) -> String {
    format!(
        "Refine and improve the following draft so that it reads as coherent academic \
         prose. Keep its structure and claims.\n\n{draft}"
    )
}

/// Wraps the completion backend to polish the concatenated draft.
#[derive(Debug, Clone)]
pub struct Refiner {
    completion: Arc<dyn CompletionBackend>,
    config: RefinementConfig,
    retry: RetryConfig,
}

impl Refiner {
    /// Creates a refiner.
    #[must_use]
    pub fn new(
        completion: Arc<dyn CompletionBackend>,
        config: RefinementConfig,
        retry: RetryConfig,
    ) -> Self {
        Self {
            completion,
            config,
            retry,
        }
    }

    /// Rewrites `draft_text`; an empty reply falls back to the draft.
    ///
    /// # Errors
    ///
    /// Returns [`PaperflowError::Refinement`] if the backend call fails.
    pub async fn refine(&self, draft_text: &str) -> Result<String, PaperflowError> {
        let request = CompletionRequest::new(
            refine_prompt(draft_text),
            self.config.max_tokens,
            self.config.temperature,
        );
        let completion = self.completion.as_ref();
        let request = &request;
        let refined = with_retry(&self.retry, "refine", move || completion.complete(request))
            .await
            .map_err(|e| PaperflowError::Refinement(e.to_string()))?;

        let refined = refined.trim();
        Ok(if refined.is_empty() {
            draft_text.to_string()
        } else {
            refined.to_string()
        })
    }

    fn abstract_replacement(&self, state: &PipelineState, final_text: &str) -> Option<String> {
        let current = state.abstract_text.trim();
        if !current.is_empty() && current != NO_ABSTRACT_GENERATED {
            return None;
        }
        let candidate = truncate_chars(final_text, self.config.abstract_fallback_chars).trim();
        (!candidate.is_empty()).then(|| candidate.to_string())
    }
}

#[async_trait]
impl Stage for Refiner {
    fn phase(&self) -> Phase {
        Phase::Refine
    }

    async fn execute(&self, state: &PipelineState) -> Result<StageOutput, PaperflowError> {
        let placeholder_only = !state.sections.is_empty()
            && state
                .sections
                .iter()
                .all(|s| s.body.starts_with(SECTION_ERROR_MARKER));
        if placeholder_only {
            tracing::debug!("Draft holds only failure markers, skipping refinement");
            let delta = RefinementDelta {
                final_text: state.composed_text.clone(),
                abstract_text: None,
                sections: None,
            };
            return Ok(StageOutput::new(StageDelta::Refinement(delta), "Nothing to refine."));
        }

        let final_text = self.refine(&state.composed_text).await?;

        // Only a monolithic draft takes the refined text as its body.
        let sections = match (state.draft_mode, state.sections.as_slice()) {
            (Some(DraftMode::Monolithic), [only]) => {
                Some(vec![PaperSection::new(only.heading.clone(), final_text.clone())])
            }
            _ => None,
        };
        let delta = RefinementDelta {
            abstract_text: self.abstract_replacement(state, &final_text),
            sections,
            final_text,
        };
        let data = serde_json::json!({
            "final_text_chars": delta.final_text.chars().count(),
            "sections_replaced": delta.sections.is_some(),
        });

        Ok(StageOutput::new(StageDelta::Refinement(delta), "Refinement complete.").with_data(data))
    }

    fn placeholder(&self, _state: &PipelineState, error: &PaperflowError) -> Option<StageDelta> {
        Some(StageDelta::Refinement(RefinementDelta {
            final_text: format!("{SECTION_ERROR_MARKER} {error}"),
            abstract_text: None,
            sections: None,
        }))
    }

    fn fallback(&self, state: &PipelineState, _error: &PaperflowError) -> Option<StageDelta> {
        Some(StageDelta::Refinement(RefinementDelta {
            final_text: state.composed_text.clone(),
            abstract_text: None,
            sections: None,
        }))
    }
}
