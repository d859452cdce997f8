//! Render adapter: filters and numbers the content, then calls the backend.

use super::{Stage, StageOutput};
use crate::backends::RenderBackend;
use crate::config::RenderingConfig;
use crate::core::{ArtifactDescriptor, Citation, PaperSection, Phase, RenderDocument, NO_ABSTRACT};
use crate::errors::PaperflowError;
use crate::pipeline::{with_retry, PipelineState, RenderDelta, RetryConfig, StageDelta};
use crate::utils::{display_timestamp, next_artifact_id, to_latin1_lossy, truncate_with_ellipsis};
use async_trait::async_trait;
use std::sync::Arc;

/// Status label written into every descriptor.
pub const RENDERED_STATUS: &str = "Completed";

/// Returns true for headings rendered from dedicated fields instead.
fn is_dedicated_heading(heading: &str) -> bool {
    let lower = heading.replace('*', "").trim().to_lowercase();
    (lower.contains("abstract") && lower.chars().count() < 15)
        || lower.contains("reference")
        || lower.contains("bibliography")
}

/// Wraps the render backend.
#[derive(Debug, Clone)]
pub struct RenderAdapter {
    backend: Arc<dyn RenderBackend>,
    config: RenderingConfig,
    retry: RetryConfig,
}

impl RenderAdapter {
    /// Creates a render adapter.
    #[must_use]
    pub fn new(
        backend: Arc<dyn RenderBackend>,
        config: RenderingConfig,
        retry: RetryConfig,
    ) -> Self {
        Self {
            backend,
            config,
            retry,
        }
    }

    fn encode(&self, text: &str) -> String {
        if self.config.latin1_substitution {
            to_latin1_lossy(text)
        } else {
            text.to_string()
        }
    }

    /// Lays out the paper without calling the backend.
    #[must_use]
    pub fn layout(
        &self,
        artifact_id: String,
        title: &str,
        abstract_text: &str,
        sections: &[PaperSection],
        references: &[Citation],
    ) -> RenderDocument {
        RenderDocument {
            artifact_id,
            title: self.encode(title),
            abstract_text: self.encode(abstract_text),
            sections: sections
                .iter()
                .filter(|s| !is_dedicated_heading(&s.heading))
                .map(|s| PaperSection::new(self.encode(&s.heading), self.encode(&s.body)))
                .collect(),
            references: references
                .iter()
                .enumerate()
                .map(|(i, c)| format!("[{}] {}", i + 1, self.encode(&c.display_entry)))
                .collect(),
        }
    }

    /// Renders the paper and describes the persisted artifact.
    ///
    /// # Errors
    ///
    /// Returns [`PaperflowError::Render`] once the backend has failed every
    /// attempt allowed by the retry settings.
    pub async fn render(
        &self,
        title: &str,
        abstract_text: &str,
        sections: &[PaperSection],
        references: &[Citation],
    ) -> Result<ArtifactDescriptor, PaperflowError> {
        let document = self.layout(next_artifact_id(), title, abstract_text, sections, references);
        let backend = self.backend.as_ref();
        let doc = &document;
        let rendered = with_retry(&self.retry, "render", move || backend.render(doc))
            .await
            .map_err(|e| PaperflowError::Render(e.to_string()))?;

        Ok(ArtifactDescriptor {
            abstract_preview: truncate_with_ellipsis(
                &document.abstract_text,
                self.config.abstract_preview_chars,
            ),
            artifact_id: document.artifact_id,
            title: document.title,
            status: RENDERED_STATUS.to_string(),
            timestamp: display_timestamp(),
            path: rendered.path,
        })
    }
}

#[async_trait]
impl Stage for RenderAdapter {
    fn phase(&self) -> Phase {
        Phase::Render
    }

    async fn execute(&self, state: &PipelineState) -> Result<StageOutput, PaperflowError> {
        let title = if state.draft_title.trim().is_empty() {
            state.request.topic.as_str()
        } else {
            state.draft_title.as_str()
        };
        let abstract_text = if state.abstract_text.trim().is_empty() {
            NO_ABSTRACT
        } else {
            state.abstract_text.as_str()
        };

        let artifact = self
            .render(title, abstract_text, &state.sections, &state.references)
            .await?;
        let summary = format!("Artifact rendered at {}", artifact.path);
        let data = serde_json::to_value(&artifact)?;

        Ok(StageOutput::new(StageDelta::Render(RenderDelta { artifact }), summary).with_data(data))
    }
}
