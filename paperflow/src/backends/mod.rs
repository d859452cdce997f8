//! Collaborator interfaces and their concrete implementations.
//!
//! The pipeline only talks to three opaque services:
//! - [`CompletionBackend`]: prompt in, text out
//! - [`SearchBackend`]: query in, ranked bibliographic hits out
//! - [`RenderBackend`]: laid-out paper in, persisted artifact out
//!
//! Raw backend payloads are mapped into the fixed record types here, at the
//! boundary, and never travel through the pipeline as loose maps.

#[cfg(feature = "http")]
mod arxiv;
#[cfg(feature = "http")]
mod chat;
mod file;

#[cfg(feature = "http")]
pub use arxiv::ArxivSearchBackend;
#[cfg(feature = "http")]
pub use chat::ChatCompletionBackend;
pub use file::{find_artifact, FileRenderBackend};

use crate::core::{RenderDocument, RenderedArtifact};
use crate::errors::BackendError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// One text-generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Full prompt text.
    pub prompt: String,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

impl CompletionRequest {
    /// Creates a completion request.
    #[must_use]
    pub fn new(prompt: impl Into<String>, max_tokens: u32, temperature: f32) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens,
            temperature,
        }
    }
}

/// One bibliographic search result, in backend relevance order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Paper title.
    pub title: String,
    /// Paper summary.
    pub summary: String,
    /// Backend identifier.
    pub id: String,
    /// Preferred link, usually the PDF.
    pub link: String,
}

impl SearchHit {
    /// Creates a search hit.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        summary: impl Into<String>,
        id: impl Into<String>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            summary: summary.into(),
            id: id.into(),
            link: link.into(),
        }
    }

    /// Returns the link, or the id when no link is known.
    #[must_use]
    pub fn origin(&self) -> &str {
        if self.link.trim().is_empty() {
            &self.id
        } else {
            &self.link
        }
    }
}

/// Text-generation service.
///
/// Assumed stateless per call and safe for concurrent use.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionBackend: Send + Sync + Debug {
    /// Generates text for one prompt.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError>;
}

/// Bibliographic search service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchBackend: Send + Sync + Debug {
    /// Returns up to `limit` hits for `query`, most relevant first.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, BackendError>;
}

/// Document rendering service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RenderBackend: Send + Sync + Debug {
    /// Persists one paper and reports where it went.
    async fn render(&self, document: &RenderDocument) -> Result<RenderedArtifact, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_origin_prefers_link() {
        let hit = SearchHit::new("T", "S", "http://arxiv.org/abs/1", "http://arxiv.org/pdf/1");
        assert_eq!(hit.origin(), "http://arxiv.org/pdf/1");

        let hit = SearchHit::new("T", "S", "http://arxiv.org/abs/1", "");
        assert_eq!(hit.origin(), "http://arxiv.org/abs/1");
    }

    #[tokio::test]
    async fn test_mock_completion_backend() {
        let mut backend = MockCompletionBackend::new();
        backend
            .expect_complete()
            .withf(|req| req.max_tokens == 512)
            .times(1)
            .returning(|_| Ok("generated".to_string()));

        let out = backend
            .complete(&CompletionRequest::new("prompt", 512, 0.7))
            .await
            .unwrap();
        assert_eq!(out, "generated");
    }
}
