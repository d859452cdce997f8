//! Source collection: search, relevance filtering and citation assignment.

use super::{Stage, StageOutput};
use crate::backends::{SearchBackend, SearchHit};
use crate::config::RetrievalConfig;
use crate::core::{Citation, Phase, SourceDocument};
use crate::errors::PaperflowError;
use crate::pipeline::{with_retry, PipelineState, RetrievalDelta, RetryConfig, StageDelta};
use crate::similarity::{keyword_coverage, reduce_query, token_set};
use async_trait::async_trait;
use std::sync::Arc;

/// Citation key carried by the sentinel result.
pub const SENTINEL_KEY: &str = "[Ref-None]";

/// Result of one collection pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Collection {
    /// At least one hit survived filtering.
    Found(RetrievalDelta),
    /// Nothing usable: the search failed or every hit was filtered out.
    Sentinel {
        /// Always [`SENTINEL_KEY`].
        key: String,
        /// Diagnostic for the caller.
        message: String,
    },
}

impl Collection {
    fn sentinel(message: impl Into<String>) -> Self {
        Self::Sentinel {
            key: SENTINEL_KEY.to_string(),
            message: message.into(),
        }
    }

    /// Returns true for the sentinel result.
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Self::Sentinel { .. })
    }

    /// Converts the sentinel into a retrieval abort.
    ///
    /// # Errors
    ///
    /// Returns [`PaperflowError::RetrievalAbort`] for the sentinel.
    pub fn into_result(self) -> Result<RetrievalDelta, PaperflowError> {
        match self {
            Self::Found(delta) => Ok(delta),
            Self::Sentinel { message, .. } => Err(PaperflowError::retrieval_abort(message)),
        }
    }
}

/// Keeps hits whose title and summary cover at least `threshold` of the
/// topic's keywords, preserving backend order.
#[must_use]
pub fn filter_relevant(topic: &str, hits: Vec<SearchHit>, threshold: f64) -> Vec<SearchHit> {
    let keywords = token_set(topic);
    hits.into_iter()
        .filter(|hit| {
            let words = token_set(&format!("{} {}", hit.title, hit.summary));
            keyword_coverage(&keywords, &words) >= threshold
        })
        .collect()
}

/// Wraps the search backend and maps hits into documents and citations.
#[derive(Debug, Clone)]
pub struct SourceCollector {
    search: Arc<dyn SearchBackend>,
    config: RetrievalConfig,
    retry: RetryConfig,
}

impl SourceCollector {
    /// Creates a collector.
    #[must_use]
    pub fn new(search: Arc<dyn SearchBackend>, config: RetrievalConfig, retry: RetryConfig) -> Self {
        Self {
            search,
            config,
            retry,
        }
    }

    /// Searches for `topic` and returns the accepted sources.
    ///
    /// Never fails: backend errors and empty results come back as the
    /// sentinel.
    pub async fn collect(&self, topic: &str, limit: usize) -> Collection {
        let query = if self.config.reduce_query {
            let reduced = reduce_query(topic, self.config.query_terms);
            if reduced.is_empty() {
                topic.trim().to_string()
            } else {
                reduced
            }
        } else {
            topic.trim().to_string()
        };

        let search = self.search.as_ref();
        let query_ref = query.as_str();
        let hits = match with_retry(&self.retry, "search", move || search.search(query_ref, limit)).await
        {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(query = %query, error = %e, "Search backend failed");
                return Collection::sentinel(format!("Search failed: {e}"));
            }
        };

        let total = hits.len();
        let accepted = filter_relevant(topic, hits, self.config.relevance_threshold);
        tracing::debug!(query = %query, total, accepted = accepted.len(), "Relevance filter applied");

        if accepted.is_empty() {
            return Collection::sentinel(format!(
                "No relevant papers found for '{}'.",
                topic.trim()
            ));
        }

        let documents: Vec<SourceDocument> = accepted
            .iter()
            .map(|hit| SourceDocument::new(hit.origin(), hit.title.trim(), hit.summary.trim()))
            .collect();
        let references = documents
            .iter()
            .enumerate()
            .map(|(i, doc)| Citation::for_source(i, doc))
            .collect();

        Collection::Found(RetrievalDelta {
            documents,
            references,
        })
    }

    fn limit_for(&self, min_references: u32) -> usize {
        if min_references == 0 {
            self.config.default_limit
        } else {
            min_references as usize
        }
    }
}

#[async_trait]
impl Stage for SourceCollector {
    fn phase(&self) -> Phase {
        Phase::Retrieve
    }

    async fn execute(&self, state: &PipelineState) -> Result<StageOutput, PaperflowError> {
        let limit = self.limit_for(state.request.min_references);
        let delta = self.collect(&state.request.topic, limit).await.into_result()?;

        let count = delta.references.len();
        let entries: Vec<&str> = delta
            .references
            .iter()
            .map(|c| c.display_entry.as_str())
            .collect();
        let data = serde_json::json!({
            "num_references": count,
            "references": entries,
        });

        Ok(StageOutput::new(
            StageDelta::Retrieval(delta),
            format!("Retrieved {count} references."),
        )
        .with_data(data))
    }
}
