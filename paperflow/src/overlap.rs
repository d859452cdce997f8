//! Post-hoc overlap check of a generated paper against published work.
//!
//! The checker searches the bibliographic backend with a reduced form of the
//! candidate's title and abstract, scores every hit's summary with
//! [`similarity::score`](crate::similarity::score) and reports the closest
//! matches.

use crate::backends::{SearchBackend, SearchHit};
use crate::config::OverlapConfig;
use crate::errors::PaperflowError;
use crate::pipeline::{with_retry, RetryConfig};
use crate::similarity::{reduce_query, score};
use crate::utils::truncate_with_ellipsis;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// One published paper similar to the candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapMatch {
    /// Title of the published paper.
    pub title: String,
    /// Where to read it.
    pub link: String,
    /// Similarity on a 0-100 scale, two decimals.
    pub similarity_score: f64,
    /// Start of the published summary.
    pub snippet: String,
}

/// Ranked matches plus the overall risk indicator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OverlapReport {
    /// Matches, most similar first.
    pub similar_papers: Vec<OverlapMatch>,
    /// Highest similarity score, `0.0` without matches.
    pub risk_score: f64,
}

impl OverlapReport {
    /// Returns true if nothing similar was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.similar_papers.is_empty()
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

fn percentage(similarity: f64) -> f64 {
    (similarity * 10_000.0).round() / 100.0
}

/// Checks a candidate title and abstract for overlap with published work.
#[derive(Debug, Clone)]
pub struct OverlapChecker {
    search: Arc<dyn SearchBackend>,
    config: OverlapConfig,
    retry: RetryConfig,
}

impl OverlapChecker {
    /// Creates a checker.
    #[must_use]
    pub fn new(search: Arc<dyn SearchBackend>, config: OverlapConfig, retry: RetryConfig) -> Self {
        Self {
            search,
            config,
            retry,
        }
    }

    /// Queries tried in order until one yields hits.
    fn queries(&self, title: &str, abstract_text: &str) -> Vec<String> {
        let candidates = [
            reduce_query(&format!("{title} {abstract_text}"), self.config.query_terms),
            title.trim().to_string(),
            reduce_query(abstract_text, self.config.query_terms),
        ];

        let mut queries: Vec<String> = Vec::with_capacity(candidates.len());
        for query in candidates {
            if !query.is_empty() && !queries.contains(&query) {
                queries.push(query);
            }
        }
        queries
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, PaperflowError> {
        let search = self.search.as_ref();
        let limit = self.config.search_limit;
        let hits = with_retry(&self.retry, "overlap_search", move || search.search(query, limit)).await?;
        Ok(hits)
    }

    /// Scores published work against the candidate.
    ///
    /// # Errors
    ///
    /// Returns [`PaperflowError::InvalidRequest`] when both inputs are blank,
    /// or the backend error when a search fails.
    pub async fn check(
        &self,
        title: &str,
        abstract_text: &str,
    ) -> Result<OverlapReport, PaperflowError> {
        if title.trim().is_empty() && abstract_text.trim().is_empty() {
            return Err(PaperflowError::InvalidRequest(
                "Overlap check needs a title or an abstract".to_string(),
            ));
        }

        let mut hits = Vec::new();
        for query in self.queries(title, abstract_text) {
            hits = self.search(&query).await?;
            debug!(query = %query, hits = hits.len(), "Overlap search");
            if !hits.is_empty() {
                break;
            }
        }

        let reference = if abstract_text.trim().is_empty() {
            title
        } else {
            abstract_text
        };
        let mut matches: Vec<OverlapMatch> = hits
            .into_iter()
            .map(|hit| OverlapMatch {
                similarity_score: percentage(score(reference, &hit.summary)),
                snippet: truncate_with_ellipsis(&hit.summary, self.config.snippet_chars),
                link: hit.origin().to_string(),
                title: hit.title,
            })
            .collect();
        matches.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));
        matches.truncate(self.config.max_matches);

        let risk_score = matches.first().map_or(0.0, |m| m.similarity_score);
        info!(matches = matches.len(), risk_score, "Overlap check finished");

        Ok(OverlapReport {
            similar_papers: matches,
            risk_score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BackendError;
    use crate::testing::StaticSearchBackend;
    use pretty_assertions::assert_eq;

    const ABSTRACT: &str = "We study message passing on sparse graphs.";

    fn hits() -> Vec<SearchHit> {
        vec![
            SearchHit::new("Unrelated", "Protein folding with lattice models.", "id-1", ""),
            SearchHit::new("Close", "Message passing on dense graphs.", "id-2", "pdf-2"),
            SearchHit::new("Same", ABSTRACT, "id-3", "pdf-3"),
        ]
    }

    fn checker(backend: StaticSearchBackend) -> OverlapChecker {
        OverlapChecker::new(Arc::new(backend), OverlapConfig::default(), RetryConfig::disabled())
    }

    #[tokio::test]
    async fn test_identical_abstract_ranks_first() {
        let report = checker(StaticSearchBackend::new(hits()))
            .check("Sparse Graph Messaging", ABSTRACT)
            .await
            .unwrap();

        assert_eq!(report.similar_papers[0].title, "Same");
        assert_eq!(report.similar_papers[0].similarity_score, 100.0);
        assert_eq!(report.similar_papers[0].link, "pdf-3");
        assert_eq!(report.risk_score, 100.0);
        assert_eq!(report.similar_papers.last().map(|m| m.similarity_score), Some(0.0));
    }

    #[tokio::test]
    async fn test_falls_back_to_raw_title() {
        let backend = StaticSearchBackend::new(Vec::new())
            .with_hits_for("Sparse Graph Messaging", hits());
        let backend = Arc::new(backend);
        let checker = OverlapChecker::new(
            Arc::clone(&backend) as Arc<dyn SearchBackend>,
            OverlapConfig::default(),
            RetryConfig::disabled(),
        );

        let report = checker.check("Sparse Graph Messaging", ABSTRACT).await.unwrap();

        assert_eq!(report.similar_papers.len(), 3);
        assert_eq!(
            backend.queries(),
            vec!["sparse graph messaging study message passing", "Sparse Graph Messaging"]
        );
    }

    #[tokio::test]
    async fn test_no_hits_anywhere() {
        let report = checker(StaticSearchBackend::new(Vec::new()))
            .check("Title", ABSTRACT)
            .await
            .unwrap();

        assert!(report.is_empty());
        assert_eq!(report.risk_score, 0.0);
    }

    #[tokio::test]
    async fn test_match_cap() {
        let many = (0..8)
            .map(|i| SearchHit::new(format!("P{i}"), "graphs", format!("id-{i}"), ""))
            .collect();
        let report = checker(StaticSearchBackend::new(many))
            .check("Graphs", "graphs")
            .await
            .unwrap();

        assert_eq!(report.similar_papers.len(), 5);
    }

    #[tokio::test]
    async fn test_blank_input_rejected() {
        let err = checker(StaticSearchBackend::new(hits()))
            .check("  ", "")
            .await
            .unwrap_err();
        assert!(matches!(err, PaperflowError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_search_failure_propagates() {
        let err = checker(StaticSearchBackend::failing("offline"))
            .check("Title", ABSTRACT)
            .await
            .unwrap_err();
        assert!(matches!(err, PaperflowError::Backend(BackendError::Search { .. })));
    }

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(percentage(1.0 / 3.0), 33.33);
        assert_eq!(percentage(0.0), 0.0);
    }
}
