//! Request and document records shared by the pipeline stages.

use crate::errors::PaperflowError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Default page/section budget when a caller does not specify one.
pub const DEFAULT_TARGET_LENGTH: u32 = 5;

/// Default number of sources requested from the search backend.
pub const DEFAULT_MIN_REFERENCES: u32 = 10;

/// A request to generate one paper.
///
/// Immutable once a run starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The research topic.
    pub topic: String,
    /// Page/section budget.
    #[serde(default = "default_target_length")]
    pub target_length: u32,
    /// How many sources to request.
    #[serde(default = "default_min_references")]
    pub min_references: u32,
}

fn default_target_length() -> u32 {
    DEFAULT_TARGET_LENGTH
}

fn default_min_references() -> u32 {
    DEFAULT_MIN_REFERENCES
}

impl GenerationRequest {
    /// Creates a request with default length and reference budget.
    #[must_use]
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            target_length: DEFAULT_TARGET_LENGTH,
            min_references: DEFAULT_MIN_REFERENCES,
        }
    }

    /// Sets the page/section budget.
    #[must_use]
    pub fn with_target_length(mut self, target_length: u32) -> Self {
        self.target_length = target_length;
        self
    }

    /// Sets the number of sources to request.
    #[must_use]
    pub fn with_min_references(mut self, min_references: u32) -> Self {
        self.min_references = min_references;
        self
    }

    /// Checks the request before any backend is touched.
    ///
    /// # Errors
    ///
    /// Returns [`PaperflowError::InvalidRequest`] for a blank topic or a zero
    /// target length.
    pub fn validate(&self) -> Result<(), PaperflowError> {
        if self.topic.trim().is_empty() {
            return Err(PaperflowError::InvalidRequest(
                "topic must not be empty".to_string(),
            ));
        }
        if self.target_length == 0 {
            return Err(PaperflowError::InvalidRequest(
                "target_length must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Stable digest of the normalized request.
    ///
    /// Requests that differ only in topic case or surrounding whitespace share
    /// a fingerprint.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let normalized = self
            .topic
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        hasher.update(b"\0");
        hasher.update(self.target_length.to_be_bytes());
        hasher.update(self.min_references.to_be_bytes());
        let digest = hasher.finalize();
        hex::encode(&digest[..16])
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("topic".to_string(), serde_json::json!(self.topic));
        map.insert("target_length".to_string(), serde_json::json!(self.target_length));
        map.insert("min_references".to_string(), serde_json::json!(self.min_references));
        map
    }
}

/// One accepted search hit, as seen by the drafting stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Where the source lives (PDF link, or the backend id).
    pub origin_id: String,
    /// Source title.
    pub title: String,
    /// Source summary.
    pub excerpt: String,
}

impl SourceDocument {
    /// Creates a source document.
    #[must_use]
    pub fn new(
        origin_id: impl Into<String>,
        title: impl Into<String>,
        excerpt: impl Into<String>,
    ) -> Self {
        Self {
            origin_id: origin_id.into(),
            title: title.into(),
            excerpt: excerpt.into(),
        }
    }

    /// Formats the document as one block of drafting context.
    #[must_use]
    pub fn context_entry(&self) -> String {
        format!(
            "Title: {}\nSummary: {}\nSource: {}",
            self.title, self.excerpt, self.origin_id
        )
    }
}

/// A keyed reference to one collected source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Stable label such as `[Ref-3]`.
    pub key: String,
    /// Human-readable reference line.
    pub display_entry: String,
    /// Back-reference to the matching [`SourceDocument`].
    pub origin_id: String,
}

impl Citation {
    /// Creates the citation for the `index`-th (zero-based) source.
    #[must_use]
    pub fn for_source(index: usize, document: &SourceDocument) -> Self {
        Self {
            key: format!("[Ref-{}]", index + 1),
            display_entry: format!("{} (Source: {})", document.title, document.origin_id),
            origin_id: document.origin_id.clone(),
        }
    }
}

/// One heading and its body text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperSection {
    /// Section heading.
    pub heading: String,
    /// Section body.
    pub body: String,
}

impl PaperSection {
    /// Creates a section.
    #[must_use]
    pub fn new(heading: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            body: body.into(),
        }
    }

    /// Returns true if the heading names the abstract.
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.heading.trim().eq_ignore_ascii_case("abstract")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request = GenerationRequest::new("Graph Neural Networks");
        assert_eq!(request.target_length, 5);
        assert_eq!(request.min_references, 10);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_blank_topic_rejected() {
        for topic in ["", "   ", "\t\n"] {
            let err = GenerationRequest::new(topic).validate().unwrap_err();
            assert!(matches!(err, PaperflowError::InvalidRequest(_)));
        }
    }

    #[test]
    fn test_zero_length_rejected() {
        let request = GenerationRequest::new("Topic").with_target_length(0);
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_request_deserialize_defaults() {
        let request: GenerationRequest = serde_json::from_str(r#"{"topic": "Transformers"}"#).unwrap();
        assert_eq!(request, GenerationRequest::new("Transformers"));
    }

    #[test]
    fn test_fingerprint_normalizes_topic() {
        let a = GenerationRequest::new("Graph Neural Networks");
        let b = GenerationRequest::new("  graph   neural networks ");
        let c = GenerationRequest::new("Graph Neural Networks").with_target_length(7);

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 32);
    }

    #[test]
    fn test_citation_for_source() {
        let doc = SourceDocument::new("http://arxiv.org/pdf/1234", "Deep Graphs", "We study graphs.");
        let citation = Citation::for_source(2, &doc);

        assert_eq!(citation.key, "[Ref-3]");
        assert_eq!(citation.display_entry, "Deep Graphs (Source: http://arxiv.org/pdf/1234)");
        assert_eq!(citation.origin_id, doc.origin_id);
    }

    #[test]
    fn test_context_entry() {
        let doc = SourceDocument::new("id-1", "Title A", "Summary A");
        assert_eq!(doc.context_entry(), "Title: Title A\nSummary: Summary A\nSource: id-1");
    }

    #[test]
    fn test_is_abstract() {
        assert!(PaperSection::new(" ABSTRACT ", "").is_abstract());
        assert!(!PaperSection::new("Abstract and Scope", "").is_abstract());
    }
}
