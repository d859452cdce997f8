//! Render inputs and the descriptor of a persisted artifact.

use super::model::PaperSection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Everything a render backend needs to lay out one paper.
///
/// Sections arrive already filtered; references arrive as display entries in
/// citation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderDocument {
    /// Identifier the backend must persist the artifact under.
    pub artifact_id: String,
    /// Paper title.
    pub title: String,
    /// Paper abstract.
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// Body sections in display order.
    pub sections: Vec<PaperSection>,
    /// Reference lines, already numbered `[1]..[n]`.
    pub references: Vec<String>,
}

/// What a render backend reports after persisting an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedArtifact {
    /// Where the artifact was written.
    pub path: String,
}

impl RenderedArtifact {
    /// Creates a rendered artifact record.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Descriptor returned by the render stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    /// Sortable, time-derived identifier.
    pub artifact_id: String,
    /// Rendered title.
    pub title: String,
    /// Leading slice of the abstract.
    pub abstract_preview: String,
    /// Render status label.
    pub status: String,
    /// Human-readable generation time.
    pub timestamp: String,
    /// Artifact location.
    pub path: String,
}

impl ArtifactDescriptor {
    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("artifact_id".to_string(), serde_json::json!(self.artifact_id));
        map.insert("title".to_string(), serde_json::json!(self.title));
        map.insert("abstract_preview".to_string(), serde_json::json!(self.abstract_preview));
        map.insert("status".to_string(), serde_json::json!(self.status));
        map.insert("timestamp".to_string(), serde_json::json!(self.timestamp));
        map.insert("path".to_string(), serde_json::json!(self.path));
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_to_dict() {
        let descriptor = ArtifactDescriptor {
            artifact_id: "20250115_120000_000001".to_string(),
            title: "T".to_string(),
            abstract_preview: "A...".to_string(),
            status: "Completed".to_string(),
            timestamp: "2025-01-15 12:00:00".to_string(),
            path: "output/paper_20250115_120000_000001.md".to_string(),
        };
        let dict = descriptor.to_dict();

        assert_eq!(dict.len(), 6);
        assert_eq!(dict.get("status"), Some(&serde_json::json!("Completed")));
    }

    #[test]
    fn test_render_document_abstract_field_name() {
        let doc = RenderDocument {
            artifact_id: "id".to_string(),
            title: "T".to_string(),
            abstract_text: "A".to_string(),
            sections: vec![],
            references: vec![],
        };
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["abstract"], serde_json::json!("A"));
    }
}
