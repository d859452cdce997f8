//! Markdown file render backend and artifact lookup.

use super::RenderBackend;
use crate::config::RenderingConfig;
use crate::core::{RenderDocument, RenderedArtifact};
use crate::errors::BackendError;
use async_trait::async_trait;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// File name prefix shared by every rendered artifact.
pub const ARTIFACT_PREFIX: &str = "paper_";

/// Writes each paper as `paper_<artifact_id>.md` under an output directory.
#[derive(Debug, Clone)]
pub struct FileRenderBackend {
    output_dir: PathBuf,
}

impl FileRenderBackend {
    /// Creates a backend writing into `output_dir`.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Creates a backend writing into the configured output directory.
    #[must_use]
    pub fn from_config(config: &RenderingConfig) -> Self {
        Self::new(config.output_dir.clone())
    }

    /// Returns the output directory.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path an artifact with this id is written to.
    #[must_use]
    pub fn artifact_path(&self, artifact_id: &str) -> PathBuf {
        self.output_dir
            .join(format!("{ARTIFACT_PREFIX}{artifact_id}.md"))
    }
}

/// Lays out a document as Markdown.
#[must_use]
pub fn to_markdown(document: &RenderDocument) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}\n", document.title);
    let _ = writeln!(out, "## Abstract\n\n{}\n", document.abstract_text);
    for section in &document.sections {
        let _ = writeln!(out, "## {}\n\n{}\n", section.heading, section.body);
    }
    if !document.references.is_empty() {
        out.push_str("## References\n\n");
        for line in &document.references {
            let _ = writeln!(out, "{line}");
        }
    }
    out
}

#[async_trait]
impl RenderBackend for FileRenderBackend {
    async fn render(&self, document: &RenderDocument) -> Result<RenderedArtifact, BackendError> {
        let path = self.artifact_path(&document.artifact_id);
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| BackendError::render(format!("{}: {e}", self.output_dir.display())))?;
        tokio::fs::write(&path, to_markdown(document))
            .await
            .map_err(|e| BackendError::render(format!("{}: {e}", path.display())))?;

        tracing::info!(path = %path.display(), "Artifact written");
        Ok(RenderedArtifact::new(path.to_string_lossy()))
    }
}

/// Finds a rendered artifact by identifier prefix.
///
/// Returns the lexicographically first match, or `None` when nothing in
/// `output_dir` starts with `paper_<artifact_id>`. A missing directory counts
/// as no match.
///
/// # Errors
///
/// Returns an error if the directory exists but cannot be read.
pub async fn find_artifact(
    output_dir: impl AsRef<Path>,
    artifact_id: &str,
) -> Result<Option<PathBuf>, BackendError> {
    let output_dir = output_dir.as_ref();
    let wanted = format!("{ARTIFACT_PREFIX}{artifact_id}");

    let mut entries = match tokio::fs::read_dir(output_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(BackendError::render(format!("{}: {e}", output_dir.display()))),
    };

    let mut matches = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| BackendError::render(e.to_string()))?
    {
        if entry.file_name().to_string_lossy().starts_with(&wanted) {
            matches.push(entry.path());
        }
    }
    matches.sort();
    Ok(matches.into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PaperSection;

    fn document(id: &str) -> RenderDocument {
        RenderDocument {
            artifact_id: id.to_string(),
            title: "A Survey of Graphs".to_string(),
            abstract_text: "Graphs are everywhere.".to_string(),
            sections: vec![PaperSection::new("Introduction", "Intro body.")],
            references: vec!["[1] Paper One (Source: http://x/1)".to_string()],
        }
    }

    #[test]
    fn test_markdown_layout() {
        let md = to_markdown(&document("id"));
        assert!(md.starts_with("# A Survey of Graphs\n"));
        assert!(md.contains("## Abstract\n\nGraphs are everywhere."));
        assert!(md.contains("## Introduction\n\nIntro body."));
        assert!(md.contains("## References\n\n[1] Paper One"));
    }

    #[tokio::test]
    async fn test_render_and_find() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileRenderBackend::new(dir.path().join("nested"));

        let artifact = backend.render(&document("20250115_120000_000001")).await.unwrap();
        assert!(artifact.path.ends_with("paper_20250115_120000_000001.md"));

        let written = std::fs::read_to_string(&artifact.path).unwrap();
        assert!(written.contains("Intro body."));

        let found = find_artifact(backend.output_dir(), "20250115_120000")
            .await
            .unwrap();
        assert_eq!(found, Some(PathBuf::from(&artifact.path)));
    }

    #[tokio::test]
    async fn test_from_config_writes_to_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = RenderingConfig {
            output_dir: dir.path().join("papers"),
            ..RenderingConfig::default()
        };
        let backend = FileRenderBackend::from_config(&config);
        assert_eq!(backend.output_dir(), config.output_dir.as_path());

        let artifact = backend.render(&document("20250115_120000_000002")).await.unwrap();
        assert!(Path::new(&artifact.path).starts_with(&config.output_dir));
    }

    #[tokio::test]
    async fn test_find_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(find_artifact(dir.path(), "nope").await.unwrap(), None);
        assert_eq!(
            find_artifact(dir.path().join("absent"), "nope").await.unwrap(),
            None
        );
    }
}
