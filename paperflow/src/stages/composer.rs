//! Draft composition in monolithic or structured mode.

use super::{Stage, StageOutput};
use crate::backends::{CompletionBackend, CompletionRequest};
use crate::config::DraftingConfig;
use crate::core::{PaperSection, Phase, SourceDocument};
use crate::errors::PaperflowError;
use crate::pipeline::{with_retry, DraftDelta, PipelineState, RetryConfig, StageDelta};
use crate::utils::truncate_chars;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, LazyLock};

/// Heading of the single section produced in monolithic mode.
pub const MONOLITHIC_HEADING: &str = "Survey Paper";

/// Prefix of the body stored for a heading whose generation failed.
pub const SECTION_ERROR_MARKER: &str = "[ERROR]";

/// Abstract used when the draft has no sections at all.
pub const NO_ABSTRACT_GENERATED: &str = "No abstract generated.";

/// Canonical structured-mode headings with the word band each one targets.
pub const CANONICAL_HEADINGS: [(&str, &str); 7] = [
    ("Abstract", "about 200 words"),
    ("Introduction", "400-500 words"),
    ("Literature Review", "400-500 words"),
    ("Methodology", "300-400 words"),
    ("Results and Discussion", "500-600 words"),
    ("Conclusion", "250-300 words"),
    ("References", "one line per source"),
];

#[allow(clippy::expect_used)]
static EMPHASIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*|__").expect("emphasis pattern is valid"));

#[allow(clippy::expect_used)]
static LABEL_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t]*#{0,6}[ \t]*(?:title|abstract)[ \t]*:[ \t]*")
        .expect("label pattern is valid")
});

/// Draft strategy, chosen once per run from the target length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftMode {
    /// One generation call for the whole paper.
    Monolithic,
    /// One generation call per canonical heading.
    Structured,
}

impl DraftMode {
    /// Structured at or above `threshold`, monolithic below it.
    #[must_use]
    pub fn select(target_length: u32, threshold: u32) -> Self {
        if target_length >= threshold {
            Self::Structured
        } else {
            Self::Monolithic
        }
    }
}

impl fmt::Display for DraftMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Monolithic => write!(f, "monolithic"),
            Self::Structured => write!(f, "structured"),
        }
    }
}

/// Output of [`DraftComposer::compose`].
#[derive(Debug)]
pub struct Composition {
    /// Strategy used.
    pub mode: DraftMode,
    /// Paper title.
    pub title: String,
    /// Ordered sections.
    pub sections: Vec<PaperSection>,
    /// Per-heading failures that were replaced by placeholders.
    pub warnings: Vec<PaperflowError>,
}

/// Removes emphasis markup and heading echoes from a generated body.
#[must_use]
pub fn clean_body(heading: &str, text: &str) -> String {
    let text = EMPHASIS.replace_all(text, "");
    let text = LABEL_PREFIX.replace_all(&text, "");
    text.lines()
        .filter(|line| {
            let bare = line.trim().trim_matches(|c| c == '#' || c == ':').trim();
            !bare.eq_ignore_ascii_case(heading)
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Title used when the draft did not supply one.
fn templated_title(mode: DraftMode, topic: &str) -> String {
    match mode {
        DraftMode::Monolithic => format!("A Survey of {topic}"),
        DraftMode::Structured => format!("A Comprehensive Survey of {topic}"),
    }
}

/// Picks the abstract for downstream stages.
///
/// The section headed "Abstract" wins, then the first `prefix_chars`
/// characters of the first section, then [`NO_ABSTRACT_GENERATED`].
#[must_use]
pub fn extract_abstract(sections: &[PaperSection], prefix_chars: usize) -> String {
    if let Some(section) = sections.iter().find(|s| s.is_abstract()) {
        if !section.body.trim().is_empty() {
            return section.body.clone();
        }
    }
    sections
        .first()
        .map(|s| truncate_chars(&s.body, prefix_chars).to_string())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| NO_ABSTRACT_GENERATED.to_string())
}

/// Joins the documents into the context block shared by every prompt.
#[must_use]
pub fn context_block(documents: &[SourceDocument]) -> String {
    documents
        .iter()
        .map(SourceDocument::context_entry)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn monolithic_prompt(topic: &str, context: &str, target_length: u32) -> String {
    format!(
        "You are an academic researcher. Write a research paper on \"{topic}\".\n\n\
         Use only the retrieved papers below as your source material. Do not invent \
         claims, results or citations that are not supported by them.\n\n\
         RETRIEVED PAPERS:\n{context}\n\n\
         Start with a line of the form \"Title: <title>\", then write these sections: \
         Abstract, Introduction, Literature Review, Methodology, Results and Discussion, \
         Conclusion, References (the titles listed above).\n\n\
         Target length: about {target_length} pages."
    )
}

fn section_prompt(topic: &str, heading: &str, band: &str, context: &str) -> String {
    if heading == "References" {
        return format!(
            "List the references for a paper on \"{topic}\" exactly as they appear in the \
             retrieved papers below, one per line.\n\nRETRIEVED PAPERS:\n{context}"
        );
    }
    format!(
        "Write the {heading} section ({band}) of an academic survey on \"{topic}\".\n\
         Draw only on the retrieved papers below and cite them by title. Do not invent \
         facts, methods or results.\n\nRETRIEVED PAPERS:\n{context}"
    )
}

fn title_prompt(topic: &str, context: &str) -> String {
    format!(
        "Propose a concise academic title for a survey on \"{topic}\" based on these \
         papers. Reply with the title only.\n\nRETRIEVED PAPERS:\n{context}"
    )
}

/// Splits a "Title: ..." first line off a monolithic draft.
fn split_title(content: &str) -> (Option<String>, &str) {
    let trimmed = content.trim_start();
    let (first, rest) = trimmed.split_once('\n').unwrap_or((trimmed, ""));
    let bare = first.trim().trim_start_matches('#').replace("**", "");
    let bare = bare.trim();
    match bare.get(..6) {
        Some(label) if label.eq_ignore_ascii_case("title:") => {
            let title = bare[6..].trim();
            if title.is_empty() {
                (None, content)
            } else {
                (Some(title.to_string()), rest)
            }
        }
        _ => (None, content),
    }
}

/// Wraps the completion backend to produce a draft.
#[derive(Debug, Clone)]
pub struct DraftComposer {
    completion: Arc<dyn CompletionBackend>,
    config: DraftingConfig,
    retry: RetryConfig,
}

impl DraftComposer {
    /// Creates a composer.
    #[must_use]
    pub fn new(
        completion: Arc<dyn CompletionBackend>,
        config: DraftingConfig,
        retry: RetryConfig,
    ) -> Self {
        Self {
            completion,
            config,
            retry,
        }
    }

    /// Produces a title and ordered sections from the collected sources.
    ///
    /// # Errors
    ///
    /// Fails only in monolithic mode, when the single generation call fails.
    /// Structured mode replaces failed headings with placeholders instead.
    pub async fn compose(
        &self,
        topic: &str,
        context: &[SourceDocument],
        target_length: u32,
    ) -> Result<Composition, PaperflowError> {
        let mode = DraftMode::select(target_length, self.config.structured_threshold);
        let context = context_block(context);
        let max_tokens = self.config.max_tokens_for(target_length);
        tracing::debug!(%mode, target_length, max_tokens, "Composing draft");

        match mode {
            DraftMode::Monolithic => {
                self.compose_monolithic(topic, &context, target_length, max_tokens)
                    .await
            }
            DraftMode::Structured => Ok(self.compose_structured(topic, &context, max_tokens).await),
        }
    }

    async fn generate(&self, key: &str, prompt: String, max_tokens: u32) -> Result<String, PaperflowError> {
        let request = CompletionRequest::new(prompt, max_tokens, self.config.temperature);
        let completion = self.completion.as_ref();
        let request = &request;
        let text = with_retry(&self.retry, key, move || completion.complete(request)).await?;
        Ok(text.trim().to_string())
    }

    async fn compose_monolithic(
        &self,
        topic: &str,
        context: &str,
        target_length: u32,
        max_tokens: u32,
    ) -> Result<Composition, PaperflowError> {
        let prompt = monolithic_prompt(topic, context, target_length);
        let content = self
            .generate("draft", prompt, max_tokens)
            .await
            .map_err(|e| PaperflowError::section_generation(MONOLITHIC_HEADING, e.to_string()))?;

        let (title, body) = split_title(&content);
        Ok(Composition {
            mode: DraftMode::Monolithic,
            title: title.unwrap_or_else(|| templated_title(DraftMode::Monolithic, topic)),
            sections: vec![PaperSection::new(MONOLITHIC_HEADING, clean_body(MONOLITHIC_HEADING, body))],
            warnings: Vec::new(),
        })
    }

    async fn compose_structured(&self, topic: &str, context: &str, max_tokens: u32) -> Composition {
        let mut sections = Vec::with_capacity(CANONICAL_HEADINGS.len());
        let mut warnings = Vec::new();

        for (heading, band) in CANONICAL_HEADINGS {
            let prompt = section_prompt(topic, heading, band, context);
            match self.generate(heading, prompt, max_tokens).await {
                Ok(text) => sections.push(PaperSection::new(heading, clean_body(heading, &text))),
                Err(e) => {
                    tracing::warn!(heading, error = %e, "Section generation failed");
                    sections.push(PaperSection::new(
                        heading,
                        format!("{SECTION_ERROR_MARKER} Failed to generate {heading}: {e}"),
                    ));
                    warnings.push(PaperflowError::section_generation(heading, e.to_string()));
                }
            }
        }

        let templated = templated_title(DraftMode::Structured, topic);
        let title = if self.config.dedicated_title_call {
            match self.generate("title", title_prompt(topic, context), 64).await {
                Ok(text) => {
                    let line = clean_body("Title", text.lines().next().unwrap_or_default());
                    let line = line.trim_matches('"').trim();
                    if line.is_empty() {
                        templated
                    } else {
                        line.to_string()
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Title generation failed, using template");
                    templated
                }
            }
        } else {
            templated
        };

        Composition {
            mode: DraftMode::Structured,
            title,
            sections,
            warnings,
        }
    }

    fn draft_delta(&self, mode: DraftMode, title: String, sections: Vec<PaperSection>) -> DraftDelta {
        let composed_text = sections
            .iter()
            .map(|s| s.body.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let abstract_text = extract_abstract(&sections, self.config.abstract_prefix_chars);
        DraftDelta {
            mode,
            title,
            sections,
            composed_text,
            abstract_text,
        }
    }
}

#[async_trait]
impl Stage for DraftComposer {
    fn phase(&self) -> Phase {
        Phase::Write
    }

    async fn execute(&self, state: &PipelineState) -> Result<StageOutput, PaperflowError> {
        let request = &state.request;
        let composition = self
            .compose(&request.topic, &state.documents, request.target_length)
            .await?;

        let delta = self.draft_delta(composition.mode, composition.title, composition.sections);
        let headings: Vec<&str> = delta.sections.iter().map(|s| s.heading.as_str()).collect();
        let data = serde_json::json!({
            "mode": delta.mode,
            "title": delta.title,
            "sections": headings,
            "abstract": delta.abstract_text,
        });
        let summary = format!("Draft written with {} sections.", delta.sections.len());

        Ok(StageOutput::new(StageDelta::Draft(delta), summary)
            .with_data(data)
            .with_warnings(composition.warnings))
    }

    fn placeholder(&self, state: &PipelineState, error: &PaperflowError) -> Option<StageDelta> {
        let mode = DraftMode::select(state.request.target_length, self.config.structured_threshold);
        let headings: Vec<&str> = match mode {
            DraftMode::Monolithic => vec![MONOLITHIC_HEADING],
            DraftMode::Structured => CANONICAL_HEADINGS.iter().map(|(h, _)| *h).collect(),
        };
        let sections = headings
            .into_iter()
            .map(|heading| {
                PaperSection::new(
                    heading,
                    format!("{SECTION_ERROR_MARKER} Failed to generate {heading}: {error}"),
                )
            })
            .collect();

        let mut delta = self.draft_delta(mode, templated_title(mode, &state.request.topic), sections);
        delta.abstract_text = NO_ABSTRACT_GENERATED.to_string();
        Some(StageDelta::Draft(delta))
    }

    fn fallback(&self, state: &PipelineState, _error: &PaperflowError) -> Option<StageDelta> {
        let mode = DraftMode::select(state.request.target_length, self.config.structured_threshold);
        let title = templated_title(mode, &state.request.topic);
        Some(StageDelta::Draft(self.draft_delta(mode, title, Vec::new())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MockCompletionBackend;
    use crate::core::GenerationRequest;
    use crate::errors::BackendError;
    use pretty_assertions::assert_eq;

    fn docs() -> Vec<SourceDocument> {
        vec![
            SourceDocument::new("link-1", "Paper One", "Summary one."),
            SourceDocument::new("link-2", "Paper Two", "Summary two."),
        ]
    }

    fn composer(backend: MockCompletionBackend) -> DraftComposer {
        DraftComposer::new(Arc::new(backend), DraftingConfig::default(), RetryConfig::disabled())
    }

    #[test]
    fn test_mode_selection() {
        assert_eq!(DraftMode::select(3, 5), DraftMode::Monolithic);
        assert_eq!(DraftMode::select(5, 5), DraftMode::Structured);
        assert_eq!(DraftMode::select(9, 5), DraftMode::Structured);
    }

    #[test]
    fn test_clean_body() {
        let raw = "## Abstract\n**Abstract:** This survey covers **graphs**.\nTitle: Stray\nMore text.";
        assert_eq!(clean_body("Abstract", raw), "This survey covers graphs.\nStray\nMore text.");
    }

    #[test]
    fn test_clean_body_drops_heading_echo() {
        let raw = "Methodology:\nWe compare three approaches.";
        assert_eq!(clean_body("Methodology", raw), "We compare three approaches.");
    }

    #[test]
    fn test_extract_abstract_rules() {
        let with_abstract = vec![
            PaperSection::new("Introduction", "Intro."),
            PaperSection::new("abstract", "The abstract."),
        ];
        assert_eq!(extract_abstract(&with_abstract, 500), "The abstract.");

        let without = vec![PaperSection::new("Survey Paper", "abcdefghij")];
        assert_eq!(extract_abstract(&without, 4), "abcd");

        assert_eq!(extract_abstract(&[], 500), NO_ABSTRACT_GENERATED);
    }

    #[test]
    fn test_split_title() {
        let (title, body) = split_title("Title: Graph Learning Today\nAbstract: text");
        assert_eq!(title.as_deref(), Some("Graph Learning Today"));
        assert_eq!(body, "Abstract: text");

        let (title, body) = split_title("Introduction\nBody");
        assert_eq!(title, None);
        assert_eq!(body, "Introduction\nBody");
    }

    #[test]
    fn test_context_block() {
        assert_eq!(
            context_block(&docs()),
            "Title: Paper One\nSummary: Summary one.\nSource: link-1\n\n\
             Title: Paper Two\nSummary: Summary two.\nSource: link-2"
        );
    }

    #[tokio::test]
    async fn test_monolithic_compose() {
        let mut backend = MockCompletionBackend::new();
        backend
            .expect_complete()
            .withf(|req| req.max_tokens == 512 && req.prompt.contains("Paper Two"))
            .times(1)
            .returning(|_| Ok("Title: Graphs Revisited\n**Abstract:** Short.\nBody text.".to_string()));

        let composition = composer(backend).compose("Graphs", &docs(), 3).await.unwrap();

        assert_eq!(composition.mode, DraftMode::Monolithic);
        assert_eq!(composition.title, "Graphs Revisited");
        assert_eq!(composition.sections.len(), 1);
        assert_eq!(composition.sections[0].heading, MONOLITHIC_HEADING);
        assert_eq!(composition.sections[0].body, "Short.\nBody text.");
    }

    #[tokio::test]
    async fn test_monolithic_templated_title() {
        let mut backend = MockCompletionBackend::new();
        backend
            .expect_complete()
            .returning(|_| Ok("Just a body.".to_string()));

        let composition = composer(backend).compose("Graphs", &docs(), 2).await.unwrap();
        assert_eq!(composition.title, "A Survey of Graphs");
    }

    #[tokio::test]
    async fn test_monolithic_failure_is_error() {
        let mut backend = MockCompletionBackend::new();
        backend
            .expect_complete()
            .returning(|_| Err(BackendError::completion("down")));

        let err = composer(backend).compose("Graphs", &docs(), 2).await.unwrap_err();
        assert!(matches!(err, PaperflowError::SectionGeneration { .. }));
    }

    #[tokio::test]
    async fn test_structured_survives_one_failed_heading() {
        let mut backend = MockCompletionBackend::new();
        backend
            .expect_complete()
            .times(7)
            .returning(|req| {
                if req.prompt.starts_with("Write the Methodology section") {
                    Err(BackendError::completion("rate limited"))
                } else {
                    Ok("Generated text.".to_string())
                }
            });

        let composition = composer(backend).compose("Graphs", &docs(), 6).await.unwrap();

        let headings: Vec<&str> = composition.sections.iter().map(|s| s.heading.as_str()).collect();
        let expected: Vec<&str> = CANONICAL_HEADINGS.iter().map(|(h, _)| *h).collect();
        assert_eq!(headings, expected);
        assert_eq!(composition.title, "A Comprehensive Survey of Graphs");

        let methodology = &composition.sections[3];
        assert!(methodology.body.starts_with(SECTION_ERROR_MARKER));
        assert!(methodology.body.contains("rate limited"));
        assert_eq!(composition.warnings.len(), 1);
        assert_eq!(composition.sections[4].body, "Generated text.");
    }

    #[tokio::test]
    async fn test_structured_dedicated_title_call() {
        let mut backend = MockCompletionBackend::new();
        backend.expect_complete().returning(|req| {
            if req.prompt.starts_with("Propose a concise academic title") {
                Ok("\"Graphs: A Field Guide\"".to_string())
            } else {
                Ok("Text.".to_string())
            }
        });

        let config = DraftingConfig {
            dedicated_title_call: true,
            ..DraftingConfig::default()
        };
        let composer = DraftComposer::new(Arc::new(backend), config, RetryConfig::disabled());
        let composition = composer.compose("Graphs", &docs(), 8).await.unwrap();
        assert_eq!(composition.title, "Graphs: A Field Guide");
    }

    #[tokio::test]
    async fn test_long_paper_uses_large_budget() {
        let mut backend = MockCompletionBackend::new();
        backend
            .expect_complete()
            .withf(|req| req.max_tokens == 1024)
            .times(7)
            .returning(|_| Ok("Text.".to_string()));

        composer(backend).compose("Graphs", &docs(), 10).await.unwrap();
    }

    fn draft_of(delta: Option<StageDelta>) -> DraftDelta {
        match delta {
            Some(StageDelta::Draft(draft)) => draft,
            other => panic!("unexpected delta {other:?}"),
        }
    }

    #[test]
    fn test_placeholder_marks_every_heading() {
        let state = PipelineState::new(GenerationRequest::new("Graphs").with_target_length(8));
        let err = PaperflowError::section_generation(MONOLITHIC_HEADING, "quota exceeded");
        let draft = draft_of(composer(MockCompletionBackend::new()).placeholder(&state, &err));

        assert_eq!(draft.mode, DraftMode::Structured);
        assert_eq!(draft.title, "A Comprehensive Survey of Graphs");
        assert_eq!(draft.sections.len(), CANONICAL_HEADINGS.len());
        assert!(draft
            .sections
            .iter()
            .all(|s| s.body.starts_with(SECTION_ERROR_MARKER) && s.body.contains("quota exceeded")));
        assert_eq!(draft.abstract_text, NO_ABSTRACT_GENERATED);
    }

    #[test]
    fn test_placeholder_and_fallback_differ() {
        let state = PipelineState::new(GenerationRequest::new("Graphs").with_target_length(3));
        let err = PaperflowError::section_generation(MONOLITHIC_HEADING, "quota exceeded");
        let composer = composer(MockCompletionBackend::new());

        let placeholder = draft_of(composer.placeholder(&state, &err));
        assert_eq!(placeholder.title, "A Survey of Graphs");
        assert_eq!(placeholder.sections.len(), 1);
        assert_eq!(placeholder.sections[0].heading, MONOLITHIC_HEADING);
        assert!(placeholder.composed_text.starts_with(SECTION_ERROR_MARKER));

        let fallback = draft_of(composer.fallback(&state, &err));
        assert_eq!(fallback.title, "A Survey of Graphs");
        assert!(fallback.sections.is_empty());
        assert_eq!(fallback.composed_text, "");
        assert_eq!(fallback.abstract_text, NO_ABSTRACT_GENERATED);
    }
}
