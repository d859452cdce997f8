//! Pipeline configuration.
//!
//! Every field has a default, so an empty JSON object is a valid
//! configuration. Hosts usually load a file and then apply environment
//! overrides:
//!
//! ```no_run
//! use paperflow::config::PaperflowConfig;
//!
//! let config = PaperflowConfig::from_file("paperflow.json")?
//!     .with_env_overrides()?;
//! # Ok::<(), paperflow::PaperflowError>(())
//! ```

use crate::errors::PaperflowError;
use crate::pipeline::{RetryConfig, StagePolicies};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable overriding [`RenderingConfig::output_dir`].
pub const ENV_OUTPUT_DIR: &str = "PAPERFLOW_OUTPUT_DIR";
/// Environment variable overriding [`DraftingConfig::structured_threshold`].
pub const ENV_STRUCTURED_THRESHOLD: &str = "PAPERFLOW_STRUCTURED_THRESHOLD";
/// Environment variable overriding [`RetrievalConfig::relevance_threshold`].
pub const ENV_RELEVANCE_THRESHOLD: &str = "PAPERFLOW_RELEVANCE_THRESHOLD";
/// Environment variable overriding [`RetryConfig::max_attempts`].
pub const ENV_RETRY_ATTEMPTS: &str = "PAPERFLOW_RETRY_ATTEMPTS";

/// Source collection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Minimum fraction of topic keywords a hit must contain.
    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: f64,
    /// Search limit used when a request asks for zero references.
    #[serde(default = "default_search_limit")]
    pub default_limit: usize,
    /// Query the backend with a stop-word-reduced topic.
    #[serde(default)]
    pub reduce_query: bool,
    /// Tokens kept in a reduced query.
    #[serde(default = "default_query_terms")]
    pub query_terms: usize,
}

fn default_relevance_threshold() -> f64 {
    0.5
}

fn default_search_limit() -> usize {
    10
}

fn default_query_terms() -> usize {
    6
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            relevance_threshold: default_relevance_threshold(),
            default_limit: default_search_limit(),
            reduce_query: false,
            query_terms: default_query_terms(),
        }
    }
}

/// Draft composition settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftingConfig {
    /// Target lengths at or above this value use structured mode.
    #[serde(default = "default_structured_threshold")]
    pub structured_threshold: u32,
    /// Target lengths at or below this value use the short token budget.
    #[serde(default = "default_short_length")]
    pub short_length: u32,
    /// Token budget for short papers.
    #[serde(default = "default_short_max_tokens")]
    pub short_max_tokens: u32,
    /// Token budget for long papers.
    #[serde(default = "default_long_max_tokens")]
    pub long_max_tokens: u32,
    /// Sampling temperature.
    #[serde(default = "default_drafting_temperature")]
    pub temperature: f32,
    /// Characters of the first section used when no abstract exists.
    #[serde(default = "default_abstract_prefix")]
    pub abstract_prefix_chars: usize,
    /// Ask the backend for a title in structured mode.
    #[serde(default)]
    pub dedicated_title_call: bool,
}

fn default_structured_threshold() -> u32 {
    5
}

fn default_short_length() -> u32 {
    5
}

fn default_short_max_tokens() -> u32 {
    512
}

fn default_long_max_tokens() -> u32 {
    1024
}

fn default_drafting_temperature() -> f32 {
    0.7
}

fn default_abstract_prefix() -> usize {
    500
}

impl Default for DraftingConfig {
    fn default() -> Self {
        Self {
            structured_threshold: default_structured_threshold(),
            short_length: default_short_length(),
            short_max_tokens: default_short_max_tokens(),
            long_max_tokens: default_long_max_tokens(),
            temperature: default_drafting_temperature(),
            abstract_prefix_chars: default_abstract_prefix(),
            dedicated_title_call: false,
        }
    }
}

impl DraftingConfig {
    /// Token budget for one generation call at the given target length.
    #[must_use]
    pub fn max_tokens_for(&self, target_length: u32) -> u32 {
        if target_length <= self.short_length {
            self.short_max_tokens
        } else {
            self.long_max_tokens
        }
    }
}

/// Refinement settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementConfig {
    /// Sampling temperature.
    #[serde(default = "default_refine_temperature")]
    pub temperature: f32,
    /// Token budget.
    #[serde(default = "default_short_max_tokens")]
    pub max_tokens: u32,
    /// Characters of refined text used when the abstract is still missing.
    #[serde(default = "default_abstract_fallback")]
    pub abstract_fallback_chars: usize,
}

fn default_refine_temperature() -> f32 {
    0.4
}

fn default_abstract_fallback() -> usize {
    400
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            temperature: default_refine_temperature(),
            max_tokens: default_short_max_tokens(),
            abstract_fallback_chars: default_abstract_fallback(),
        }
    }
}

/// Render settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderingConfig {
    /// Directory artifacts are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Characters of the abstract kept in the descriptor preview.
    #[serde(default = "default_preview_chars")]
    pub abstract_preview_chars: usize,
    /// Replace characters outside Latin-1 before rendering.
    #[serde(default = "default_true")]
    pub latin1_substitution: bool,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_preview_chars() -> usize {
    300
}

fn default_true() -> bool {
    true
}

impl Default for RenderingConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            abstract_preview_chars: default_preview_chars(),
            latin1_substitution: true,
        }
    }
}

/// Overlap check settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapConfig {
    /// Tokens kept in the reduced query.
    #[serde(default = "default_query_terms")]
    pub query_terms: usize,
    /// Hits requested per search.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
    /// Matches kept in the report.
    #[serde(default = "default_max_matches")]
    pub max_matches: usize,
    /// Characters of each hit summary kept as a snippet.
    #[serde(default = "default_snippet_chars")]
    pub snippet_chars: usize,
}

fn default_max_matches() -> usize {
    5
}

fn default_snippet_chars() -> usize {
    200
}

impl Default for OverlapConfig {
    fn default() -> Self {
        Self {
            query_terms: default_query_terms(),
            search_limit: default_search_limit(),
            max_matches: default_max_matches(),
            snippet_chars: default_snippet_chars(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperflowConfig {
    /// Source collection.
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Draft composition.
    #[serde(default)]
    pub drafting: DraftingConfig,
    /// Refinement.
    #[serde(default)]
    pub refinement: RefinementConfig,
    /// Rendering.
    #[serde(default)]
    pub rendering: RenderingConfig,
    /// Overlap check.
    #[serde(default)]
    pub overlap: OverlapConfig,
    /// Backend retry policy.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Per-stage failure policy.
    #[serde(default)]
    pub policies: StagePolicies,
    /// Streaming channel capacity.
    #[serde(default = "default_stream_buffer")]
    pub stream_buffer: usize,
}

fn default_stream_buffer() -> usize {
    32
}

impl Default for PaperflowConfig {
    fn default() -> Self {
        Self {
            retrieval: RetrievalConfig::default(),
            drafting: DraftingConfig::default(),
            refinement: RefinementConfig::default(),
            rendering: RenderingConfig::default(),
            overlap: OverlapConfig::default(),
            retry: RetryConfig::default(),
            policies: StagePolicies::default(),
            stream_buffer: default_stream_buffer(),
        }
    }
}

impl PaperflowConfig {
    /// Creates a configuration with every default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the values are invalid.
    pub fn from_json_str(json: &str) -> Result<Self, PaperflowError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PaperflowError::Config(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PaperflowError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "Loaded configuration file");
        Self::from_json_str(&raw)
    }

    /// Applies `PAPERFLOW_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if an override cannot be parsed or the result is invalid.
    pub fn with_env_overrides(self) -> Result<Self, PaperflowError> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if an override cannot be parsed or the result is invalid.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, PaperflowError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_OUTPUT_DIR) {
            self.rendering.output_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(ENV_STRUCTURED_THRESHOLD) {
            self.drafting.structured_threshold = parse_override(ENV_STRUCTURED_THRESHOLD, &raw)?;
        }
        if let Some(raw) = lookup(ENV_RELEVANCE_THRESHOLD) {
            self.retrieval.relevance_threshold = parse_override(ENV_RELEVANCE_THRESHOLD, &raw)?;
        }
        if let Some(raw) = lookup(ENV_RETRY_ATTEMPTS) {
            self.retry.max_attempts = parse_override(ENV_RETRY_ATTEMPTS, &raw)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`PaperflowError::Config`] describing the first invalid value.
    pub fn validate(&self) -> Result<(), PaperflowError> {
        if !(0.0..=1.0).contains(&self.retrieval.relevance_threshold) {
            return Err(PaperflowError::Config(format!(
                "retrieval.relevance_threshold must be within [0, 1], got {}",
                self.retrieval.relevance_threshold
            )));
        }
        if self.drafting.structured_threshold == 0 {
            return Err(PaperflowError::Config(
                "drafting.structured_threshold must be positive".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(PaperflowError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.stream_buffer == 0 {
            return Err(PaperflowError::Config(
                "stream_buffer must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the output directory.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.rendering.output_dir = dir.into();
        self
    }

    /// Sets the failure policy table.
    #[must_use]
    pub fn with_policies(mut self, policies: StagePolicies) -> Self {
        self.policies = policies;
        self
    }
}

fn parse_override<T>(key: &str, raw: &str) -> Result<T, PaperflowError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| PaperflowError::Config(format!("{key}={raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PaperflowConfig::new();
        assert!((config.retrieval.relevance_threshold - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.retrieval.default_limit, 10);
        assert_eq!(config.drafting.structured_threshold, 5);
        assert_eq!(config.rendering.output_dir, PathBuf::from("output"));
        assert_eq!(config.overlap.max_matches, 5);
        assert_eq!(config.stream_buffer, 32);
    }

    #[test]
    fn test_empty_json_equals_defaults() {
        let config = PaperflowConfig::from_json_str("{}").unwrap();
        assert_eq!(config, PaperflowConfig::new());
    }

    #[test]
    fn test_partial_json() {
        let config = PaperflowConfig::from_json_str(
            r#"{"drafting": {"structured_threshold": 3}, "rendering": {"output_dir": "/tmp/papers"}}"#,
        )
        .unwrap();
        assert_eq!(config.drafting.structured_threshold, 3);
        assert_eq!(config.drafting.short_max_tokens, 512);
        assert_eq!(config.rendering.output_dir, PathBuf::from("/tmp/papers"));
    }

    #[test]
    fn test_max_tokens_for() {
        let drafting = DraftingConfig::default();
        assert_eq!(drafting.max_tokens_for(3), 512);
        assert_eq!(drafting.max_tokens_for(5), 512);
        assert_eq!(drafting.max_tokens_for(6), 1024);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let err = PaperflowConfig::from_json_str(r#"{"retrieval": {"relevance_threshold": 1.5}}"#);
        assert!(matches!(err, Err(PaperflowError::Config(_))));

        let err = PaperflowConfig::from_json_str(r#"{"retry": {"max_attempts": 0}}"#);
        assert!(matches!(err, Err(PaperflowError::Config(_))));

        let err = PaperflowConfig::from_json_str(r#"{"drafting": {"structured_threshold": 0}}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_overrides() {
        let config = PaperflowConfig::new()
            .with_overrides_from(lookup(&[
                (ENV_OUTPUT_DIR, "/srv/out"),
                (ENV_STRUCTURED_THRESHOLD, "7"),
                (ENV_RELEVANCE_THRESHOLD, "0.25"),
                (ENV_RETRY_ATTEMPTS, " 2 "),
            ]))
            .unwrap();

        assert_eq!(config.rendering.output_dir, PathBuf::from("/srv/out"));
        assert_eq!(config.drafting.structured_threshold, 7);
        assert!((config.retrieval.relevance_threshold - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.retry.max_attempts, 2);
    }

    #[test]
    fn test_bad_override() {
        let err = PaperflowConfig::new()
            .with_overrides_from(lookup(&[(ENV_STRUCTURED_THRESHOLD, "many")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_STRUCTURED_THRESHOLD));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paperflow.json");
        std::fs::write(&path, r#"{"stream_buffer": 8}"#).unwrap();

        let config = PaperflowConfig::from_file(&path).unwrap();
        assert_eq!(config.stream_buffer, 8);
    }
}
