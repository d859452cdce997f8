//! Scripted collaborators for tests and demos.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::backends::{CompletionBackend, CompletionRequest, RenderBackend, SearchBackend, SearchHit};
use crate::core::{RenderDocument, RenderedArtifact};
use crate::errors::BackendError;

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Fail(String),
}

/// A completion backend answering from prompt-substring rules.
///
/// The first rule whose needle occurs in the prompt wins; prompts matching
/// no rule get the default reply. Every prompt is recorded.
#[derive(Debug)]
pub struct ScriptedCompletionBackend {
    rules: Vec<(String, Reply)>,
    default_reply: String,
    prompts: Mutex<Vec<String>>,
}

impl Default for ScriptedCompletionBackend {
    fn default() -> Self {
        Self::new("Generated text.")
    }
}

impl ScriptedCompletionBackend {
    /// Creates a backend answering every prompt with `default_reply`.
    #[must_use]
    pub fn new(default_reply: impl Into<String>) -> Self {
        Self {
            rules: Vec::new(),
            default_reply: default_reply.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Answers prompts containing `needle` with `reply`.
    #[must_use]
    pub fn with_reply(mut self, needle: impl Into<String>, reply: impl Into<String>) -> Self {
        self.rules.push((needle.into(), Reply::Text(reply.into())));
        self
    }

    /// Fails prompts containing `needle`.
    #[must_use]
    pub fn with_failure(mut self, needle: impl Into<String>, reason: impl Into<String>) -> Self {
        self.rules.push((needle.into(), Reply::Fail(reason.into())));
        self
    }

    /// Returns the prompts received so far.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    /// Returns the number of calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.prompts.lock().len()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedCompletionBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError> {
        self.prompts.lock().push(request.prompt.clone());

        let reply = self
            .rules
            .iter()
            .find(|(needle, _)| request.prompt.contains(needle.as_str()))
            .map_or_else(|| Reply::Text(self.default_reply.clone()), |(_, r)| r.clone());

        match reply {
            Reply::Text(text) => Ok(text),
            Reply::Fail(reason) => Err(BackendError::completion(reason)),
        }
    }
}

/// A search backend returning canned hits.
#[derive(Debug, Default)]
pub struct StaticSearchBackend {
    hits: Vec<SearchHit>,
    by_query: HashMap<String, Vec<SearchHit>>,
    failure: Option<String>,
    queries: Mutex<Vec<String>>,
}

impl StaticSearchBackend {
    /// Creates a backend returning `hits` for every query.
    #[must_use]
    pub fn new(hits: Vec<SearchHit>) -> Self {
        Self {
            hits,
            ..Self::default()
        }
    }

    /// Creates a backend that fails every call.
    #[must_use]
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Returns `hits` for exactly `query` instead of the default hits.
    #[must_use]
    pub fn with_hits_for(mut self, query: impl Into<String>, hits: Vec<SearchHit>) -> Self {
        self.by_query.insert(query.into(), hits);
        self
    }

    /// Returns the queries received so far.
    #[must_use]
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }

    /// Returns the number of calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.queries.lock().len()
    }
}

#[async_trait]
impl SearchBackend for StaticSearchBackend {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, BackendError> {
        self.queries.lock().push(query.to_string());

        if let Some(reason) = &self.failure {
            return Err(BackendError::search(reason.clone()));
        }
        let hits = self.by_query.get(query).unwrap_or(&self.hits);
        Ok(hits.iter().take(limit).cloned().collect())
    }
}

/// A render backend keeping documents in memory.
#[derive(Debug, Default)]
pub struct MemoryRenderBackend {
    documents: Mutex<Vec<RenderDocument>>,
    failure: Option<String>,
}

impl MemoryRenderBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend that fails every call.
    #[must_use]
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Returns every rendered document, oldest first.
    #[must_use]
    pub fn documents(&self) -> Vec<RenderDocument> {
        self.documents.lock().clone()
    }

    /// Returns the most recently rendered document.
    #[must_use]
    pub fn last_document(&self) -> Option<RenderDocument> {
        self.documents.lock().last().cloned()
    }
}

#[async_trait]
impl RenderBackend for MemoryRenderBackend {
    async fn render(&self, document: &RenderDocument) -> Result<RenderedArtifact, BackendError> {
        if let Some(reason) = &self.failure {
            return Err(BackendError::render(reason.clone()));
        }
        self.documents.lock().push(document.clone());
        Ok(RenderedArtifact::new(format!(
            "memory://paper_{}.md",
            document.artifact_id
        )))
    }
}
