//! OpenAI-compatible chat-completions backend.

use super::{CompletionBackend, CompletionRequest};
use crate::errors::BackendError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default chat-completions endpoint.
pub const DEFAULT_API_URL: &str = "https://router.huggingface.co/v1/chat/completions";

/// Default model.
pub const DEFAULT_MODEL: &str = "meta-llama/Meta-Llama-3-8B-Instruct";

/// Environment variable holding the bearer token.
pub const API_TOKEN_ENV: &str = "HUGGINGFACEHUB_API_TOKEN";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 1],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Text-generation backend over an OpenAI-compatible HTTP API.
#[derive(Clone)]
pub struct ChatCompletionBackend {
    http: Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
}

impl fmt::Debug for ChatCompletionBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatCompletionBackend")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

impl ChatCompletionBackend {
    /// Creates a backend for `model` at `api_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_url: impl Into<String>, model: impl Into<String>) -> Result<Self, BackendError> {
        let http = Client::builder()
            .user_agent(concat!("paperflow/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            http,
            api_url: api_url.into(),
            api_key: None,
            model: model.into(),
        })
    }

    /// Creates a backend with the default endpoint and model, reading the
    /// bearer token from [`API_TOKEN_ENV`].
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_env() -> Result<Self, BackendError> {
        let backend = Self::new(DEFAULT_API_URL, DEFAULT_MODEL)?;
        Ok(match std::env::var(API_TOKEN_ENV) {
            Ok(token) if !token.trim().is_empty() => backend.with_api_key(token),
            _ => {
                tracing::warn!(env = API_TOKEN_ENV, "No API token set, sending unauthenticated requests");
                backend
            }
        })
    }

    /// Sets the bearer token.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Returns the model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionBackend for ChatCompletionBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [Message {
                role: "user",
                content: &request.prompt,
            }],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let mut builder = self.http.post(&self.api_url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            let preview: String = text.chars().take(200).collect();
            return Err(BackendError::completion(format!("HTTP {status}: {preview}")));
        }

        extract_content(&text)
    }
}

fn extract_content(raw: &str) -> Result<String, BackendError> {
    let parsed: ChatResponse = serde_json::from_str(raw)
        .map_err(|e| BackendError::Parse(format!("chat response: {e}")))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| BackendError::Parse("chat response has no content".to_string()))
}
