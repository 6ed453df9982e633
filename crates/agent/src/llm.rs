use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use tripsmith_core::config::LlmConfig;

use crate::retry::RetryRunner;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not decode provider response: {0}")]
    Decode(String),
    #[error("provider returned no text")]
    EmptyResponse,
}

impl LlmError {
    /// Only transport hiccups and server-side failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Decode(_) | Self::EmptyResponse => false,
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Text generation against the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    http: Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    retry: RetryRunner,
}

impl GeminiClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| LlmError::Transport(error.to_string()))?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            retry: RetryRunner::new(config.retry_policy()),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    async fn generate_once(&self, prompt: &str) -> Result<String, LlmError> {
        let request = GenerateContentRequest {
            contents: vec![Content { parts: vec![Part { text: prompt.to_string() }] }],
        };

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|error| LlmError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status: status.as_u16(), body });
        }

        let payload: GenerateContentResponse =
            response.json().await.map_err(|error| LlmError::Decode(error.to_string()))?;
        payload.first_text().ok_or(LlmError::EmptyResponse)
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        debug!(
            event_name = "planner.llm.request",
            model = %self.model,
            prompt_chars = prompt.chars().count(),
            "sending generation request"
        );
        self.retry
            .run("llm.generate_content", LlmError::is_retryable, || self.generate_once(prompt))
            .await
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

impl GenerateContentResponse {
    fn first_text(&self) -> Option<String> {
        let candidate = self.candidates.first()?;
        let text =
            candidate.content.parts.iter().map(|part| part.text.as_str()).collect::<String>();
        (!text.is_empty()).then_some(text)
    }
}
