//! Remote summarization providers.
//!
//! The pipeline only sees [`SummarizationClient`]: one atomic request/response call that turns
//! text plus an instruction into a summary. Two HTTP adapters are provided, an OpenAI-compatible
//! chat completions client (Groq by default) and an Ollama client. Both decode the full response
//! body; streaming is not used.

use crate::config::{Config, SummarizationProvider};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by a single remote summarization call.
#[derive(Debug, Error)]
pub enum SummarizationClientError {
    /// Provider could not be reached or the endpoint does not exist.
    #[error("Summarization provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate summary: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
    /// Provider answered without any summary text.
    #[error("Provider returned an empty summary")]
    EmptyContent,
    /// Call exceeded its deadline.
    #[error("Summarization call timed out after {0:?}")]
    Timeout(Duration),
    /// Client could not be constructed from configuration.
    #[error("Invalid summarization client configuration: {0}")]
    Configuration(String),
}

impl SummarizationClientError {
    /// Whether the failure was a deadline expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// One remote summarization call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummarizationRequest {
    /// Text to summarize.
    pub text: String,
    /// System-level instruction describing the kind of summary wanted.
    pub instruction: String,
}

/// Interface implemented by remote summarization providers.
#[async_trait]
pub trait SummarizationClient: Send + Sync {
    /// Summarize `request.text` following `request.instruction`.
    async fn summarize(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError>;
}

/// Build the summarization client selected by configuration.
pub fn build_summarization_client(
    config: &Config,
) -> Result<Arc<dyn SummarizationClient>, SummarizationClientError> {
    let timeout = config.call_timeout();
    let http = Client::builder()
        .user_agent("rusty-digest/summary")
        .timeout(timeout)
        .build()
        .map_err(|error| SummarizationClientError::Configuration(error.to_string()))?;

    match config.summarization_provider {
        SummarizationProvider::OpenAI => {
            let api_key = config.summarization_api_key.clone().ok_or_else(|| {
                SummarizationClientError::Configuration("missing API key".into())
            })?;
            Ok(Arc::new(OpenAiCompatibleClient {
                http,
                base_url: config.summarization_base_url.clone(),
                api_key,
                model: config.summarization_model.clone(),
                timeout,
            }))
        }
        SummarizationProvider::Ollama => Ok(Arc::new(OllamaSummarizationClient {
            http,
            base_url: config.summarization_base_url.clone(),
            model: config.summarization_model.clone(),
            timeout,
        })),
    }
}

fn non_empty(text: &str) -> Result<String, SummarizationClientError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(SummarizationClientError::EmptyContent)
    } else {
        Ok(trimmed.to_string())
    }
}

/// Deadline expiries keep their own variant so callers can answer 504 instead of 502.
fn map_send_error(
    base_url: &str,
    timeout: Duration,
    error: reqwest::Error,
) -> SummarizationClientError {
    if error.is_timeout() {
        tracing::debug!(base_url, ?timeout, "Provider request timed out");
        return SummarizationClientError::Timeout(timeout);
    }
    SummarizationClientError::ProviderUnavailable(format!(
        "failed to reach {base_url}: {error}"
    ))
}

fn map_decode_error(
    what: &str,
    timeout: Duration,
    error: reqwest::Error,
) -> SummarizationClientError {
    if error.is_timeout() {
        return SummarizationClientError::Timeout(timeout);
    }
    SummarizationClientError::InvalidResponse(format!("failed to decode {what}: {error}"))
}

async fn check_status(
    response: reqwest::Response,
    endpoint: &str,
) -> Result<reqwest::Response, SummarizationClientError> {
    if response.status() == StatusCode::NOT_FOUND {
        return Err(SummarizationClientError::ProviderUnavailable(format!(
            "endpoint {endpoint} returned 404"
        )));
    }
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(SummarizationClientError::GenerationFailed(format!(
            "provider returned {status}: {body}"
        )));
    }
    Ok(response)
}

struct OpenAiCompatibleClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl OpenAiCompatibleClient {
    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl SummarizationClient for OpenAiCompatibleClient {
    async fn summarize(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError> {
        let payload = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.instruction },
                { "role": "user", "content": request.text },
            ],
            "stream": false,
        });

        let endpoint = self.endpoint();
        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| map_send_error(&self.base_url, self.timeout, error))?;
        let response = check_status(response, &endpoint).await?;

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|error| map_decode_error("chat completion", self.timeout, error))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| SummarizationClientError::InvalidResponse("no choices returned".into()))?
            .message
            .content
            .unwrap_or_default();
        non_empty(&content)
    }
}

struct OllamaSummarizationClient {
    http: Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OllamaSummarizationClient {
    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl SummarizationClient for OllamaSummarizationClient {
    async fn summarize(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError> {
        let payload = json!({
            "model": self.model,
            "prompt": format!("{}\n\n{}", request.instruction, request.text),
            "stream": false,
            "options": {
                // Lower temperature for deterministic summaries.
                "temperature": 0.1,
            }
        });

        let endpoint = self.endpoint();
        let response = self
            .http
            .post(&endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|error| map_send_error(&self.base_url, self.timeout, error))?;
        let response = check_status(response, &endpoint).await?;

        let body: OllamaResponse = response
            .json()
            .await
            .map_err(|error| map_decode_error("Ollama response", self.timeout, error))?;

        if !body.done {
            return Err(SummarizationClientError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        non_empty(&body.response)
    }
}
