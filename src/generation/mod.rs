//! Language model clients used for answer synthesis.
//!
//! Both adapters issue plain HTTP requests through `reqwest`, mirroring the embedding
//! providers. Output text is returned exactly as the model produced it.

use crate::config::{Config, GenerationProvider};
use crate::error::ErrorKind;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Errors surfaced while calling the language model.
#[derive(Debug, Error)]
pub enum GenerationClientError {
    /// Provider was unreachable or not configured.
    #[error("Generation provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate answer: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

impl GenerationClientError {
    /// Caller-facing classification.
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::GenerationService
    }
}

/// Request payload passed to the language model.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Model identifier understood by the provider.
    pub model: String,
    /// Fully assembled prompt.
    pub prompt: String,
    /// Sampling temperature.
    pub temperature: f32,
}

/// Interface implemented by language model providers.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Complete `request.prompt` and return the raw model output.
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationClientError>;
}

/// Generation client shared by answer synthesizers.
pub type SharedGenerationClient = Arc<dyn GenerationClient>;

/// Build a generation client based on configuration.
pub fn build_generation_client(
    config: &Config,
) -> Result<SharedGenerationClient, GenerationClientError> {
    let timeout = Duration::from_secs(config.http_timeout_secs);
    match config.generation_provider {
        GenerationProvider::Ollama => {
            let base_url = config
                .ollama_url
                .clone()
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
            Ok(Arc::new(OllamaGenerationClient::new(base_url, timeout)?))
        }
        GenerationProvider::OpenAI => {
            let api_key = config.openai_api_key.clone().ok_or_else(|| {
                GenerationClientError::ProviderUnavailable(
                    "OPENAI_API_KEY is required for the openai generation provider".into(),
                )
            })?;
            let base_url = config
                .openai_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string());
            Ok(Arc::new(OpenAIGenerationClient::new(
                base_url, api_key, timeout,
            )?))
        }
    }
}

fn http_client(timeout: Duration) -> Result<Client, GenerationClientError> {
    Client::builder()
        .user_agent("rusty-docs/answer")
        .timeout(timeout)
        .build()
        .map_err(|error| {
            GenerationClientError::ProviderUnavailable(format!(
                "failed to construct HTTP client: {error}"
            ))
        })
}

async fn check_status(
    response: Response,
    endpoint: &str,
) -> Result<Response, GenerationClientError> {
    if response.status() == StatusCode::NOT_FOUND {
        return Err(GenerationClientError::ProviderUnavailable(format!(
            "endpoint {endpoint} returned 404"
        )));
    }

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(GenerationClientError::GenerationFailed(format!(
            "provider returned {status}: {body}"
        )));
    }

    Ok(response)
}

/// Ollama completion client (`POST /api/generate`, non-streaming).
pub struct OllamaGenerationClient {
    http: Client,
    base_url: String,
}

impl OllamaGenerationClient {
    /// Build a client targeting `base_url`.
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, GenerationClientError> {
        Ok(Self {
            http: http_client(timeout)?,
            base_url,
        })
    }

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
impl GenerationClient for OllamaGenerationClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationClientError> {
        let endpoint = self.endpoint();
        let payload = json!({
            "model": request.model,
            "prompt": request.prompt,
            "stream": false,
            "options": {
                "temperature": request.temperature,
            }
        });

        let response = self
            .http
            .post(&endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                GenerationClientError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        let body: OllamaResponse = check_status(response, &endpoint)
            .await?
            .json()
            .await
            .map_err(|error| {
                GenerationClientError::InvalidResponse(format!(
                    "failed to decode Ollama response: {error}"
                ))
            })?;

        if !body.done {
            return Err(GenerationClientError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response)
    }
}

/// OpenAI-compatible chat completions client (`POST /chat/completions`).
pub struct OpenAIGenerationClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl OpenAIGenerationClient {
    /// Build a client targeting `base_url` (for example `https://api.openai.com/v1`).
    pub fn new(
        base_url: String,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, GenerationClientError> {
        Ok(Self {
            http: http_client(timeout)?,
            base_url,
            api_key,
        })
    }

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
impl GenerationClient for OpenAIGenerationClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationClientError> {
        let endpoint = self.endpoint();
        let payload = json!({
            "model": request.model,
            "temperature": request.temperature,
            "messages": [
                { "role": "user", "content": request.prompt }
            ]
        });

        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                GenerationClientError::ProviderUnavailable(format!(
                    "failed to reach chat completions API at {}: {error}",
                    self.base_url
                ))
            })?;

        let body: ChatCompletionResponse = check_status(response, &endpoint)
            .await?
            .json()
            .await
            .map_err(|error| {
                GenerationClientError::InvalidResponse(format!(
                    "failed to decode chat completion: {error}"
                ))
            })?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                GenerationClientError::InvalidResponse("completion contained no message".into())
            })
    }
}
