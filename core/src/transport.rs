use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

use crate::config::{ModelConfig, Provider};
use crate::errors::{TransientKind, TransportError, TransportResult};
use crate::types::{ChatCompletionRequest, ChatCompletionResponse, ResponseFormat, Turn};

/// A single request/response exchange with a text-generation service.
///
/// Implementations make exactly one attempt and classify the failure; retry
/// policy lives in [`crate::client::LlmClient`].
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn complete(&self, turns: &[Turn], json_format: bool) -> TransportResult<String>;
}

/// Transport for OpenAI-compatible chat completions endpoints (including Azure).
#[derive(Debug, Clone)]
pub struct OpenAiTransport {
    client: Client,
    url: String,
    model: String,
    api_key: String,
    provider: Provider,
    max_tokens: Option<u32>,
}

impl OpenAiTransport {
    pub fn new(config: &ModelConfig) -> TransportResult<Self> {
        let api_key = config.resolve_api_key().ok_or_else(|| {
            TransportError::fatal(format!(
                "API key is required for model `{}` (set it in the config or the environment)",
                config.model
            ))
        })?;

        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::fatal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: completions_url(config),
            model: config.model.clone(),
            api_key,
            provider: config.provider,
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl ChatTransport for OpenAiTransport {
    async fn complete(&self, turns: &[Turn], json_format: bool) -> TransportResult<String> {
        let request = ChatCompletionRequest {
            model: match self.provider {
                Provider::OpenAi => Some(self.model.as_str()),
                Provider::Azure => None,
            },
            messages: turns,
            response_format: ResponseFormat::new(json_format),
            max_tokens: self.max_tokens,
        };

        let builder = self.client.post(&self.url).json(&request);
        let builder = match self.provider {
            Provider::OpenAi => builder.bearer_auth(&self.api_key),
            Provider::Azure => builder.header("api-key", &self.api_key),
        };

        let response = builder.send().await.map_err(classify_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, body));
        }

        let bytes = response.bytes().await.map_err(classify_body_error)?;
        let body: ChatCompletionResponse = serde_json::from_slice(&bytes)
            .map_err(|e| TransportError::fatal(format!("Failed to parse response: {}", e)))?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| TransportError::fatal("No choices in response"))?;

        let content = choice.message.content.unwrap_or_default();
        debug!(chars = content.len(), "Received completion");
        Ok(content)
    }
}

fn completions_url(config: &ModelConfig) -> String {
    let base = config.endpoint.trim_end_matches('/');
    match config.provider {
        Provider::OpenAi => format!("{}/chat/completions", base),
        Provider::Azure => format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            base,
            config.model,
            config.api_version.as_deref().unwrap_or_default()
        ),
    }
}

/// Maps a non-success HTTP status to the transient/fatal taxonomy.
pub fn classify_status(status: StatusCode, body: String) -> TransportError {
    let message = format!("API request failed ({}): {}", status, body);
    match status.as_u16() {
        429 => TransportError::transient(TransientKind::RateLimit, message),
        408 | 504 => TransportError::transient(TransientKind::Timeout, message),
        500..=599 => TransportError::transient(TransientKind::Upstream, message),
        code => TransportError::Http {
            status_code: code,
            message,
        },
    }
}

/// Maps a reqwest failure to the transient/fatal taxonomy.
pub fn classify_reqwest_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::transient(TransientKind::Timeout, error.to_string())
    } else if error.is_connect() || error.is_body() {
        TransportError::transient(TransientKind::Connection, error.to_string())
    } else if let Some(status) = error.status() {
        classify_status(status, error.to_string())
    } else if error.is_decode() {
        TransportError::fatal(format!("Failed to parse response: {}", error))
    } else {
        TransportError::fatal(error.to_string())
    }
}

/// Nothing is parsed while the body is read, so any failure there is the
/// connection going away (or the per-request timeout firing).
fn classify_body_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::transient(TransientKind::Timeout, error.to_string())
    } else {
        TransportError::transient(
            TransientKind::Connection,
            format!("Failed to read response body: {}", error),
        )
    }
}
