//! Groq chat-completions client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::config::GroqConfig;
use crate::error::{ModelError, Result};
use crate::llm::{Llm, LlmRequest, LlmResponse, Message, Usage};

const PROVIDER: &str = "Groq";

/// An [`Llm`] backed by Groq's OpenAI-compatible API.
pub struct GroqClient {
    client: reqwest::Client,
    config: GroqConfig,
}

impl GroqClient {
    /// Create a client from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ConfigError`] if the configuration is invalid or
    /// the HTTP client cannot be built.
    pub fn new(config: GroqConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ModelError::ConfigError(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Create a client for the default model with the key from `GROQ_API_KEY`.
    pub fn from_env() -> Result<Self> {
        Self::new(GroqConfig::from_env()?)
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &GroqConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    /// Merge per-request overrides over the client configuration.
    fn build_body<'a>(&'a self, request: &'a LlmRequest) -> ChatCompletionRequest<'a> {
        let overrides = request.config.as_ref();
        ChatCompletionRequest {
            model: &self.config.model,
            messages: &request.messages,
            temperature: overrides.and_then(|c| c.temperature).or(self.config.temperature),
            top_p: overrides.and_then(|c| c.top_p),
            max_tokens: overrides.and_then(|c| c.max_output_tokens).or(self.config.max_tokens),
            stream: false,
        }
    }

    fn response_error(message: impl Into<String>) -> ModelError {
        ModelError::ResponseError { provider: PROVIDER.into(), message: message.into() }
    }
}

// ── Groq API request/response types ────────────────────────────────

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

fn into_llm_response(response: ChatCompletionResponse) -> Result<LlmResponse> {
    let usage = response.usage;
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| GroqClient::response_error("response contained no choices"))?;
    let text = choice
        .message
        .content
        .ok_or_else(|| GroqClient::response_error("first choice has no content"))?;
    Ok(LlmResponse { text, finish_reason: choice.finish_reason, usage })
}

// ── Llm implementation ─────────────────────────────────────────────

#[async_trait]
impl Llm for GroqClient {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse> {
        let body = self.build_body(&request);
        debug!(
            provider = PROVIDER,
            model = %self.config.model,
            message_count = request.messages.len(),
            "sending chat completion"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                ModelError::RequestError {
                    provider: PROVIDER.into(),
                    message: format!("request failed: {e}"),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message =
                serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);

            error!(provider = PROVIDER, %status, "API error");
            return Err(ModelError::ApiError {
                provider: PROVIDER.into(),
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            Self::response_error(format!("failed to parse response: {e}"))
        })?;
        let reply = into_llm_response(parsed)?;

        info!(
            provider = PROVIDER,
            model = %self.config.model,
            completion_tokens = reply.usage.map(|u| u.completion_tokens),
            "chat completion received"
        );
        Ok(reply)
    }
}
