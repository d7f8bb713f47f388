//! OpenRouter chat-completion provider.
//!
//! Sends OpenAI-compatible Chat Completions requests to OpenRouter and
//! parses the generated text and token usage out of the response.
//!
//! # Wire format
//!
//! Request:
//! ```text
//! POST {base_url}/chat/completions
//! {"model": ..., "messages": [{"role", "content"}], "temperature": ..., "max_tokens": ...}
//! ```
//!
//! Response:
//! ```text
//! {"choices": [{"message": {"content": ...}}],
//!  "usage": {"prompt_tokens", "completion_tokens", "total_tokens"}}
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::llms::base_llm::{validate_request, BaseLLM, LLMMessage, LLMResponse};
use crate::llms::errors::LLMError;
use crate::types::usage_metrics::TokenUsage;

/// Default OpenRouter API base URL.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Environment variable overriding [`DEFAULT_BASE_URL`].
pub const BASE_URL_ENV: &str = "OPENROUTER_BASE_URL";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Referer prefix used to attribute requests to an app.
const REFERER_PREFIX: &str = "https://github.com/nsu102/cotvsa2a";

/// Map a short model family name to an OpenRouter model id.
///
/// Unknown names are passed through unchanged so callers may use any
/// fully-qualified model id.
pub fn resolve_model_id(model_name: &str) -> &str {
    match model_name {
        "claude" => "anthropic/claude-haiku-4.5",
        "gpt" => "openai/gpt-5-mini",
        other => other,
    }
}

/// First 500 characters of a response body, for error messages.
fn preview(text: &str) -> String {
    text.chars().take(500).collect()
}

// ---------------------------------------------------------------------------
// OpenRouterCompletion provider
// ---------------------------------------------------------------------------

/// OpenRouter completion implementation over `reqwest`.
#[derive(Debug, Clone)]
pub struct OpenRouterCompletion {
    /// OpenRouter model id (after alias resolution).
    pub model: String,
    /// Application name sent as `X-Title`.
    pub app_name: String,
    /// API base URL without the trailing endpoint.
    pub base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenRouterCompletion {
    /// Create a new OpenRouter provider.
    ///
    /// # Arguments
    ///
    /// * `api_key` - OpenRouter API key for this role.
    /// * `model_name` - Model alias (`claude`, `gpt`) or full model id.
    /// * `app_name` - Application name used for attribution headers.
    pub fn new(
        api_key: impl Into<String>,
        model_name: &str,
        app_name: impl Into<String>,
    ) -> Result<Self, LLMError> {
        let base_url =
            std::env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::with_base_url(
            api_key,
            model_name,
            app_name,
            base_url,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    /// Create a provider against an explicit base URL and timeout.
    pub fn with_base_url(
        api_key: impl Into<String>,
        model_name: &str,
        app_name: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LLMError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            model: resolve_model_id(model_name).to_string(),
            app_name: app_name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Full Chat Completions endpoint URL.
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Build the request body for the Chat Completions API.
    pub fn build_request_body(
        &self,
        messages: &[LLMMessage],
        temperature: f64,
        max_tokens: u32,
    ) -> Value {
        serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": temperature,
            "max_tokens": max_tokens,
        })
    }

    /// Parse a Chat Completions response body.
    ///
    /// `choices[0].message.content` and the `usage` prompt/completion
    /// counters are required; `total_tokens` is recomputed from them.
    pub fn parse_completions_response(&self, response: &Value) -> Result<LLMResponse, LLMError> {
        let content = response
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| {
                LLMError::MalformedResponse(
                    "missing choices[0].message.content in response".to_string(),
                )
            })?;

        let usage = response
            .get("usage")
            .filter(|u| u.is_object())
            .ok_or_else(|| LLMError::MalformedResponse("missing usage in response".to_string()))?;
        let counter = |name: &str| {
            usage.get(name).and_then(|v| v.as_u64()).ok_or_else(|| {
                LLMError::MalformedResponse(format!("missing or invalid usage.{name} in response"))
            })
        };
        let prompt_tokens = counter("prompt_tokens")?;
        let completion_tokens = counter("completion_tokens")?;
        let reported_total = usage.get("total_tokens").and_then(|v| v.as_u64());

        let usage = TokenUsage::new(prompt_tokens, completion_tokens);
        if reported_total.is_some_and(|total| total != usage.total_tokens) {
            log::debug!(
                "OpenRouter reported total_tokens={:?} but prompt+completion={}; using the sum",
                reported_total,
                usage.total_tokens
            );
        }

        log::debug!(
            "OpenRouter token usage: prompt={}, completion={}, total={}",
            usage.prompt_tokens,
            usage.completion_tokens,
            usage.total_tokens,
        );

        Ok(LLMResponse {
            content: content.to_string(),
            usage,
            model: response
                .get("model")
                .and_then(|m| m.as_str())
                .unwrap_or(self.model.as_str())
                .to_string(),
        })
    }
}

#[async_trait]
impl BaseLLM for OpenRouterCompletion {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        messages: &[LLMMessage],
        temperature: f64,
        max_tokens: u32,
    ) -> Result<LLMResponse, LLMError> {
        validate_request(messages, temperature, max_tokens)?;

        log::debug!(
            "OpenRouterCompletion.complete: model={}, app={}, messages={}",
            self.model,
            self.app_name,
            messages.len(),
        );

        let body = self.build_request_body(messages, temperature, max_tokens);
        let response = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", format!("{}/{}", REFERER_PREFIX, self.app_name))
            .header("X-Title", &self.app_name)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            log::warn!(
                "OpenRouter API error {} for model {}: {}",
                status,
                self.model,
                preview(&response_text)
            );
            return Err(LLMError::Transport {
                message: format!("OpenRouter API error ({}): {}", status, response_text),
                status: Some(status.as_u16()),
            });
        }

        let response_json: Value = serde_json::from_str(&response_text).map_err(|e| {
            LLMError::MalformedResponse(format!(
                "failed to parse OpenRouter response: {} - Body: {}",
                e,
                preview(&response_text)
            ))
        })?;

        self.parse_completions_response(&response_json)
    }
}
