//! Base completion gateway trait.
//!
//! Provides the [`BaseLLM`] trait every completion provider implements,
//! the chat message type sent to it, and the request precondition checks
//! shared by all providers.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::errors::LLMError;
use crate::types::usage_metrics::TokenUsage;

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Role of a chat message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A single message in an LLM conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LLMMessage {
    pub role: MessageRole,
    pub content: String,
}

impl LLMMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// Generated text plus usage counters for one completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LLMResponse {
    pub content: String,
    pub usage: TokenUsage,
    /// Provider-side model identifier that served the request.
    pub model: String,
}

// ---------------------------------------------------------------------------
// BaseLLM trait
// ---------------------------------------------------------------------------

/// A remote chat-completion capability.
///
/// Implementations send one request per call, keep no conversational
/// state between calls, and never retry; retry policy belongs to callers.
#[async_trait]
pub trait BaseLLM: Send + Sync + fmt::Debug {
    /// Get the model identifier/name.
    fn model(&self) -> &str;

    /// Send `messages` and return the generated text with its token usage.
    ///
    /// # Errors
    ///
    /// - [`LLMError::InvalidRequest`] when the preconditions of
    ///   [`validate_request`] fail.
    /// - [`LLMError::Transport`] on network failure or non-2xx status.
    /// - [`LLMError::MalformedResponse`] when the payload lacks content.
    async fn complete(
        &self,
        messages: &[LLMMessage],
        temperature: f64,
        max_tokens: u32,
    ) -> Result<LLMResponse, LLMError>;
}

/// Check the gateway preconditions shared by every provider.
pub fn validate_request(
    messages: &[LLMMessage],
    temperature: f64,
    max_tokens: u32,
) -> Result<(), LLMError> {
    if messages.is_empty() {
        return Err(LLMError::InvalidRequest(
            "messages must not be empty".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&temperature) {
        return Err(LLMError::InvalidRequest(format!(
            "temperature {temperature} is outside [0, 1]"
        )));
    }
    if max_tokens == 0 {
        return Err(LLMError::InvalidRequest(
            "max_tokens must be greater than zero".to_string(),
        ));
    }
    Ok(())
}
