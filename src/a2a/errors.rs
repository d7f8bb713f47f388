//! A2A session errors.
//!
//! Extraction ambiguity never appears here: an unparseable planner turn is
//! recovered inside the orchestration loop. Everything below is fatal for
//! the session that raised it.

use thiserror::Error;

use crate::llms::errors::LLMError;

/// Errors surfaced by an orchestration session or its setup.
#[derive(Debug, Error)]
pub enum A2AError {
    /// Missing credential or model mapping; raised before any network call.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The inbound request is unusable (e.g. an empty question).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Gateway network/HTTP failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Provider payload missing expected fields.
    #[error("Malformed upstream response: {0}")]
    MalformedResponse(String),
}

impl A2AError {
    /// Stable machine-readable name of the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Transport(_) => "transport",
            Self::MalformedResponse(_) => "malformed_response",
        }
    }
}

impl From<LLMError> for A2AError {
    fn from(err: LLMError) -> Self {
        match err {
            LLMError::InvalidRequest(msg) => Self::InvalidRequest(msg),
            LLMError::Transport { .. } => Self::Transport(err.to_string()),
            LLMError::MalformedResponse(msg) => Self::MalformedResponse(msg),
        }
    }
}
