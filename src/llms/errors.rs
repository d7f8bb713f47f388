//! Completion gateway errors.

use thiserror::Error;

/// Errors raised by a single completion call.
///
/// Every variant is terminal for the call that produced it; providers do
/// not retry internally.
#[derive(Debug, Error)]
pub enum LLMError {
    /// The request violated a gateway precondition and was never sent.
    #[error("Invalid completion request: {0}")]
    InvalidRequest(String),

    /// Network failure, timeout, or a non-2xx HTTP status.
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        /// HTTP status code, when the server answered at all.
        status: Option<u16>,
    },

    /// The provider answered 2xx but the payload lacked the expected fields.
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

impl LLMError {
    /// Build a transport error without an HTTP status.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            status: None,
        }
    }

    /// Whether this error came from the network layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

impl From<reqwest::Error> for LLMError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport {
            status: err.status().map(|s| s.as_u16()),
            message: if err.is_timeout() {
                format!("request timed out: {err}")
            } else {
                err.to_string()
            },
        }
    }
}
