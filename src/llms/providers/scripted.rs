//! Scripted completion provider.
//!
//! Replays a fixed queue of replies (or failures) in order and records every
//! request it receives. Lets tests run the agents without a network.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::llms::base_llm::{validate_request, BaseLLM, LLMMessage, LLMResponse};
use crate::llms::errors::LLMError;
use crate::types::usage_metrics::TokenUsage;

/// One scripted outcome.
#[derive(Debug)]
pub enum ScriptStep {
    Reply(String),
    Fail(LLMError),
}

/// A request observed by [`ScriptedCompletion`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub messages: Vec<LLMMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Completion provider that replays a script.
#[derive(Debug)]
pub struct ScriptedCompletion {
    model: String,
    usage: TokenUsage,
    script: Mutex<VecDeque<ScriptStep>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedCompletion {
    /// Create a provider replying with `replies` in order.
    ///
    /// Every reply reports 10 prompt and 5 completion tokens unless
    /// overridden with [`with_usage`](Self::with_usage).
    pub fn new<I, S>(model: impl Into<String>, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            model: model.into(),
            usage: TokenUsage::new(10, 5),
            script: Mutex::new(
                replies
                    .into_iter()
                    .map(|r| ScriptStep::Reply(r.into()))
                    .collect(),
            ),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Set the usage reported for every reply.
    pub fn with_usage(mut self, prompt_tokens: u64, completion_tokens: u64) -> Self {
        self.usage = TokenUsage::new(prompt_tokens, completion_tokens);
        self
    }

    /// Append a step to the end of the script.
    pub fn push(&self, step: ScriptStep) {
        self.script.lock().push_back(step);
    }

    /// Requests received so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Number of script steps not consumed yet.
    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

#[async_trait]
impl BaseLLM for ScriptedCompletion {
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

        self.calls.lock().push(RecordedCall {
            messages: messages.to_vec(),
            temperature,
            max_tokens,
        });

        match self.script.lock().pop_front() {
            Some(ScriptStep::Reply(content)) => Ok(LLMResponse {
                content,
                usage: self.usage,
                model: self.model.clone(),
            }),
            Some(ScriptStep::Fail(err)) => Err(err),
            None => Err(LLMError::transport(format!(
                "script for {} exhausted",
                self.model
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order_and_records_calls() {
        let llm = ScriptedCompletion::new("scripted", ["first", "second"]).with_usage(3, 4);
        let msgs = vec![LLMMessage::user("hello")];

        let a = llm.complete(&msgs, 0.3, 16).await.unwrap();
        let b = llm.complete(&msgs, 0.0, 32).await.unwrap();
        assert_eq!(a.content, "first");
        assert_eq!(b.content, "second");
        assert_eq!(b.usage.total_tokens, 7);

        let calls = llm.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].max_tokens, 32);
        assert_eq!(llm.remaining(), 0);
    }

    #[tokio::test]
    async fn test_exhausted_script_and_failures() {
        let llm = ScriptedCompletion::new("scripted", Vec::<String>::new());
        llm.push(ScriptStep::Fail(LLMError::MalformedResponse("bad".into())));
        let msgs = vec![LLMMessage::user("hello")];

        assert!(matches!(
            llm.complete(&msgs, 0.3, 16).await,
            Err(LLMError::MalformedResponse(_))
        ));
        assert!(llm.complete(&msgs, 0.3, 16).await.unwrap_err().is_transport());
    }
}
