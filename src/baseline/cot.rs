//! Chain-of-thought baseline.
//!
//! One completion per question, either asking the model to reason step by
//! step (`cot`) or to answer directly (`no_cot`).

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::a2a::config::{CredentialRole, DatasetKind, LLMFactory};
use crate::a2a::errors::A2AError;
use crate::llms::base_llm::{BaseLLM, LLMMessage};
use crate::types::usage_metrics::TokenUsage;

const TEMPERATURE: f64 = 0.3;

/// Answer and usage from one baseline call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CotOutput {
    pub answer: String,
    pub usage: TokenUsage,
}

/// Single-agent baseline over one gateway.
#[derive(Debug, Clone)]
pub struct CotBaseline {
    llm: Arc<dyn BaseLLM>,
    dataset: DatasetKind,
    use_cot: bool,
}

impl CotBaseline {
    pub fn new(llm: Arc<dyn BaseLLM>, dataset: impl Into<DatasetKind>, use_cot: bool) -> Self {
        Self {
            llm,
            dataset: dataset.into(),
            use_cot,
        }
    }

    /// Build the gateway through `factory` with the `cot` or `no_cot` key.
    pub fn from_factory(
        factory: &dyn LLMFactory,
        model_name: &str,
        dataset: &str,
        use_cot: bool,
    ) -> Result<Self, A2AError> {
        let role = if use_cot {
            CredentialRole::Cot
        } else {
            CredentialRole::NoCot
        };
        let llm = factory.build(role, model_name, dataset)?;
        Ok(Self::new(llm, dataset, use_cot))
    }

    /// Method label used in results and checkpoints.
    pub fn method(&self) -> &'static str {
        if self.use_cot {
            "cot"
        } else {
            "no_cot"
        }
    }

    pub fn max_tokens(&self) -> u32 {
        if self.dataset == DatasetKind::Math500Algebra {
            4096
        } else {
            2048
        }
    }

    pub fn prompt(&self, question: &str, context: Option<&str>) -> String {
        let context_block = context
            .filter(|c| !c.trim().is_empty())
            .map(|c| format!("\nContext: {}\n", c))
            .unwrap_or_default();

        let instruction = if self.use_cot {
            "Think step by step.\n\nAfter your reasoning, provide the final answer."
        } else {
            "Provide ONLY the final answer. no explanation or reasoning.\n"
        };

        format!(
            "You are an expert QA/math assistant.\n\n{context_block}\nQuestion: {question}\n\n{instruction}\nFormat: Answer: [your answer]"
        )
    }

    pub async fn run(&self, question: &str, context: Option<&str>) -> Result<CotOutput, A2AError> {
        if question.trim().is_empty() {
            return Err(A2AError::InvalidRequest("question must not be empty".into()));
        }

        let messages = [LLMMessage::user(self.prompt(question, context))];
        let response = self
            .llm
            .complete(&messages, TEMPERATURE, self.max_tokens())
            .await?;

        log::debug!(
            "{} baseline answered with {} tokens",
            self.method(),
            response.usage.total_tokens
        );

        Ok(CotOutput {
            answer: response.content,
            usage: response.usage,
        })
    }
}
