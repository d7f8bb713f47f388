//! A2A configuration: dataset budgets, credentials, and gateway factories.
//!
//! Credentials are resolved per role and model family from environment
//! variables, e.g. `OPENROUTER_API_KEY_A2A_PLAN_CLAUDE`. A missing key is a
//! configuration error raised before any network call.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::a2a::errors::A2AError;
use crate::llms::base_llm::BaseLLM;
use crate::llms::providers::openrouter::OpenRouterCompletion;

// ---------------------------------------------------------------------------
// Datasets
// ---------------------------------------------------------------------------

/// Benchmark dataset, selecting the turn budget and prompt variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DatasetKind {
    Gsm8k,
    Math500,
    Math500Algebra,
    HotpotQa,
    TwoWikiMultihopQa,
    /// Any other dataset name; uses the default budget.
    Other(String),
}

impl DatasetKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Gsm8k => "gsm8k",
            Self::Math500 => "math500",
            Self::Math500Algebra => "math500_algebra",
            Self::HotpotQa => "hotpotqa",
            Self::TwoWikiMultihopQa => "2wikimultihopqa",
            Self::Other(name) => name,
        }
    }

    /// Whether questions need several retrieval hops over a context.
    pub fn is_multi_hop(&self) -> bool {
        matches!(self, Self::HotpotQa | Self::TwoWikiMultihopQa)
    }

    /// Whether numeric answers may be compared with a tolerance.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Gsm8k | Self::Math500Algebra)
    }

    /// Planner turn budget: 5 for multi-hop QA and algebra, 3 otherwise.
    pub fn max_turns(&self) -> usize {
        if self.is_multi_hop() || *self == Self::Math500Algebra {
            5
        } else {
            3
        }
    }
}

impl FromStr for DatasetKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "gsm8k" => Self::Gsm8k,
            "math500" => Self::Math500,
            "math500_algebra" => Self::Math500Algebra,
            "hotpotqa" => Self::HotpotQa,
            "2wikimultihopqa" => Self::TwoWikiMultihopQa,
            other => Self::Other(other.to_string()),
        })
    }
}

impl From<&str> for DatasetKind {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(kind) => kind,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Orchestration settings
// ---------------------------------------------------------------------------

/// Which orchestration variant to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestrationMode {
    /// Bounded planner/solver loop.
    #[default]
    MultiTurn,
    /// One planning step followed by one solving step.
    SingleRound,
}

/// Settings for one orchestration run.
#[derive(Debug, Clone, PartialEq)]
pub struct A2AConfig {
    pub dataset: DatasetKind,
    /// Maximum planner turns in the multi-turn loop.
    pub max_turns: usize,
    pub planner_temperature: f64,
    pub planner_max_tokens: u32,
    pub solver_temperature: f64,
    pub solver_max_tokens: u32,
    pub single_round_planner_max_tokens: u32,
    pub single_round_solver_max_tokens: u32,
}

impl A2AConfig {
    /// Defaults for `dataset`.
    pub fn for_dataset(dataset: impl Into<DatasetKind>) -> Self {
        let dataset = dataset.into();
        Self {
            max_turns: dataset.max_turns(),
            dataset,
            planner_temperature: 0.3,
            planner_max_tokens: 512,
            solver_temperature: 0.3,
            solver_max_tokens: 1024,
            single_round_planner_max_tokens: 256,
            single_round_solver_max_tokens: 512,
        }
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Role a credential is issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialRole {
    A2APlanner,
    A2ASolver,
    Cot,
    NoCot,
}

impl CredentialRole {
    fn key_prefix(&self) -> &'static str {
        match self {
            Self::A2APlanner => "OPENROUTER_API_KEY_A2A_PLAN",
            Self::A2ASolver => "OPENROUTER_API_KEY_A2A_SOLVER",
            Self::Cot => "OPENROUTER_API_KEY_COT",
            Self::NoCot => "OPENROUTER_API_KEY_NO_COT",
        }
    }

    /// Environment variable holding the key for `model_name`.
    pub fn env_var(&self, model_name: &str) -> String {
        format!("{}_{}", self.key_prefix(), model_name.to_uppercase())
    }

    /// Application name reported to the provider.
    pub fn app_name(&self, dataset: &str) -> String {
        let prefix = match self {
            Self::A2APlanner => "a2a_planner",
            Self::A2ASolver => "a2a_solver",
            Self::Cot => "cot",
            Self::NoCot => "no_cot",
        };
        format!("{}_{}", prefix, dataset)
    }
}

/// Resolve the API key for `role` and `model_name` through `lookup`.
pub fn resolve_api_key<F>(
    role: CredentialRole,
    model_name: &str,
    lookup: F,
) -> Result<String, A2AError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = role.env_var(model_name);
    lookup(&var)
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| A2AError::Configuration(format!("Missing API key: {}", var)))
}

// ---------------------------------------------------------------------------
// Gateway factories
// ---------------------------------------------------------------------------

/// Builds the completion gateway for a role, model family, and dataset.
pub trait LLMFactory: Send + Sync {
    fn build(
        &self,
        role: CredentialRole,
        model_name: &str,
        dataset: &str,
    ) -> Result<Arc<dyn BaseLLM>, A2AError>;
}

type KeyLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Factory producing [`OpenRouterCompletion`] gateways.
#[derive(Clone)]
pub struct OpenRouterFactory {
    lookup: KeyLookup,
}

impl OpenRouterFactory {
    /// Resolve keys from the process environment.
    pub fn from_env() -> Self {
        Self {
            lookup: Arc::new(|var| std::env::var(var).ok()),
        }
    }

    /// Resolve keys through a custom lookup.
    pub fn with_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            lookup: Arc::new(lookup),
        }
    }
}

impl fmt::Debug for OpenRouterFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenRouterFactory").finish_non_exhaustive()
    }
}

impl LLMFactory for OpenRouterFactory {
    fn build(
        &self,
        role: CredentialRole,
        model_name: &str,
        dataset: &str,
    ) -> Result<Arc<dyn BaseLLM>, A2AError> {
        let api_key = resolve_api_key(role, model_name, |var| (self.lookup)(var))?;
        let provider = OpenRouterCompletion::new(api_key, model_name, role.app_name(dataset))
            .map_err(|e| A2AError::Configuration(e.to_string()))?;
        Ok(Arc::new(provider))
    }
}
