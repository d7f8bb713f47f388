//! A2A (Agent-to-Agent) planner/solver protocol.
//!
//! Provides configuration and credentials, message cards, the two agents,
//! session state, the orchestration loop, and card renderers.

pub mod agents;
pub mod card;
pub mod config;
pub mod errors;
pub mod orchestrator;
pub mod session;
pub mod visualizer;

pub use agents::{A2AAgent, PlannerAgent, SolverAgent};
pub use card::{CardLog, CardRecord, MessageCard, MessageType, Participant};
pub use config::{A2AConfig, CredentialRole, DatasetKind, LLMFactory, OpenRouterFactory, OrchestrationMode};
pub use errors::A2AError;
pub use orchestrator::A2AOrchestrator;
pub use session::{AgentRole, ConversationTurn, SessionResult, StepRecord};
