//! # cotvsa2a
//!
//! Benchmarks single-agent chain-of-thought prompting against a two-agent
//! planner/solver protocol (A2A) on math and multi-hop QA datasets.
//!
//! The core is the A2A orchestration loop: a bounded conversation in which a
//! planner delegates subtasks to a solver, each exchange logged as a
//! structured message card, until the planner answers or the turn budget
//! runs out.

pub mod a2a;
pub mod agents;
pub mod baseline;
pub mod bench;
pub mod llms;
pub mod server;
pub mod types;
pub mod utilities;

// Re-exports
pub use a2a::{A2AError, A2AOrchestrator, MessageCard, SessionResult};
pub use agents::parser::Decision;
pub use llms::base_llm::BaseLLM;
pub use types::usage_metrics::TokenUsage;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
