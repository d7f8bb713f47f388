//! Planner and solver agents.
//!
//! The agent set is closed: the orchestrator holds one [`PlannerAgent`] and
//! one [`SolverAgent`]. Each pairs a completion gateway with the prompts for
//! its role.

use std::sync::Arc;

use async_trait::async_trait;

use crate::a2a::session::AgentRole;
use crate::llms::base_llm::{BaseLLM, LLMMessage, LLMResponse};
use crate::llms::errors::LLMError;

/// Corrective message sent after an unparseable first planner turn.
pub const JSON_ACTION_REMINDER: &str =
    r#"ERROR: You must provide a JSON action. Format: {"action": "call_solver", "subtask": "..."}"#;

/// Common surface of the two agents.
#[async_trait]
pub trait A2AAgent: Send + Sync {
    fn role(&self) -> AgentRole;

    fn llm(&self) -> &Arc<dyn BaseLLM>;

    /// Send `messages` to this agent's gateway.
    async fn respond(
        &self,
        messages: &[LLMMessage],
        temperature: f64,
        max_tokens: u32,
    ) -> Result<LLMResponse, LLMError> {
        log::debug!(
            "{} -> {} ({} messages, max_tokens={})",
            self.role(),
            self.llm().model(),
            messages.len(),
            max_tokens
        );
        self.llm().complete(messages, temperature, max_tokens).await
    }
}

// ---------------------------------------------------------------------------
// Planner
// ---------------------------------------------------------------------------

/// Breaks a question into subtasks and decides when to answer.
#[derive(Debug, Clone)]
pub struct PlannerAgent {
    llm: Arc<dyn BaseLLM>,
}

impl PlannerAgent {
    pub fn new(llm: Arc<dyn BaseLLM>) -> Self {
        Self { llm }
    }

    /// Opening prompt for the multi-turn loop.
    pub fn initial_prompt(&self, question: &str, context: Option<&str>) -> String {
        format!(
            r#"You are a planning agent in an A2A (Agent-to-Agent) system.
{context}
Question: {question}

IMPORTANT: Break down this task and delegate subtasks to the solver agent.

You may call the solver multiple times to collect intermediate results.
Each time, respond strictly in JSON (no explanations or extra text):
{{"action": "call_solver", "subtask": "<describe a specific intermediate computation or lookup>"}}

When you have enough information, return:
{{"action": "final_answer", "answer": "<final answer>"}}

In the first turn, you should call the solver unless the answer is immediately obvious.

Provide the JSON action now."#,
            context = context_section(context),
        )
    }

    /// Prompt asking for exactly one subtask.
    pub fn single_round_prompt(&self, question: &str, context: Option<&str>) -> String {
        format!(
            r#"You are a planning agent in an A2A system.
{context}
Question: {question}

Identify ONE key subtask for the solver agent.

Respond in JSON only:
{{"action": "call_solver", "subtask": "<main computation or reasoning needed>"}}"#,
            context = context_section(context),
        )
    }

    /// Message relaying a solver result. `final_turn` demands an answer.
    pub fn follow_up(&self, solver_result: &str, final_turn: bool) -> String {
        if final_turn {
            format!(
                r#"Solver result: {solver_result}

Final turn. Provide the answer now in JSON:
{{"action": "final_answer", "answer": "<answer>"}}"#
            )
        } else {
            format!(
                r#"Solver result: {solver_result}

Now decide. Respond strictly in JSON (no extra text):
- If you need another subtask: {{"action": "call_solver", "subtask": "<next subtask>"}}
- If you can answer now: {{"action": "final_answer", "answer": "<answer>"}}

Provide JSON action:"#
            )
        }
    }
}

impl A2AAgent for PlannerAgent {
    fn role(&self) -> AgentRole {
        AgentRole::Planner
    }

    fn llm(&self) -> &Arc<dyn BaseLLM> {
        &self.llm
    }
}

// ---------------------------------------------------------------------------
// Solver
// ---------------------------------------------------------------------------

/// Answers one subtask at a time, without conversation memory.
#[derive(Debug, Clone)]
pub struct SolverAgent {
    llm: Arc<dyn BaseLLM>,
}

impl SolverAgent {
    pub fn new(llm: Arc<dyn BaseLLM>) -> Self {
        Self { llm }
    }

    pub fn prompt(&self, subtask: &str, question: &str, context: Option<&str>) -> String {
        let context_block = context
            .map(|c| format!("\nContext (search this carefully):\n{}\n", c))
            .unwrap_or_default();
        format!(
            r#"You are a solver agent.

Your task: {subtask}
{context_block}
Original question: {question}

Instructions:
1. Complete the specific subtask requested
2. Provide only the minimal answer needed
3. Be extremely concise - one sentence or number
4. If information not found in context, say "Not found"

Your answer:"#
        )
    }

    pub fn single_round_prompt(
        &self,
        subtask: &str,
        question: &str,
        context: Option<&str>,
    ) -> String {
        let context_block = context
            .map(|c| format!("\nContext (search carefully):\n{}\n", c))
            .unwrap_or_default();
        format!(
            r#"You are a solver agent.

Task: {subtask}
{context_block}
Original question: {question}

Provide a concise answer (one sentence or number).

Answer:"#
        )
    }
}

impl A2AAgent for SolverAgent {
    fn role(&self) -> AgentRole {
        AgentRole::Solver
    }

    fn llm(&self) -> &Arc<dyn BaseLLM> {
        &self.llm
    }
}

fn context_section(context: Option<&str>) -> String {
    context
        .map(|c| format!("\nContext: {}\n", c))
        .unwrap_or_default()
}
