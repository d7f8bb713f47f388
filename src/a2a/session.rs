//! Conversation state and results for one A2A session.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::a2a::card::{CardLog, CardRecord, MessageCard};
use crate::types::usage_metrics::TokenUsage;

/// Answer reported when a session ends without any usable text.
pub const NO_ANSWER: &str = "No answer generated";

/// Which agent produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Planner,
    Solver,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planner => "planner",
            Self::Solver => "solver",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded agent output.
///
/// `turn_index` is the 1-based loop turn, so a planner turn and the solver
/// turn it triggered share an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub turn_index: usize,
    pub role: AgentRole,
    pub text: String,
    pub token_usage: TokenUsage,
}

/// Compact per-turn view returned over HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub turn: usize,
    pub agent: AgentRole,
    pub content: String,
    pub tokens: u64,
}

impl From<&ConversationTurn> for StepRecord {
    fn from(turn: &ConversationTurn) -> Self {
        Self {
            turn: turn.turn_index,
            agent: turn.role,
            content: turn.text.clone(),
            tokens: turn.token_usage.total_tokens,
        }
    }
}

/// Outcome of a finished session.
#[derive(Debug, Clone)]
pub struct SessionResult {
    pub session_id: Uuid,
    /// Never empty.
    pub final_answer: String,
    /// Sum of every turn's usage.
    pub totals: TokenUsage,
    pub turns: Vec<ConversationTurn>,
    pub cards: Vec<MessageCard>,
}

impl SessionResult {
    pub fn steps(&self) -> Vec<StepRecord> {
        self.turns.iter().map(StepRecord::from).collect()
    }

    pub fn card_records(&self) -> Vec<CardRecord> {
        self.cards.iter().map(MessageCard::to_record).collect()
    }

    pub fn planner_turns(&self) -> usize {
        self.turns
            .iter()
            .filter(|t| t.role == AgentRole::Planner)
            .count()
    }
}

/// Accumulates turns, usage, and cards while a session runs.
#[derive(Debug)]
pub(crate) struct SessionRecorder {
    session_id: Uuid,
    totals: TokenUsage,
    turns: Vec<ConversationTurn>,
    cards: CardLog,
}

impl SessionRecorder {
    pub(crate) fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            totals: TokenUsage::default(),
            turns: Vec::new(),
            cards: CardLog::new(),
        }
    }

    pub(crate) fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub(crate) fn record_turn(
        &mut self,
        turn_index: usize,
        role: AgentRole,
        text: &str,
        usage: TokenUsage,
    ) {
        self.totals += usage;
        self.turns.push(ConversationTurn {
            turn_index,
            role,
            text: text.to_string(),
            token_usage: usage,
        });
    }

    pub(crate) fn append_card(&mut self, card: MessageCard) {
        self.cards.append(card);
    }

    /// Close the session. An empty answer falls back to the last turn's
    /// text, then to [`NO_ANSWER`].
    pub(crate) fn finish(self, answer: Option<String>) -> SessionResult {
        let final_answer = answer
            .filter(|a| !a.trim().is_empty())
            .or_else(|| {
                self.turns
                    .last()
                    .map(|t| t.text.clone())
                    .filter(|t| !t.trim().is_empty())
            })
            .unwrap_or_else(|| NO_ANSWER.to_string());

        SessionResult {
            session_id: self.session_id,
            final_answer,
            totals: self.totals,
            turns: self.turns,
            cards: self.cards.into_cards(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_accumulates_usage() {
        let mut rec = SessionRecorder::new();
        rec.record_turn(1, AgentRole::Planner, "plan", TokenUsage::new(10, 5));
        rec.record_turn(1, AgentRole::Solver, "8", TokenUsage::new(7, 1));
        let result = rec.finish(Some("8".into()));

        assert_eq!(result.final_answer, "8");
        assert_eq!(result.totals, TokenUsage::new(17, 6));
        let sum: u64 = result.turns.iter().map(|t| t.token_usage.total_tokens).sum();
        assert_eq!(result.totals.total_tokens, sum);
        assert_eq!(result.planner_turns(), 1);

        let steps = result.steps();
        assert_eq!(steps[1].turn, 1);
        assert_eq!(steps[1].agent, AgentRole::Solver);
        assert_eq!(steps[1].tokens, 8);
    }

    #[test]
    fn test_empty_answer_falls_back() {
        let mut rec = SessionRecorder::new();
        rec.record_turn(1, AgentRole::Planner, "raw planner text", TokenUsage::new(1, 1));
        assert_eq!(rec.finish(Some("  ".into())).final_answer, "raw planner text");

        let rec = SessionRecorder::new();
        assert_eq!(rec.finish(None).final_answer, NO_ANSWER);
    }

    #[test]
    fn test_step_serialization() {
        let step = StepRecord {
            turn: 2,
            agent: AgentRole::Planner,
            content: "x".into(),
            tokens: 3,
        };
        assert_eq!(
            serde_json::to_value(&step).unwrap(),
            serde_json::json!({"turn": 2, "agent": "planner", "content": "x", "tokens": 3})
        );
    }
}
