//! The A2A orchestration loop.
//!
//! A controller drives a [`PlannerAgent`] and a [`SolverAgent`] through a
//! bounded conversation. Each turn the planner either delegates a subtask,
//! answers, or produces text with no recognizable action. Every exchange is
//! logged as a [`MessageCard`]; the loop never reads the card log back.

use serde_json::json;

use crate::a2a::agents::{A2AAgent, PlannerAgent, SolverAgent, JSON_ACTION_REMINDER};
use crate::a2a::card::{metadata, CardMetadata, MessageCard, Participant};
use crate::a2a::config::{A2AConfig, CredentialRole, LLMFactory, OrchestrationMode};
use crate::a2a::errors::A2AError;
use crate::a2a::session::{AgentRole, SessionRecorder, SessionResult};
use crate::agents::parser::{extract, Decision};
use crate::llms::base_llm::LLMMessage;

/// Control action recorded when the planner is asked to retry in JSON.
pub const RETRY_JSON_ACTION: &str = "retry_json_action";

/// Control action recorded when the turn budget ends the session.
pub const FORCE_TERMINATE: &str = "force_terminate";

/// Coordinates one planner and one solver.
#[derive(Debug, Clone)]
pub struct A2AOrchestrator {
    planner: PlannerAgent,
    solver: SolverAgent,
    config: A2AConfig,
}

impl A2AOrchestrator {
    pub fn new(planner: PlannerAgent, solver: SolverAgent, config: A2AConfig) -> Self {
        Self {
            planner,
            solver,
            config,
        }
    }

    /// Build both agents through `factory`. Fails before any network call
    /// when a credential is missing.
    pub fn from_factory(
        factory: &dyn LLMFactory,
        model_name: &str,
        dataset: &str,
    ) -> Result<Self, A2AError> {
        let planner = factory.build(CredentialRole::A2APlanner, model_name, dataset)?;
        let solver = factory.build(CredentialRole::A2ASolver, model_name, dataset)?;
        Ok(Self::new(
            PlannerAgent::new(planner),
            SolverAgent::new(solver),
            A2AConfig::for_dataset(dataset),
        ))
    }

    pub fn config(&self) -> &A2AConfig {
        &self.config
    }

    /// Run the variant selected by `mode`.
    pub async fn run_mode(
        &self,
        mode: OrchestrationMode,
        question: &str,
        context: Option<&str>,
    ) -> Result<SessionResult, A2AError> {
        match mode {
            OrchestrationMode::MultiTurn => self.run(question, context).await,
            OrchestrationMode::SingleRound => self.run_single_round(question, context).await,
        }
    }

    /// Run the multi-turn loop.
    ///
    /// Terminates after at most `max_turns` planner calls. The answer is the
    /// planner's `final_answer`, or its raw text when it never produces one.
    pub async fn run(
        &self,
        question: &str,
        context: Option<&str>,
    ) -> Result<SessionResult, A2AError> {
        let question = validate_question(question)?;
        let context = normalize_context(context);
        let max_turns = self.config.max_turns.max(1);

        let mut rec = SessionRecorder::new();
        log::info!(
            "A2A session {} started (dataset={}, max_turns={})",
            rec.session_id(),
            self.config.dataset,
            max_turns
        );

        rec.append_card(MessageCard::task(
            Participant::Controller,
            Participant::Planner,
            question,
            self.task_context(context),
        ));

        let mut history = vec![LLMMessage::user(
            self.planner.initial_prompt(question, context),
        )];
        let mut final_answer: Option<String> = None;

        for turn in 0..max_turns {
            let turn_no = turn + 1;
            let is_last_turn = turn == max_turns - 1;

            let plan = self
                .planner
                .respond(
                    &history,
                    self.config.planner_temperature,
                    self.config.planner_max_tokens,
                )
                .await?;
            rec.record_turn(turn_no, AgentRole::Planner, &plan.content, plan.usage);

            let decision = extract(&plan.content);
            log::debug!("Turn {}: planner decided {}", turn_no, decision.kind());

            match decision {
                Decision::FinalAnswer { value } => {
                    rec.append_card(MessageCard::result(
                        Participant::Planner,
                        Participant::Controller,
                        value.as_str(),
                        "completed",
                        metadata([("turn", json!(turn_no))]),
                    ));
                    final_answer = Some(value);
                    break;
                }
                Decision::CallSolver { subtask } => {
                    let solved = self
                        .delegate(&mut rec, turn_no, &subtask, question, context)
                        .await?;
                    history.push(LLMMessage::assistant(plan.content.as_str()));
                    history.push(LLMMessage::user(
                        self.planner.follow_up(&solved, is_last_turn),
                    ));
                }
                Decision::Unparseable if turn == 0 => {
                    log::warn!("Planner reply had no action; asking for JSON");
                    history.push(LLMMessage::assistant(plan.content.as_str()));
                    history.push(LLMMessage::user(JSON_ACTION_REMINDER));
                    rec.append_card(MessageCard::control(
                        Participant::Controller,
                        Participant::Planner,
                        RETRY_JSON_ACTION,
                        metadata([("turn", json!(turn_no))]),
                    ));
                    continue;
                }
                Decision::Unparseable => {
                    final_answer = Some(plan.content);
                    break;
                }
            }

            if is_last_turn {
                log::info!("Turn budget exhausted after {} turns", turn_no);
                rec.append_card(MessageCard::control(
                    Participant::Controller,
                    Participant::Planner,
                    FORCE_TERMINATE,
                    metadata([("turn", json!(turn_no))]),
                ));
                final_answer = Some(plan.content);
            }
        }

        let result = rec.finish(final_answer);
        log::info!(
            "A2A session {} finished: {} turns, {} tokens",
            result.session_id,
            result.turns.len(),
            result.totals.total_tokens
        );
        Ok(result)
    }

    /// Run one planning step followed by one solving step.
    pub async fn run_single_round(
        &self,
        question: &str,
        context: Option<&str>,
    ) -> Result<SessionResult, A2AError> {
        let question = validate_question(question)?;
        let context = normalize_context(context);

        let mut rec = SessionRecorder::new();
        log::info!(
            "A2A single-round session {} started (dataset={})",
            rec.session_id(),
            self.config.dataset
        );

        rec.append_card(MessageCard::task(
            Participant::Controller,
            Participant::Planner,
            question,
            self.task_context(context),
        ));

        let prompt = self.planner.single_round_prompt(question, context);
        let plan = self
            .planner
            .respond(
                &[LLMMessage::user(prompt)],
                self.config.planner_temperature,
                self.config.single_round_planner_max_tokens,
            )
            .await?;
        rec.record_turn(1, AgentRole::Planner, &plan.content, plan.usage);

        let subtask = match extract(&plan.content) {
            Decision::CallSolver { subtask } if !subtask.trim().is_empty() => subtask,
            _ => question.to_string(),
        };

        rec.append_card(MessageCard::task(
            Participant::Planner,
            Participant::Solver,
            subtask.as_str(),
            metadata([("original_question", json!(question)), ("turn", json!(1))]),
        ));

        let prompt = self.solver.single_round_prompt(&subtask, question, context);
        let solved = self
            .solver
            .respond(
                &[LLMMessage::user(prompt)],
                self.config.solver_temperature,
                self.config.single_round_solver_max_tokens,
            )
            .await?;
        rec.record_turn(1, AgentRole::Solver, &solved.content, solved.usage);

        rec.append_card(MessageCard::result(
            Participant::Solver,
            Participant::Planner,
            solved.content.as_str(),
            "success",
            metadata([
                ("turn", json!(1)),
                ("tokens", json!(solved.usage.total_tokens)),
            ]),
        ));

        Ok(rec.finish(Some(solved.content)))
    }

    /// Hand `subtask` to the solver and record the exchange. Returns the
    /// solver's text.
    async fn delegate(
        &self,
        rec: &mut SessionRecorder,
        turn_no: usize,
        subtask: &str,
        question: &str,
        context: Option<&str>,
    ) -> Result<String, A2AError> {
        rec.append_card(MessageCard::task(
            Participant::Planner,
            Participant::Solver,
            subtask,
            metadata([
                ("original_question", json!(question)),
                ("turn", json!(turn_no)),
            ]),
        ));

        let prompt = self.solver.prompt(subtask, question, context);
        let solved = self
            .solver
            .respond(
                &[LLMMessage::user(prompt)],
                self.config.solver_temperature,
                self.config.solver_max_tokens,
            )
            .await?;
        rec.record_turn(turn_no, AgentRole::Solver, &solved.content, solved.usage);

        rec.append_card(MessageCard::result(
            Participant::Solver,
            Participant::Planner,
            solved.content.as_str(),
            "success",
            metadata([
                ("turn", json!(turn_no)),
                ("tokens", json!(solved.usage.total_tokens)),
            ]),
        ));

        Ok(solved.content)
    }

    fn task_context(&self, context: Option<&str>) -> CardMetadata {
        let mut ctx = metadata([("dataset", json!(self.config.dataset.as_str()))]);
        if let Some(c) = context {
            ctx.insert("context".to_string(), json!(c));
        }
        ctx
    }
}

fn validate_question(question: &str) -> Result<&str, A2AError> {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return Err(A2AError::InvalidRequest("question must not be empty".into()));
    }
    Ok(trimmed)
}

fn normalize_context(context: Option<&str>) -> Option<&str> {
    context.map(str::trim).filter(|c| !c.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::a2a::card::MessageType;
    use crate::a2a::session::NO_ANSWER;
    use crate::llms::base_llm::MessageRole;
    use crate::llms::errors::LLMError;
    use crate::llms::providers::scripted::{ScriptStep, ScriptedCompletion};

    fn orchestrator(
        planner: &Arc<ScriptedCompletion>,
        solver: &Arc<ScriptedCompletion>,
        dataset: &str,
    ) -> A2AOrchestrator {
        A2AOrchestrator::new(
            PlannerAgent::new(planner.clone()),
            SolverAgent::new(solver.clone()),
            A2AConfig::for_dataset(dataset),
        )
    }

    fn scripted(replies: &[&str]) -> Arc<ScriptedCompletion> {
        Arc::new(ScriptedCompletion::new("scripted", replies.iter().copied()))
    }

    fn assert_token_invariants(result: &SessionResult) {
        let sum: u64 = result.turns.iter().map(|t| t.token_usage.total_tokens).sum();
        assert_eq!(result.totals.total_tokens, sum);
        assert_eq!(
            result.totals.total_tokens,
            result.totals.prompt_tokens + result.totals.completion_tokens
        );
    }

    #[tokio::test]
    async fn test_delegate_then_answer() {
        let planner = scripted(&[
            r#"{"action":"call_solver","subtask":"add 5 and 3"}"#,
            r#"{"action":"final_answer","answer":"8"}"#,
        ]);
        let solver = scripted(&["8"]);
        let orch = orchestrator(&planner, &solver, "gsm8k");

        let result = orch.run("What is 5+3?", None).await.unwrap();

        assert_eq!(result.final_answer, "8");
        let roles: Vec<_> = result.turns.iter().map(|t| (t.turn_index, t.role)).collect();
        assert_eq!(
            roles,
            vec![
                (1, AgentRole::Planner),
                (1, AgentRole::Solver),
                (2, AgentRole::Planner)
            ]
        );

        let kinds: Vec<_> = result
            .cards
            .iter()
            .map(|c| (c.sender, c.recipient, c.message_type()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (Participant::Controller, Participant::Planner, MessageType::Task),
                (Participant::Planner, Participant::Solver, MessageType::Task),
                (Participant::Solver, Participant::Planner, MessageType::Result),
                (Participant::Planner, Participant::Controller, MessageType::Result),
            ]
        );
        let records = result.card_records();
        assert_eq!(records[1].content, "add 5 and 3");
        assert_eq!(records[3].metadata.as_ref().unwrap()["status"], "completed");
        assert_eq!(records[2].metadata.as_ref().unwrap()["tokens"], 15);
        assert_token_invariants(&result);

        // Second planner call sees the first reply and the solver result.
        let calls = planner.calls();
        assert_eq!(calls[0].temperature, 0.3);
        assert_eq!(calls[0].max_tokens, 512);
        assert_eq!(calls[1].messages.len(), 3);
        assert_eq!(calls[1].messages[1].role, MessageRole::Assistant);
        assert!(calls[1].messages[2].content.starts_with("Solver result: 8"));
        assert_eq!(solver.calls()[0].max_tokens, 1024);
    }

    #[tokio::test]
    async fn test_forced_termination_uses_raw_planner_text() {
        let ask = r#"{"action":"call_solver","subtask":"look it up"}"#;
        let planner = scripted(&[ask, ask, ask]);
        let solver = scripted(&["a", "b", "c"]);
        let orch = orchestrator(&planner, &solver, "gsm8k");

        let result = orch.run("Hard question?", None).await.unwrap();

        assert_eq!(result.final_answer, ask);
        assert_eq!(result.planner_turns(), 3);
        assert_eq!(result.turns.len(), 6);
        assert!(result.turns.len() <= 2 * orch.config().max_turns);

        let last = result.cards.last().unwrap();
        assert_eq!(last.message_type(), MessageType::Control);
        assert_eq!(last.content(), FORCE_TERMINATE);

        // The final follow-up demands an answer.
        let planner_calls = planner.calls();
        assert_eq!(planner_calls.len(), 3);
        let final_prompt = &planner_calls[2].messages.last().unwrap().content;
        assert!(final_prompt.contains("Now decide."));
        assert_token_invariants(&result);
    }

    #[tokio::test]
    async fn test_unparseable_first_turn_gets_corrective_retry() {
        let planner = scripted(&[
            "Let me think about this carefully.",
            r#"{"action":"final_answer","answer":"Paris"}"#,
        ]);
        let solver = scripted(&[]);
        let orch = orchestrator(&planner, &solver, "hotpotqa");

        let result = orch
            .run("Capital of France?", Some("France's capital is Paris."))
            .await
            .unwrap();

        assert_eq!(result.final_answer, "Paris");
        assert_eq!(solver.call_count(), 0);

        let calls = planner.calls();
        assert_eq!(calls[1].messages.last().unwrap().content, JSON_ACTION_REMINDER);
        assert!(calls[0].messages[0].content.contains("Context: France's capital is Paris."));

        let control = &result.cards[1];
        assert_eq!(control.message_type(), MessageType::Control);
        assert_eq!(control.content(), RETRY_JSON_ACTION);
        // The retry consumed a turn.
        assert_eq!(result.turns[1].turn_index, 2);
    }

    #[tokio::test]
    async fn test_corrective_retry_happens_once_then_terminates() {
        let planner = scripted(&["hmm", "still thinking"]);
        let solver = scripted(&[]);
        let orch = orchestrator(&planner, &solver, "hotpotqa");

        let result = orch.run("Who wrote Hamlet?", None).await.unwrap();

        assert_eq!(result.final_answer, "still thinking");
        assert_eq!(planner.call_count(), 2);
        assert_eq!(solver.call_count(), 0);

        let reminders = planner
            .calls()
            .iter()
            .flat_map(|call| call.messages.iter())
            .filter(|m| m.content == JSON_ACTION_REMINDER)
            .count();
        assert_eq!(reminders, 1);

        let retries = result
            .cards
            .iter()
            .filter(|c| c.message_type() == MessageType::Control && c.content() == RETRY_JSON_ACTION)
            .count();
        assert_eq!(retries, 1);
        assert_token_invariants(&result);
    }

    #[tokio::test]
    async fn test_late_unparseable_is_accepted_as_answer() {
        let planner = scripted(&[
            r#"{"action":"call_solver","subtask":"find the year"}"#,
            "It was 1889.",
        ]);
        let solver = scripted(&["1889"]);
        let orch = orchestrator(&planner, &solver, "hotpotqa");

        let result = orch.run("When was the tower built?", None).await.unwrap();
        assert_eq!(result.final_answer, "It was 1889.");
        assert_eq!(planner.call_count(), 2);
        assert!(result
            .cards
            .iter()
            .all(|c| c.message_type() != MessageType::Control));
    }

    #[tokio::test]
    async fn test_single_turn_budget_forces_termination() {
        let planner = scripted(&[r#"{"action":"call_solver","subtask":"step"}"#]);
        let solver = scripted(&["r1"]);
        let orch = A2AOrchestrator::new(
            PlannerAgent::new(planner.clone()),
            SolverAgent::new(solver.clone()),
            A2AConfig::for_dataset("gsm8k").with_max_turns(1),
        );

        let result = orch.run("q", None).await.unwrap();
        assert_eq!(result.final_answer, r#"{"action":"call_solver","subtask":"step"}"#);
        assert_eq!(result.cards.last().unwrap().content(), FORCE_TERMINATE);
    }

    #[tokio::test]
    async fn test_transport_error_aborts_session() {
        let planner = scripted(&[r#"{"action":"call_solver","subtask":"x"}"#]);
        let solver = Arc::new(ScriptedCompletion::new("scripted", Vec::<String>::new()));
        solver.push(ScriptStep::Fail(LLMError::Transport {
            message: "timed out".into(),
            status: None,
        }));
        let orch = orchestrator(&planner, &solver, "gsm8k");

        let err = orch.run("q", None).await.unwrap_err();
        assert_eq!(err.kind(), "transport");
    }

    #[tokio::test]
    async fn test_empty_question_is_rejected() {
        let planner = scripted(&["unused"]);
        let solver = scripted(&[]);
        let orch = orchestrator(&planner, &solver, "gsm8k");

        let err = orch.run("   ", None).await.unwrap_err();
        assert!(matches!(err, A2AError::InvalidRequest(_)));
        assert_eq!(planner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_final_answer_falls_back() {
        let planner = scripted(&[r#"{"action":"final_answer","answer":""}"#]);
        let solver = scripted(&[]);
        let orch = orchestrator(&planner, &solver, "gsm8k");

        let result = orch.run("q", None).await.unwrap();
        assert_eq!(result.final_answer, r#"{"action":"final_answer","answer":""}"#);
        assert_ne!(result.final_answer, NO_ANSWER);
    }

    #[tokio::test]
    async fn test_single_round() {
        let planner = scripted(&[r#"{"action":"call_solver","subtask":"multiply 6 by 7"}"#]);
        let solver = scripted(&["42"]);
        let orch = orchestrator(&planner, &solver, "gsm8k");

        let result = orch
            .run_mode(OrchestrationMode::SingleRound, "What is 6*7?", None)
            .await
            .unwrap();

        assert_eq!(result.final_answer, "42");
        assert_eq!(result.turns.len(), 2);
        assert_eq!(result.cards.len(), 3);
        assert_eq!(result.cards[1].content(), "multiply 6 by 7");
        assert_eq!(planner.calls()[0].max_tokens, 256);
        assert_eq!(solver.calls()[0].max_tokens, 512);
        assert_token_invariants(&result);
    }

    #[tokio::test]
    async fn test_single_round_falls_back_to_question() {
        let planner = scripted(&["no idea"]);
        let solver = scripted(&["42"]);
        let orch = orchestrator(&planner, &solver, "gsm8k");

        let result = orch.run_single_round("What is 6*7?", None).await.unwrap();
        assert_eq!(result.cards[1].content(), "What is 6*7?");
        assert!(solver.calls()[0].messages[0]
            .content
            .contains("Task: What is 6*7?"));
    }

    #[test]
    fn test_from_factory_requires_keys() {
        use crate::a2a::config::OpenRouterFactory;

        let factory = OpenRouterFactory::with_lookup(|var| {
            (var == "OPENROUTER_API_KEY_A2A_PLAN_GPT").then(|| "k".to_string())
        });
        let err = A2AOrchestrator::from_factory(&factory, "gpt", "gsm8k").unwrap_err();
        assert!(err.to_string().contains("OPENROUTER_API_KEY_A2A_SOLVER_GPT"));

        let factory = OpenRouterFactory::with_lookup(|_| Some("k".to_string()));
        let orch = A2AOrchestrator::from_factory(&factory, "gpt", "2wikimultihopqa").unwrap();
        assert_eq!(orch.config().max_turns, 5);
    }
}
