//! Action extraction for planner responses.
//!
//! Turns free-form planner output into a [`Decision`]. Model output is
//! unreliable prose that sometimes embeds valid JSON and sometimes only
//! names the intended action, so extraction is an ordered series of
//! best-effort attempts:
//!
//! 1. Brace-delimited JSON objects carrying an `"action"` key, then any
//!    flat brace-delimited object.
//! 2. A lexical scan for `call_solver` / `final_answer` phrases followed by
//!    a labeled or quoted value.
//! 3. [`Decision::Unparseable`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Action name asking the controller to delegate a subtask.
pub const CALL_SOLVER_ACTION: &str = "call_solver";

/// Action name carrying the planner's final answer.
pub const FINAL_ANSWER_ACTION: &str = "final_answer";

/// JSON candidates, tightest first.
static JSON_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r#"\{[^{}]*"action"[^{}]*\}"#).expect("Invalid regex"),
        Regex::new(r"\{[^{}]*\}").expect("Invalid regex"),
    ]
});

static SUBTASK_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r#"(?i)["']subtask["']\s*:\s*["']([^"']+)["']"#).expect("Invalid regex"),
        Regex::new(r#"(?i)subtask["\s:]+([^"\n}{]+)"#).expect("Invalid regex"),
        Regex::new(r#"(?i)solver[^:]*:\s*["']?([^"\n}{]+)["']?"#).expect("Invalid regex"),
    ]
});

static ANSWER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r#"(?i)["']answer["']\s*:\s*["']([^"']+)["']"#).expect("Invalid regex"),
        Regex::new(r#"(?i)answer["\s:]+([^"\n}{]+)"#).expect("Invalid regex"),
        Regex::new(r#"(?i)final[^:]*:\s*["']?([^"\n}{]+)["']?"#).expect("Invalid regex"),
    ]
});

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// The structured outcome of parsing one planner turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Decision {
    /// Delegate `subtask` to the solver.
    CallSolver { subtask: String },
    /// Finish the session with `value`.
    FinalAnswer { value: String },
    /// Nothing actionable was found.
    Unparseable,
}

impl Decision {
    /// Short name used in logs and card metadata.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CallSolver { .. } => CALL_SOLVER_ACTION,
            Self::FinalAnswer { .. } => FINAL_ANSWER_ACTION,
            Self::Unparseable => "unparseable",
        }
    }
}

// ---------------------------------------------------------------------------
// Extract function
// ---------------------------------------------------------------------------

/// Extract a [`Decision`] from planner output text.
///
/// **JSON format** (preferred):
/// ```text
/// {"action": "call_solver", "subtask": "compute 2+2"}
/// {"action": "final_answer", "answer": "4"}
/// ```
///
/// **Lexical fallback**:
/// ```text
/// I will call solver. Subtask: compute 2+2
/// The final answer: 4
/// ```
pub fn extract(text: &str) -> Decision {
    if let Some(decision) = extract_json(text) {
        return decision;
    }
    if let Some(decision) = extract_lexical(text) {
        return decision;
    }
    Decision::Unparseable
}

/// Try every JSON candidate, tightest pattern first.
fn extract_json(text: &str) -> Option<Decision> {
    JSON_PATTERNS.iter().find_map(|pattern| {
        pattern
            .find_iter(text)
            .filter_map(|m| serde_json::from_str::<Value>(m.as_str()).ok())
            .find_map(|value| decision_from_json(&value, text))
    })
}

/// Map a parsed JSON object to a decision.
///
/// Objects without a string `action`, or with an action other than the two
/// known ones, are skipped.
fn decision_from_json(value: &Value, raw: &str) -> Option<Decision> {
    let object = value.as_object()?;
    let action = object.get("action")?.as_str()?;

    match action.trim() {
        CALL_SOLVER_ACTION => {
            let subtask = object
                .get("subtask")
                .or_else(|| object.get("input"))
                .map(value_to_text)
                .unwrap_or_default();
            Some(Decision::CallSolver { subtask })
        }
        FINAL_ANSWER_ACTION => {
            let value = object
                .get("answer")
                .map(value_to_text)
                .unwrap_or_else(|| raw.to_string());
            Some(Decision::FinalAnswer { value })
        }
        other => {
            log::debug!("Skipping JSON object with unknown action '{}'", other);
            None
        }
    }
}

/// Render a JSON value as plain text (strings without quotes).
fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Scan for action keywords and pull the value following them.
fn extract_lexical(text: &str) -> Option<Decision> {
    let lower = text.to_lowercase();

    if lower.contains("call_solver") || lower.contains("call solver") {
        if let Some(subtask) = first_capture(&SUBTASK_PATTERNS, text) {
            return Some(Decision::CallSolver { subtask });
        }
    }

    if lower.contains("final_answer") || lower.contains("final answer") {
        if let Some(value) = first_capture(&ANSWER_PATTERNS, text) {
            return Some(Decision::FinalAnswer { value });
        }
    }

    None
}

/// First non-empty trimmed capture among `patterns`, in order.
fn first_capture(patterns: &[Regex], text: &str) -> Option<String> {
    patterns.iter().find_map(|pattern| {
        pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
    })
}
