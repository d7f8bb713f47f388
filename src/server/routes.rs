//! Axum route handlers for the A2A HTTP server.
//!
//! # Routes
//!
//! - `GET  /health`: returns `{"status": "ok", "version": ..., "service": "cotvsa2a"}`
//! - `POST /a2a/run`: runs one planner/solver session for a question

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::a2a::card::CardRecord;
use crate::a2a::config::{LLMFactory, OpenRouterFactory, OrchestrationMode};
use crate::a2a::errors::A2AError;
use crate::a2a::orchestrator::A2AOrchestrator;
use crate::a2a::session::{SessionResult, StepRecord};

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    /// Builds planner and solver gateways per request.
    pub factory: Arc<dyn LLMFactory>,
}

impl AppState {
    pub fn new(factory: Arc<dyn LLMFactory>) -> Self {
        Self { factory }
    }

    /// State resolving credentials from the process environment.
    pub fn from_env() -> Self {
        Self::new(Arc::new(OpenRouterFactory::from_env()))
    }
}

/// Body of `POST /a2a/run`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    pub question: String,
    #[serde(default)]
    pub context: Option<String>,
    pub model_name: String,
    pub dataset: String,
    #[serde(default)]
    pub mode: OrchestrationMode,
}

/// Success body of `POST /a2a/run`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResponse {
    pub answer: String,
    pub total_tokens: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub steps: Vec<StepRecord>,
    pub cards: Vec<CardRecord>,
}

impl From<SessionResult> for RunResponse {
    fn from(result: SessionResult) -> Self {
        Self {
            steps: result.steps(),
            cards: result.card_records(),
            answer: result.final_answer,
            total_tokens: result.totals.total_tokens,
            prompt_tokens: result.totals.prompt_tokens,
            completion_tokens: result.totals.completion_tokens,
        }
    }
}

/// Error body: `{"status": "error", "kind": ..., "detail": ...}`.
#[derive(Debug)]
pub struct ApiError(A2AError);

impl From<A2AError> for ApiError {
    fn from(err: A2AError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(A2AError::InvalidRequest(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            A2AError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            A2AError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            A2AError::Transport(_) | A2AError::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
        };
        let body = json!({
            "status": "error",
            "kind": self.0.kind(),
            "detail": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

/// Build the axum router with all routes.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/a2a/run", post(run_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /health: liveness probe.
async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": crate::VERSION,
        "service": "cotvsa2a",
    }))
}

/// POST /a2a/run: run one session.
///
/// Credentials are resolved before any upstream call, so a missing key
/// yields a configuration error without network traffic.
async fn run_handler(
    State(state): State<AppState>,
    payload: Result<Json<RunRequest>, JsonRejection>,
) -> Result<Json<RunResponse>, ApiError> {
    let Json(request) = payload?;

    if request.model_name.trim().is_empty() {
        return Err(A2AError::InvalidRequest("model_name must not be empty".into()).into());
    }

    let orchestrator = A2AOrchestrator::from_factory(
        state.factory.as_ref(),
        request.model_name.trim(),
        request.dataset.trim(),
    )?;

    let result = orchestrator
        .run_mode(request.mode, &request.question, request.context.as_deref())
        .await
        .map_err(|e| {
            tracing::warn!("A2A run failed ({}): {}", e.kind(), e);
            e
        })?;

    tracing::info!(
        "A2A run {} answered in {} steps",
        result.session_id,
        result.turns.len()
    );
    Ok(Json(result.into()))
}
