//! HTTP server exposing the A2A protocol.
//!
//! # Endpoints
//!
//! - `GET  /health`: liveness probe
//! - `POST /a2a/run`: run one planner/solver session

pub mod routes;

pub use routes::{app_router, ApiError, AppState, RunRequest, RunResponse};
