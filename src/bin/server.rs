//! cotvsa2a HTTP server binary.
//!
//! Starts an axum HTTP server exposing the A2A planner/solver protocol.
//!
//! # Environment Variables
//!
//! - `PORT`: HTTP port (default: 8100)
//! - `RUST_LOG`: tracing filter (default: "info,cotvsa2a=debug")
//! - `OPENROUTER_BASE_URL`: override the completion endpoint base URL
//! - `OPENROUTER_API_KEY_A2A_PLAN_<MODEL>` / `OPENROUTER_API_KEY_A2A_SOLVER_<MODEL>`
//!   planner and solver credentials per model family
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin server
//! ```

use anyhow::Context;
use cotvsa2a::server::{app_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,cotvsa2a=debug".into()),
        )
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "8100".to_string());
    let bind_addr = format!("0.0.0.0:{}", port);

    let app = app_router(AppState::from_env());

    tracing::info!("cotvsa2a server starting on {}", bind_addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health  liveness probe");
    tracing::info!("  POST /a2a/run planner/solver session");

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    axum::serve(listener, app).await.context("server failed")?;
    Ok(())
}
