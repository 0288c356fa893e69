//! Parley server library logic.

pub mod api;
pub mod config;

use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use parley_assistant::ChatClient;
use parley_db::DbPool;
use parley_dispatch::Orchestrator;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// Chat-completion client (also serves as the text-task generator).
    pub chat: Arc<ChatClient>,
    /// Task orchestrator for the voice-command flow.
    pub orchestrator: Arc<Orchestrator>,
}

/// Health check handler.
///
/// Returns `200 OK` with server status and version. Used by monitoring
/// and CI to verify the server is running.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Builds the application router with all routes and layers.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/characters", get(api::list_characters))
        .route(
            "/api/settings",
            get(api::get_settings).patch(api::update_settings),
        )
        .route(
            "/api/history",
            get(api::get_history).delete(api::clear_history),
        )
        .route("/api/chat", post(api::chat))
        .route("/api/assistant/command", post(api::command))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
