//! API handlers for the Parley server.
//!
//! The verified user id arrives in the `x-user-id` header — identity is
//! an external collaborator and the core trusts the id unconditionally.
//! Database work runs on the blocking pool; the model call in the chat
//! and command flows happens between the store reads and the final
//! appends.

use crate::AppState;
use axum::extract::{Extension, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use parley_assistant::{handle_command, respond, AssistantError, CommandOutcome};
use parley_store::{catalog, conversation, settings, SettingsUpdate, StoreError, StoredMessage};
use parley_types::{Character, SessionSettings};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InvalidPartition(_) | StoreError::Validation { .. } => {
                ApiError::BadRequest(e.to_string())
            }
            StoreError::Storage(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<AssistantError> for ApiError {
    fn from(e: AssistantError) -> Self {
        match e {
            AssistantError::Store(store) => store.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

/// Extracts the verified user id from the `x-user-id` header.
fn require_user_id(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("missing x-user-id header".to_string()))
}

/// Runs a closure against a pooled connection on the blocking pool.
async fn with_conn<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&rusqlite::Connection) -> Result<T, ApiError> + Send + 'static,
{
    let pool = state.pool.clone();
    tokio::task::spawn_blocking(move || {
        let conn = pool
            .get()
            .map_err(|e| ApiError::Internal(format!("db connection failed: {e}")))?;
        f(&conn)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?
}

/// Handler for `GET /api/characters`.
pub async fn list_characters(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<Character>>, ApiError> {
    let characters =
        with_conn(&state, |conn| Ok(catalog::list_characters(conn)?)).await?;
    Ok(Json(characters))
}

/// Handler for `GET /api/settings`.
pub async fn get_settings(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SessionSettings>, ApiError> {
    let user_id = require_user_id(&headers)?;
    let settings =
        with_conn(&state, move |conn| Ok(settings::get_settings(conn, &user_id)?)).await?;
    Ok(Json(settings))
}

/// Handler for `PATCH /api/settings`. Upserts only the provided fields
/// and returns the resulting settings.
pub async fn update_settings(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<SessionSettings>, ApiError> {
    let user_id = require_user_id(&headers)?;
    let settings = with_conn(&state, move |conn| {
        settings::update_settings(conn, &user_id, &update)?;
        Ok(settings::get_settings(conn, &user_id)?)
    })
    .await?;
    Ok(Json(settings))
}

/// Query parameters for `GET /api/history`.
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    /// Maximum number of messages to return. Defaults to 50.
    pub limit: Option<usize>,
}

/// Handler for `GET /api/history`.
pub async fn get_history(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<StoredMessage>>, ApiError> {
    let user_id = require_user_id(&headers)?;
    let limit = params.limit.unwrap_or(50).min(500);
    let messages = with_conn(&state, move |conn| {
        Ok(conversation::recent_messages(conn, &user_id, limit)?)
    })
    .await?;
    Ok(Json(messages))
}

/// Handler for `DELETE /api/history`.
pub async fn clear_history(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = require_user_id(&headers)?;
    let deleted = with_conn(&state, move |conn| {
        Ok(conversation::clear_partition(conn, &user_id)?)
    })
    .await?;
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}

/// Request body for `POST /api/chat`.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Character to roleplay as; omitted means the user's own persona.
    pub character_id: Option<i64>,
    /// The new user message.
    pub user_message: String,
}

/// Handler for `POST /api/chat`.
///
/// Upstream model failure does not fail this endpoint — the flow
/// degrades to its fallback reply and still returns 200.
pub async fn chat(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = require_user_id(&headers)?;

    let character = match request.character_id {
        Some(id) => Some(
            with_conn(&state, move |conn| Ok(catalog::get_character(conn, id)?))
                .await?
                .ok_or_else(|| ApiError::NotFound("角色不存在".to_string()))?,
        ),
        None => None,
    };

    let reply = respond(
        &state.pool,
        state.chat.as_ref(),
        &user_id,
        character.as_ref(),
        &request.user_message,
    )
    .await?;

    Ok(Json(serde_json::json!({ "reply": reply })))
}

/// Request body for `POST /api/assistant/command`.
#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    /// Recognized utterance text.
    pub text: String,
}

/// Handler for `POST /api/assistant/command`.
pub async fn command(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CommandRequest>,
) -> Result<Json<CommandOutcome>, ApiError> {
    let user_id = require_user_id(&headers)?;

    let outcome = handle_command(
        &state.pool,
        state.chat.as_ref(),
        &state.orchestrator,
        &user_id,
        &request.text,
    )
    .await?;

    Ok(Json(outcome))
}
