use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::recommend::require_query;
use crate::core::errors::ApiError;
use crate::history::StoredExchange;
use crate::rag::Filters;
use crate::session::ArtifactContent;
use crate::state::AppState;

const DEFAULT_MESSAGES_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SessionMessageRequest {
    pub query: String,
    #[serde(default)]
    pub filters: Filters,
}

pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let sessions = state.history.list_sessions().await?;
    Ok(Json(json!({ "sessions": sessions })))
}

pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session_id = state.history.create_session(payload.title).await?;
    let session = state.history.get_session(&session_id).await?;
    Ok(Json(json!({ "session": session })))
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .history
        .get_session(&session_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))?;

    let exchanges = state
        .history
        .get_exchanges(&session_id, DEFAULT_MESSAGES_LIMIT)
        .await?;

    Ok(Json(json!({ "session": session, "exchanges": exchanges })))
}

pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.history.delete_session(&session_id).await? {
        return Err(ApiError::NotFound("Session not found".to_string()));
    }
    Ok(Json(json!({ "success": true })))
}

pub async fn get_session_messages(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = params
        .get("limit")
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(DEFAULT_MESSAGES_LIMIT);

    let exchanges: Vec<StoredExchange> = state.history.get_exchanges(&session_id, limit).await?;
    Ok(Json(json!({ "exchanges": exchanges })))
}

/// Answers within a stored session, using its recent exchanges as history.
pub async fn post_session_message(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(payload): Json<SessionMessageRequest>,
) -> Result<Json<ArtifactContent>, ApiError> {
    let query = require_query(&payload.query)?;
    if state.history.get_session(&session_id).await?.is_none() {
        return Err(ApiError::NotFound("Session not found".to_string()));
    }

    let history: Vec<ArtifactContent> = state
        .history
        .get_exchanges(&session_id, state.settings.assistant.history_limit)
        .await?
        .into_iter()
        .map(|stored| stored.artifact)
        .collect();

    let artifact = state
        .composer
        .answer(query, &history, &payload.filters)
        .await?;
    let content = artifact.to_content();
    state.history.record_exchange(&session_id, &content).await?;

    Ok(Json(content))
}
