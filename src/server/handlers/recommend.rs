use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::core::errors::ApiError;
use crate::rag::Filters;
use crate::session::{Artifact, ArtifactContent};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub query: String,
    #[serde(default)]
    pub history: Vec<ArtifactContent>,
    #[serde(default)]
    pub filters: Filters,
    /// One-off similarity cutoff; the configured one applies otherwise.
    #[serde(default)]
    pub threshold: Option<f32>,
}

/// Stateless exchange: the client carries its own history.
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RecommendRequest>,
) -> Result<Json<ArtifactContent>, ApiError> {
    let query = require_query(&payload.query)?;

    // Reject misaligned history before spending any completions on it.
    for content in &payload.history {
        Artifact::try_from(content.clone())?;
    }

    let artifact = state
        .composer
        .answer_with_threshold(query, &payload.history, &payload.filters, payload.threshold)
        .await?;

    Ok(Json(artifact.to_content()))
}

pub(crate) fn require_query(raw: &str) -> Result<&str, ApiError> {
    let query = raw.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".to_string()));
    }
    Ok(query)
}
