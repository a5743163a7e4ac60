//! Regulation corpus endpoints

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::request::{ManualSourceRequest, SourceSummary};

/// Corpus listing
#[derive(Debug, Serialize)]
pub struct SourceListResponse {
    pub sources: Vec<SourceSummary>,
    pub total: usize,
}

/// GET /api/sources - List registered sources
pub async fn list_sources(State(state): State<AppState>) -> Result<Json<SourceListResponse>> {
    let sources: Vec<SourceSummary> = state.sources().await?.iter().map(SourceSummary::from).collect();
    Ok(Json(SourceListResponse {
        total: sources.len(),
        sources,
    }))
}

/// POST /api/sources - Add manually entered regulation text
pub async fn add_manual_source(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ManualSourceRequest>,
) -> Result<(StatusCode, Json<SourceSummary>)> {
    state.require_admin(&headers)?;
    let source = state
        .add_manual(request.name.as_deref(), &request.content)
        .await?;
    Ok((StatusCode::CREATED, Json(SourceSummary::from(&source))))
}

/// DELETE /api/sources/:id - Remove a source
pub async fn delete_source(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.require_admin(&headers)?;
    state.delete_source(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
