//! Audit and question endpoints

use axum::{extract::State, Json};

use crate::error::Result;
use crate::generation::render_markdown;
use crate::server::state::AppState;
use crate::types::request::{AnswerResponse, AuditRequest, AuditResponse, QuestionRequest};

/// POST /api/audit - Audit a scenario against the corpus
pub async fn audit_scenario(
    State(state): State<AppState>,
    Json(request): Json<AuditRequest>,
) -> Result<Json<AuditResponse>> {
    let report = state.audit(&request.scenario, request.use_search).await?;
    let html = render_markdown(&report.raw_markdown);
    Ok(Json(AuditResponse { report, html }))
}

/// POST /api/ask - Answer a question from the corpus
pub async fn ask_question(
    State(state): State<AppState>,
    Json(request): Json<QuestionRequest>,
) -> Result<Json<AnswerResponse>> {
    let answer = state.ask(&request.question).await?;
    let html = render_markdown(&answer);
    Ok(Json(AnswerResponse { answer, html }))
}
