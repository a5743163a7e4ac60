//! Evidence image endpoints

use axum::{extract::State, Json};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::request::{EvidenceResponse, ImageEditRequest};

/// GET /api/evidence - Current evidence image
pub async fn get_evidence(State(state): State<AppState>) -> Json<EvidenceResponse> {
    Json(EvidenceResponse {
        image: state.evidence(),
    })
}

/// POST /api/evidence/edit - Edit the evidence image; the result replaces it
pub async fn edit_evidence(
    State(state): State<AppState>,
    Json(request): Json<ImageEditRequest>,
) -> Result<Json<EvidenceResponse>> {
    let image = state.edit_evidence(&request.instruction).await?;
    Ok(Json(EvidenceResponse { image: Some(image) }))
}
