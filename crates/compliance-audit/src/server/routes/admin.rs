//! Admin session endpoints

use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::request::{ChangePasswordRequest, LoginRequest, LoginResponse};

/// POST /api/admin/login - Exchange credentials for a session token
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let token = state.login(request.id.trim(), &request.password).await?;
    Ok(Json(LoginResponse { token }))
}

/// POST /api/admin/password - Change the admin password
pub async fn change_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<StatusCode> {
    state.require_admin(&headers)?;
    state
        .change_password(
            &request.current_password,
            &request.new_password,
            &request.confirm_password,
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
