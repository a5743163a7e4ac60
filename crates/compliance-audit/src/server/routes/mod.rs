//! API routes for the compliance server

pub mod admin;
pub mod audit;
pub mod evidence;
pub mod ingest;
pub mod sources;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Admin
        .route("/admin/login", post(admin::login))
        .route("/admin/password", post(admin::change_password))
        // Corpus management
        .route("/sources", get(sources::list_sources).post(sources::add_manual_source))
        .route("/sources/:id", delete(sources::delete_source))
        // Ingestion - with larger body limit for file uploads
        .route(
            "/ingest",
            post(ingest::ingest_files).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        // Audit and Q&A
        .route("/audit", post(audit::audit_scenario))
        .route("/ask", post(audit::ask_question))
        // Evidence image
        .route("/evidence", get(evidence::get_evidence))
        .route("/evidence/edit", post(evidence::edit_evidence))
        // Info
        .route("/info", get(info))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "compliance-audit",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Regulation ingestion and compliance audits with cited clauses",
        "endpoints": {
            "POST /api/admin/login": "Open an admin session",
            "POST /api/admin/password": "Change the admin password (admin)",
            "GET /api/sources": "List regulation sources",
            "POST /api/sources": "Add manually entered regulation text (admin)",
            "DELETE /api/sources/:id": "Delete a regulation source (admin)",
            "POST /api/ingest": "Upload regulation documents and evidence images (admin)",
            "POST /api/audit": "Audit a scenario against the regulations",
            "POST /api/ask": "Ask a question about the regulations",
            "GET /api/evidence": "Current evidence image",
            "POST /api/evidence/edit": "Edit the evidence image with an instruction"
        },
        "formats": ["pdf", "xlsx", "xls", "csv", "docx", "txt", "jpg", "jpeg", "png", "webp"]
    }))
}
