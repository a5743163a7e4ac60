//! Upload endpoint

use axum::{
    extract::{Multipart, State},
    http::HeaderMap,
    Json,
};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::ingestion::UploadedFile;
use crate::server::state::AppState;
use crate::types::request::IngestResponse;

/// POST /api/ingest - Upload regulation documents and evidence images
///
/// Every multipart field carrying a file is part of the batch, in field order.
pub async fn ingest_files(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>> {
    state.require_admin(&headers)?;

    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::validation(format!("Failed to read multipart field: {}", e)))?
    {
        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("file_{}.bin", Uuid::new_v4()));

        let data = field
            .bytes()
            .await
            .map_err(|e| Error::file_parse(filename.clone(), format!("Failed to read file: {}", e)))?;

        tracing::info!("Received file: {} ({} bytes)", filename, data.len());
        files.push(UploadedFile::new(filename, data.to_vec()));
    }

    if files.is_empty() {
        return Err(Error::validation("No files uploaded"));
    }

    Ok(Json(state.ingest(files).await?))
}
