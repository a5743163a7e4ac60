//! HTTP request and response bodies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::report::AuditReport;
use super::source::{RegulationSource, SourceKind};
use crate::ingestion::IngestFailure;

/// Admin login
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub id: String,
    pub password: String,
}

/// Session token issued after login
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: Uuid,
}

/// Admin password change
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Manually entered regulation text
#[derive(Debug, Clone, Deserialize)]
pub struct ManualSourceRequest {
    /// Display label (default label used when blank)
    #[serde(default)]
    pub name: Option<String>,
    pub content: String,
}

/// Audit a scenario against the corpus
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRequest {
    pub scenario: String,
    /// Allow the model to consult external search
    #[serde(default)]
    pub use_search: bool,
}

/// Audit report plus rendered HTML
#[derive(Debug, Clone, Serialize)]
pub struct AuditResponse {
    #[serde(flatten)]
    pub report: AuditReport,
    pub html: String,
}

/// Free-form question about the corpus
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionRequest {
    pub question: String,
}

/// Answer text plus rendered HTML
#[derive(Debug, Clone, Serialize)]
pub struct AnswerResponse {
    pub answer: String,
    pub html: String,
}

/// Edit instruction for the evidence image
#[derive(Debug, Clone, Deserialize)]
pub struct ImageEditRequest {
    pub instruction: String,
}

/// Current evidence image as a data URI
#[derive(Debug, Clone, Serialize)]
pub struct EvidenceResponse {
    pub image: Option<String>,
}

/// Summary of a registered source
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSummary {
    pub id: Uuid,
    pub name: String,
    pub kind: SourceKind,
    pub char_count: usize,
    pub page_count: usize,
    pub created_at: DateTime<Utc>,
}

impl From<&RegulationSource> for SourceSummary {
    fn from(source: &RegulationSource) -> Self {
        Self {
            id: source.id,
            name: source.name.clone(),
            kind: source.kind,
            char_count: source.content.chars().count(),
            page_count: source.page_count(),
            created_at: source.created_at,
        }
    }
}

/// Result of an upload batch
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub sources: Vec<SourceSummary>,
    pub evidence_image_loaded: bool,
    pub failures: Vec<IngestFailure>,
    pub total_sources: usize,
    pub processing_time_ms: u64,
}
