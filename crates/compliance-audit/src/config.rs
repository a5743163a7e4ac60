//! Configuration for the compliance assistant

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main assistant configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Reasoning service configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Ingestion pipeline configuration
    #[serde(default)]
    pub ingestion: IngestionConfig,
    /// Persistence configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Admin gate configuration
    #[serde(default)]
    pub admin: AdminConfig,
    /// Verdict marker configuration
    #[serde(default)]
    pub verdict: VerdictConfig,
}

impl AuditConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))
    }

    /// Fill in the API key from the environment when the file does not set one
    pub fn apply_env(&mut self) {
        if self.llm.api_key.is_none() {
            self.llm.api_key = std::env::var("GEMINI_API_KEY")
                .or_else(|_| std::env::var("API_KEY"))
                .ok()
                .filter(|k| !k.trim().is_empty());
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 50MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            max_upload_size: 50 * 1024 * 1024,
        }
    }
}

/// Reasoning service (Gemini) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Generative Language API base URL
    pub base_url: String,
    /// API key (falls back to GEMINI_API_KEY / API_KEY)
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Model used for audits and questions
    pub reasoning_model: String,
    /// Model used for evidence image edits
    pub image_model: String,
    /// Thinking token budget for text requests
    pub thinking_budget: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key: None,
            reasoning_model: "gemini-3-pro-preview".to_string(),
            image_model: "gemini-2.5-flash-image".to_string(),
            thinking_budget: 1024,
            timeout_secs: 180,
        }
    }
}

/// How a batch reacts to a file that fails to parse
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    /// Discard the whole batch on the first failure
    #[default]
    AbortOnFirstFailure,
    /// Commit the files that parsed and report the rest
    CollectFailures,
}

/// Ingestion pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Maximum PDF pages processed per file
    pub max_pdf_pages: u32,
    /// Scale factor for page snapshots
    pub render_scale: f32,
    /// Vertical distance that starts a new line when reflowing PDF text
    pub line_tolerance: f32,
    /// Failure handling for upload batches
    #[serde(default)]
    pub batch_policy: BatchPolicy,
    /// Explicit pdfium shared library path (system search when unset)
    #[serde(default)]
    pub pdfium_library: Option<PathBuf>,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            max_pdf_pages: 10,
            render_scale: 1.5,
            line_tolerance: 5.0,
            batch_policy: BatchPolicy::AbortOnFirstFailure,
            pdfium_library: None,
        }
    }
}

/// Persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the key/value files
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("compliance-audit");

        Self { data_dir }
    }
}

/// Admin gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Fixed admin identifier
    pub admin_id: String,
    /// Password seeded on first run
    pub default_password: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            admin_id: "kidari".to_string(),
            default_password: "0000".to_string(),
        }
    }
}

/// Markers scanned in model output to classify a verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerdictConfig {
    /// Token indicating a violation
    pub violation_marker: String,
    /// Token indicating compliance
    pub compliant_marker: String,
}

impl Default for VerdictConfig {
    fn default() -> Self {
        Self {
            violation_marker: "위반".to_string(),
            compliant_marker: "적합".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AuditConfig = toml::from_str(
            r#"
            [server]
            host = "127.0.0.1"
            port = 9000
            enable_cors = false
            max_upload_size = 1024

            [ingestion]
            max_pdf_pages = 3
            render_scale = 2.0
            line_tolerance = 4.0
            batch_policy = "collect_failures"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.ingestion.max_pdf_pages, 3);
        assert_eq!(config.ingestion.batch_policy, BatchPolicy::CollectFailures);
        assert_eq!(config.admin.default_password, "0000");
        assert_eq!(config.verdict.violation_marker, "위반");
        assert_eq!(config.llm.thinking_budget, 1024);
    }

    #[test]
    fn test_default_ingestion_limits() {
        let config = IngestionConfig::default();
        assert_eq!(config.max_pdf_pages, 10);
        assert_eq!(config.render_scale, 1.5);
        assert_eq!(config.line_tolerance, 5.0);
        assert_eq!(config.batch_policy, BatchPolicy::AbortOnFirstFailure);
    }
}
