//! Application state for the compliance server

use axum::http::{header::AUTHORIZATION, HeaderMap};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::config::AuditConfig;
use crate::error::{Error, Result};
use crate::generation::Auditor;
use crate::ingestion::{IngestPipeline, PageRenderer, UploadedFile};
use crate::providers::ReasoningProvider;
use crate::storage::{CorpusStore, CredentialStore, KeyValueStore};
use crate::types::{
    request::{IngestResponse, SourceSummary},
    AuditReport, RegulationSource,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: AuditConfig,
    /// Persisted regulation corpus
    corpus: CorpusStore,
    /// Admin password
    credentials: CredentialStore,
    /// Upload processing
    pipeline: IngestPipeline,
    /// Audit, question and image-edit flows
    auditor: Auditor,
    /// Set while an upload batch is in flight
    busy: AtomicBool,
    /// Current evidence image as a data URI (not persisted)
    evidence: RwLock<Option<String>>,
    /// Admin session tokens and their issue time
    sessions: DashMap<Uuid, DateTime<Utc>>,
}

/// Clears the busy flag when an upload finishes, successfully or not
pub struct UploadGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for UploadGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl AppState {
    /// Create new application state over the given backing store, renderer and provider
    pub async fn new(
        config: AuditConfig,
        backing: Arc<dyn KeyValueStore>,
        renderer: Option<Arc<dyn PageRenderer>>,
        provider: Arc<dyn ReasoningProvider>,
    ) -> Result<Self> {
        tracing::info!(
            "Initializing application state (storage: {}, model: {} via {})",
            backing.name(),
            provider.model(),
            provider.name()
        );

        let credentials = CredentialStore::new(Arc::clone(&backing), &config.admin);
        credentials.ensure_default().await?;

        let corpus = CorpusStore::new(backing);
        let existing = corpus.load().await?;
        tracing::info!("Loaded {} regulation sources", existing.len());

        let pipeline = IngestPipeline::new(config.ingestion.clone(), renderer);
        let auditor = Auditor::new(provider, config.verdict.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                corpus,
                credentials,
                pipeline,
                auditor,
                busy: AtomicBool::new(false),
                evidence: RwLock::new(None),
                sessions: DashMap::new(),
            }),
        })
    }

    /// Get configuration
    pub fn config(&self) -> &AuditConfig {
        &self.inner.config
    }

    /// Whether an upload batch is in flight
    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    /// Claim the upload slot, failing with `Busy` if it is taken
    pub fn begin_upload(&self) -> Result<UploadGuard<'_>> {
        self.inner
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::Busy)?;
        Ok(UploadGuard {
            flag: &self.inner.busy,
        })
    }

    /// Ingest an upload batch and commit it to the corpus
    pub async fn ingest(&self, files: Vec<UploadedFile>) -> Result<IngestResponse> {
        let _guard = self.begin_upload()?;
        let start = Instant::now();
        let file_count = files.len();

        let outcome = self.inner.pipeline.ingest_batch(files).await?;

        let evidence_image_loaded = outcome.evidence_image.is_some();
        if let Some(image) = outcome.evidence_image {
            *self.inner.evidence.write() = Some(image);
        }

        let summaries: Vec<SourceSummary> = outcome.sources.iter().map(SourceSummary::from).collect();
        let corpus = self.inner.corpus.append_and_save(outcome.sources).await?;

        tracing::info!(
            "Upload batch of {} files: {} sources added, {} failed, corpus now {}",
            file_count,
            summaries.len(),
            outcome.failures.len(),
            corpus.len()
        );

        Ok(IngestResponse {
            sources: summaries,
            evidence_image_loaded,
            failures: outcome.failures,
            total_sources: corpus.len(),
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// List the corpus
    pub async fn sources(&self) -> Result<Vec<RegulationSource>> {
        self.inner.corpus.load().await
    }

    /// Add manually entered regulation text, stored as entered
    pub async fn add_manual(&self, label: Option<&str>, content: &str) -> Result<RegulationSource> {
        if content.trim().is_empty() {
            return Err(Error::validation("Regulation text must not be empty"));
        }

        let source = RegulationSource::manual(label.unwrap_or_default(), content.to_string());
        self.inner.corpus.append_and_save(vec![source.clone()]).await?;
        tracing::info!("Added manual source {} ({} chars)", source.name, content.len());
        Ok(source)
    }

    /// Delete a source by id
    pub async fn delete_source(&self, id: Uuid) -> Result<()> {
        if self.inner.corpus.delete(&id).await? {
            Ok(())
        } else {
            Err(Error::SourceNotFound(id.to_string()))
        }
    }

    /// Audit a scenario against the current corpus
    pub async fn audit(&self, scenario: &str, use_search: bool) -> Result<AuditReport> {
        let sources = self.inner.corpus.load().await?;
        self.inner.auditor.audit(&sources, scenario, use_search).await
    }

    /// Answer a question from the current corpus
    pub async fn ask(&self, question: &str) -> Result<String> {
        let sources = self.inner.corpus.load().await?;
        self.inner.auditor.ask(&sources, question).await
    }

    /// Current evidence image
    pub fn evidence(&self) -> Option<String> {
        self.inner.evidence.read().clone()
    }

    /// Edit the evidence image; the result replaces it
    pub async fn edit_evidence(&self, instruction: &str) -> Result<String> {
        let current = self
            .evidence()
            .ok_or_else(|| Error::validation("No evidence image loaded"))?;

        let edited = self.inner.auditor.edit_evidence(&current, instruction).await?;
        *self.inner.evidence.write() = Some(edited.clone());
        Ok(edited)
    }

    /// Check admin credentials and open a session
    pub async fn login(&self, admin_id: &str, password: &str) -> Result<Uuid> {
        self.inner.credentials.verify(admin_id, password).await?;

        let token = Uuid::new_v4();
        self.inner.sessions.insert(token, Utc::now());
        tracing::info!("Admin session opened ({} active)", self.inner.sessions.len());
        Ok(token)
    }

    /// Require a valid `Authorization: Bearer <token>` header
    pub fn require_admin(&self, headers: &HeaderMap) -> Result<()> {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .ok_or_else(|| Error::Unauthorized("Admin login required".to_string()))?;

        if self.inner.sessions.contains_key(&token) {
            Ok(())
        } else {
            Err(Error::Unauthorized("Session expired or unknown".to_string()))
        }
    }

    /// Change the admin password
    pub async fn change_password(&self, current: &str, new: &str, confirm: &str) -> Result<()> {
        self.inner.credentials.change_password(current, new, confirm).await
    }
}
