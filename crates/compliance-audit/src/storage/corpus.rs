//! Persisted regulation corpus

use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::kv::KeyValueStore;
use crate::error::Result;
use crate::types::RegulationSource;

/// Storage key holding the corpus as a JSON array
pub const CORPUS_KEY: &str = "regulation_sources";

/// The registered regulation sources, persisted after every change
pub struct CorpusStore {
    backing: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl CorpusStore {
    pub fn new(backing: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backing,
            write_lock: Mutex::new(()),
        }
    }

    /// Load the corpus. An unreadable stored value loads as empty.
    pub async fn load(&self) -> Result<Vec<RegulationSource>> {
        let Some(raw) = self.backing.get(CORPUS_KEY).await? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str(&raw) {
            Ok(sources) => Ok(sources),
            Err(e) => {
                tracing::warn!("Stored corpus is unreadable, starting empty: {}", e);
                Ok(Vec::new())
            }
        }
    }

    /// Replace the stored corpus
    pub async fn save(&self, corpus: &[RegulationSource]) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write(corpus).await
    }

    /// Append sources after the existing ones and persist; returns the combined corpus
    pub async fn append_and_save(&self, sources: Vec<RegulationSource>) -> Result<Vec<RegulationSource>> {
        let _guard = self.write_lock.lock().await;
        let mut corpus = self.load().await?;
        if sources.is_empty() {
            return Ok(corpus);
        }

        corpus.extend(sources);
        self.write(&corpus).await?;
        Ok(corpus)
    }

    /// Remove a source by id and persist; returns whether it existed
    pub async fn delete(&self, id: &Uuid) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut corpus = self.load().await?;
        let before = corpus.len();
        corpus.retain(|s| &s.id != id);

        if corpus.len() == before {
            return Ok(false);
        }

        self.write(&corpus).await?;
        tracing::info!("Deleted regulation source {} ({} remain)", id, corpus.len());
        Ok(true)
    }

    async fn write(&self, corpus: &[RegulationSource]) -> Result<()> {
        let json = serde_json::to_string(corpus)?;
        self.backing.set(CORPUS_KEY, &json).await?;
        tracing::debug!("Persisted {} regulation sources to {}", corpus.len(), self.backing.name());
        Ok(())
    }
}
