//! Upload batch processing
//!
//! Files in a batch are handled one at a time in the calling task. CPU-bound parsing and
//! page rendering hop onto the blocking pool but never overlap across files.

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use super::parser::FileParser;
use super::render::{to_data_uri, PageRenderer};
use crate::config::{BatchPolicy, IngestionConfig};
use crate::error::{Error, Result};
use crate::types::{RegulationSource, SourceKind};

/// A file as received from the client
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub data: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            data: data.into(),
        }
    }
}

/// Where a single upload ended up
#[derive(Debug, Clone)]
pub enum Ingested {
    /// New regulation source for the corpus
    Source(RegulationSource),
    /// Evidence image as a data URI
    Evidence(String),
}

/// A file that could not be ingested
#[derive(Debug, Clone, Serialize)]
pub struct IngestFailure {
    pub filename: String,
    pub error: String,
}

/// Everything produced by one batch
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Sources in upload order
    pub sources: Vec<RegulationSource>,
    /// Last image seen in the batch
    pub evidence_image: Option<String>,
    /// Per-file failures (only with `BatchPolicy::CollectFailures`)
    pub failures: Vec<IngestFailure>,
}

/// Turns uploaded files into regulation sources
pub struct IngestPipeline {
    config: IngestionConfig,
    renderer: Option<Arc<dyn PageRenderer>>,
}

impl IngestPipeline {
    /// Create a pipeline. Without a renderer PDFs carry text only.
    pub fn new(config: IngestionConfig, renderer: Option<Arc<dyn PageRenderer>>) -> Self {
        if renderer.is_none() {
            tracing::warn!("No page renderer configured; PDF sources will have no page snapshots");
        }
        Self { config, renderer }
    }

    /// Process a batch sequentially
    ///
    /// With `AbortOnFirstFailure` the first error is returned and nothing from the batch
    /// survives. With `CollectFailures` each file stands alone.
    pub async fn ingest_batch(&self, files: Vec<UploadedFile>) -> Result<BatchOutcome> {
        let mut outcome = BatchOutcome::default();

        for file in files {
            let filename = file.filename.clone();
            match self.ingest_file(file).await {
                Ok(Ingested::Source(source)) => outcome.sources.push(source),
                Ok(Ingested::Evidence(image)) => outcome.evidence_image = Some(image),
                Err(e) => match self.config.batch_policy {
                    BatchPolicy::AbortOnFirstFailure => {
                        tracing::error!("Aborting upload batch at {}: {}", filename, e);
                        return Err(e);
                    }
                    BatchPolicy::CollectFailures => {
                        tracing::warn!("Skipping {}: {}", filename, e);
                        outcome.failures.push(IngestFailure {
                            filename,
                            error: e.to_string(),
                        });
                    }
                },
            }
        }

        Ok(outcome)
    }

    /// Process one file
    pub async fn ingest_file(&self, file: UploadedFile) -> Result<Ingested> {
        let start = Instant::now();
        let kind = SourceKind::from_filename(&file.filename);

        if kind == SourceKind::Image {
            let mime = mime_guess::from_path(&file.filename).first_or(mime_guess::mime::IMAGE_PNG);
            tracing::info!("Loaded evidence image {} ({} bytes)", file.filename, file.data.len());
            return Ok(Ingested::Evidence(to_data_uri(mime.essence_str(), &file.data)));
        }

        let UploadedFile { filename, data } = file;
        let data = Arc::new(data);

        let parsed = {
            let filename = filename.clone();
            let data = Arc::clone(&data);
            let config = self.config.clone();
            tokio::task::spawn_blocking(move || FileParser::parse(&filename, &data, &config))
                .await
                .map_err(|e| Error::Internal(format!("Task join error: {}", e)))??
        };

        let visual_pages = if kind == SourceKind::Pdf {
            self.snapshots(&filename, data).await?
        } else {
            None
        };

        let source = RegulationSource::new(filename, parsed.kind, parsed.content, visual_pages);
        tracing::info!(
            "Ingested {} as {} ({} chars, {} page snapshots) in {:.1}s",
            source.name,
            source.kind.display_name(),
            source.content.len(),
            source.page_count(),
            start.elapsed().as_secs_f64()
        );

        Ok(Ingested::Source(source))
    }

    async fn snapshots(&self, filename: &str, data: Arc<Vec<u8>>) -> Result<Option<Vec<String>>> {
        let Some(renderer) = self.renderer.clone() else {
            return Ok(None);
        };

        let max_pages = self.config.max_pdf_pages;
        let scale = self.config.render_scale;
        let images = tokio::task::spawn_blocking(move || renderer.render_pages(&data, max_pages, scale))
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
            .map_err(|e| match e {
                Error::FileParse { message, .. } => Error::file_parse(filename, message),
                other => other,
            })?;

        Ok(Some(
            images
                .iter()
                .map(|png| to_data_uri("image/png", png))
                .collect(),
        ))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Renders each page as a tiny payload naming its page number
    #[derive(Default)]
    pub struct FakeRenderer {
        pub calls: AtomicUsize,
    }

    impl PageRenderer for FakeRenderer {
        fn render_pages(&self, data: &[u8], max_pages: u32, _scale: f32) -> Result<Vec<Vec<u8>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let doc = lopdf::Document::load_mem(data)
                .map_err(|e| Error::file_parse("document.pdf", e.to_string()))?;
            Ok(doc
                .get_pages()
                .keys()
                .take(max_pages as usize)
                .map(|n| format!("page-{}", n).into_bytes())
                .collect())
        }

        fn name(&self) -> &str {
            "fake"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeRenderer;
    use super::*;
    use crate::ingestion::parser::fixtures;
    use crate::ingestion::render::split_data_uri;
    use base64::{engine::general_purpose::STANDARD, Engine};

    fn pipeline(policy: BatchPolicy) -> IngestPipeline {
        let config = IngestionConfig {
            batch_policy: policy,
            ..IngestionConfig::default()
        };
        IngestPipeline::new(config, Some(Arc::new(FakeRenderer::default())))
    }

    fn decoded_pages(source: &RegulationSource) -> Vec<String> {
        source
            .visual_pages
            .as_ref()
            .unwrap()
            .iter()
            .map(|uri| {
                let (mime, payload) = split_data_uri(uri);
                assert_eq!(mime, "image/png");
                String::from_utf8(STANDARD.decode(payload).unwrap()).unwrap()
            })
            .collect()
    }

    #[tokio::test]
    async fn test_pdf_snapshots_ordered() {
        let pipeline = pipeline(BatchPolicy::AbortOnFirstFailure);
        let outcome = pipeline
            .ingest_batch(vec![UploadedFile::new("three.pdf", fixtures::numbered_pdf(3))])
            .await
            .unwrap();

        let source = &outcome.sources[0];
        assert_eq!(source.kind, SourceKind::Pdf);
        assert_eq!(decoded_pages(source), vec!["page-1", "page-2", "page-3"]);
    }

    #[tokio::test]
    async fn test_pdf_snapshots_capped_at_ten() {
        let pipeline = pipeline(BatchPolicy::AbortOnFirstFailure);
        let outcome = pipeline
            .ingest_batch(vec![UploadedFile::new("long.pdf", fixtures::numbered_pdf(13))])
            .await
            .unwrap();

        let pages = decoded_pages(&outcome.sources[0]);
        assert_eq!(pages.len(), 10);
        assert_eq!(pages.last().unwrap(), "page-10");
    }

    #[tokio::test]
    async fn test_without_renderer_pdf_has_no_snapshots() {
        let pipeline = IngestPipeline::new(IngestionConfig::default(), None);
        let outcome = pipeline
            .ingest_batch(vec![UploadedFile::new("one.pdf", fixtures::numbered_pdf(1))])
            .await
            .unwrap();

        assert!(outcome.sources[0].visual_pages.is_none());
        assert!(outcome.sources[0].content.contains("Page body 1"));
    }

    #[tokio::test]
    async fn test_images_become_evidence() {
        let pipeline = pipeline(BatchPolicy::AbortOnFirstFailure);
        let outcome = pipeline
            .ingest_batch(vec![
                UploadedFile::new("rules.txt", "Article 1"),
                UploadedFile::new("first.png", vec![1u8, 2, 3]),
                UploadedFile::new("receipt.JPG", vec![4u8, 5, 6]),
            ])
            .await
            .unwrap();

        assert_eq!(outcome.sources.len(), 1);
        let image = outcome.evidence_image.unwrap();
        assert_eq!(image, to_data_uri("image/jpeg", &[4, 5, 6]));
    }

    #[tokio::test]
    async fn test_same_file_twice_yields_two_records() {
        let pipeline = pipeline(BatchPolicy::AbortOnFirstFailure);
        let outcome = pipeline
            .ingest_batch(vec![
                UploadedFile::new("rules.txt", "Article 1"),
                UploadedFile::new("rules.txt", "Article 1"),
            ])
            .await
            .unwrap();

        assert_eq!(outcome.sources.len(), 2);
        assert_ne!(outcome.sources[0].id, outcome.sources[1].id);
        assert_eq!(outcome.sources[0].content, outcome.sources[1].content);
    }

    #[tokio::test]
    async fn test_abort_policy_returns_first_error() {
        let pipeline = pipeline(BatchPolicy::AbortOnFirstFailure);
        let result = pipeline
            .ingest_batch(vec![
                UploadedFile::new("good.txt", "fine"),
                UploadedFile::new("bad.xlsx", b"garbage".to_vec()),
                UploadedFile::new("later.txt", "never reached"),
            ])
            .await;

        assert!(matches!(result, Err(Error::FileParse { ref filename, .. }) if filename == "bad.xlsx"));
    }

    #[tokio::test]
    async fn test_collect_policy_keeps_successes() {
        let pipeline = pipeline(BatchPolicy::CollectFailures);
        let outcome = pipeline
            .ingest_batch(vec![
                UploadedFile::new("good.txt", "fine"),
                UploadedFile::new("bad.pdf", b"%PDF-garbage".to_vec()),
                UploadedFile::new("later.txt", "also fine"),
            ])
            .await
            .unwrap();

        assert_eq!(outcome.sources.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].filename, "bad.pdf");
    }
}
