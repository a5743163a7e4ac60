//! Audit, question and evidence-edit flows over the reasoning provider

use std::sync::Arc;
use std::time::Instant;

use super::prompt::PromptBuilder;
use super::verdict::classify_verdict;
use crate::config::VerdictConfig;
use crate::error::{Error, Result};
use crate::ingestion::render::split_data_uri;
use crate::providers::{InlineImage, ModelRequest, ReasoningProvider};
use crate::types::{AuditReport, RegulationSource};

/// Shown when an audit reply carries no text
pub const NO_AUDIT_RESPONSE: &str = "No response generated.";

/// Shown when a question reply carries no text
pub const NO_ANSWER_RESPONSE: &str = "답변을 생성할 수 없습니다.";

pub struct Auditor {
    provider: Arc<dyn ReasoningProvider>,
    markers: VerdictConfig,
}

impl Auditor {
    pub fn new(provider: Arc<dyn ReasoningProvider>, markers: VerdictConfig) -> Self {
        Self { provider, markers }
    }

    /// Audit a scenario against the whole corpus
    pub async fn audit(
        &self,
        sources: &[RegulationSource],
        scenario: &str,
        use_search: bool,
    ) -> Result<AuditReport> {
        if scenario.trim().is_empty() {
            return Err(Error::validation("Scenario must not be empty"));
        }
        if sources.is_empty() {
            return Err(Error::EmptyCorpus);
        }

        let start = Instant::now();
        let corpus_text = PromptBuilder::build_corpus_text(sources);
        let request = ModelRequest {
            prompt: PromptBuilder::build_audit_prompt(scenario, &corpus_text),
            images: PromptBuilder::collect_visual_pages(sources),
            use_search,
        };

        tracing::info!(
            "Auditing scenario against {} sources ({} page images) via {}",
            sources.len(),
            request.images.len(),
            self.provider.model()
        );

        let reply = self.provider.generate(request).await?;
        let raw_markdown = if reply.text.is_empty() {
            NO_AUDIT_RESPONSE.to_string()
        } else {
            reply.text
        };
        let status = classify_verdict(&raw_markdown, &self.markers);

        tracing::info!(
            "Audit finished in {}ms: {:?}, {} references",
            start.elapsed().as_millis(),
            status,
            reply.references.len()
        );

        Ok(AuditReport {
            status,
            raw_markdown,
            grounding_urls: if use_search {
                Some(reply.references)
            } else {
                None
            },
        })
    }

    /// Answer a free-form question from the corpus. Search is never enabled.
    pub async fn ask(&self, sources: &[RegulationSource], question: &str) -> Result<String> {
        if question.trim().is_empty() {
            return Err(Error::validation("Question must not be empty"));
        }
        if sources.is_empty() {
            return Err(Error::EmptyCorpus);
        }

        let corpus_text = PromptBuilder::build_corpus_text(sources);
        let request = ModelRequest {
            prompt: PromptBuilder::build_question_prompt(question, &corpus_text),
            images: PromptBuilder::collect_visual_pages(sources),
            use_search: false,
        };

        let reply = self.provider.generate(request).await?;
        if reply.text.is_empty() {
            Ok(NO_ANSWER_RESPONSE.to_string())
        } else {
            Ok(reply.text)
        }
    }

    /// Edit an evidence image and return the result as a data URI
    pub async fn edit_evidence(&self, image_uri: &str, instruction: &str) -> Result<String> {
        if instruction.trim().is_empty() {
            return Err(Error::validation("Edit instruction must not be empty"));
        }

        let (mime, payload) = split_data_uri(image_uri);
        let edited = self
            .provider
            .edit_image(InlineImage::new(mime, payload), instruction.trim().to_string())
            .await?;

        Ok(edited.to_data_uri())
    }
}
