//! Gemini client for audits and image edits via the Generative Language API

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::llm::{InlineImage, ModelReply, ModelRequest, ReasoningProvider};
use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::types::GroundingReference;

/// Gemini client authenticated with an API key
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    reasoning_model: String,
    image_model: String,
    thinking_budget: u32,
}

impl GeminiClient {
    /// Create a new Gemini client
    ///
    /// A missing API key is not fatal here; every request fails until one is configured.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        if config.api_key.is_none() {
            tracing::warn!("No Gemini API key configured; audits will fail until one is set");
        }

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            reasoning_model: config.reasoning_model.clone(),
            image_model: config.image_model.clone(),
            thinking_budget: config.thinking_budget,
        })
    }

    /// Get the API endpoint URL for a model
    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    async fn send(&self, model: &str, request: &GenerateRequest) -> Result<GenerateResponse> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::llm("Gemini API key is not configured"))?;

        let response = self
            .http
            .post(self.endpoint(model))
            .header("x-goog-api-key", api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| Error::Llm(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Llm(format!(
                "Gemini generation failed ({}): {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Llm(format!("Failed to parse Gemini response: {}", e)))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<Blob>,
    /// Set on thought summaries, which are not part of the answer
    #[serde(default, skip_serializing)]
    thought: bool,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    fn image(image: InlineImage) -> Self {
        Self {
            inline_data: Some(Blob {
                mime_type: image.mime_type,
                data: image.data,
            }),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Blob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    thinking_config: ThinkingConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    #[serde(default)]
    web: Option<WebSource>,
    /// Maps grounding; read when a chunk has no web source
    #[serde(default)]
    maps: Option<WebSource>,
}

impl GroundingChunk {
    fn source(&self) -> Option<&WebSource> {
        self.web.as_ref().or(self.maps.as_ref())
    }
}

#[derive(Debug, Deserialize)]
struct WebSource {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

impl GenerateResponse {
    fn first_parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or_default()
    }

    /// Concatenated answer text of the first candidate
    fn text(&self) -> String {
        self.first_parts()
            .iter()
            .filter(|p| !p.thought)
            .filter_map(|p| p.text.as_deref())
            .collect()
    }

    /// Web (or maps) references of the first candidate; chunks without a URI are dropped
    fn references(&self) -> Vec<GroundingReference> {
        self.candidates
            .first()
            .and_then(|c| c.grounding_metadata.as_ref())
            .map(|m| {
                m.grounding_chunks
                    .iter()
                    .filter_map(GroundingChunk::source)
                    .filter_map(|web| {
                        web.uri.as_ref().filter(|u| !u.is_empty()).map(|uri| GroundingReference {
                            uri: uri.clone(),
                            title: web
                                .title
                                .clone()
                                .filter(|t| !t.is_empty())
                                .unwrap_or_else(|| "Reference".to_string()),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// First inline image of the first candidate
    fn into_image(self) -> Option<InlineImage> {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().find_map(|p| p.inline_data))
            .map(|blob| InlineImage::new(blob.mime_type, blob.data))
    }
}

fn reasoning_request(request: ModelRequest, thinking_budget: u32) -> GenerateRequest {
    let mut parts: Vec<Part> = request.images.into_iter().map(Part::image).collect();
    parts.push(Part::text(request.prompt));

    let tools = if request.use_search {
        vec![Tool {
            google_search: serde_json::json!({}),
        }]
    } else {
        Vec::new()
    };

    GenerateRequest {
        contents: vec![Content {
            role: "user".to_string(),
            parts,
        }],
        tools,
        generation_config: Some(GenerationConfig {
            thinking_config: ThinkingConfig { thinking_budget },
        }),
    }
}

fn image_edit_request(image: InlineImage, instruction: String) -> GenerateRequest {
    GenerateRequest {
        contents: vec![Content {
            role: "user".to_string(),
            parts: vec![Part::image(image), Part::text(instruction)],
        }],
        tools: Vec::new(),
        generation_config: None,
    }
}

#[async_trait]
impl ReasoningProvider for GeminiClient {
    async fn generate(&self, request: ModelRequest) -> Result<ModelReply> {
        tracing::debug!(
            "Gemini generate: {} chars, {} images, search={}",
            request.prompt.len(),
            request.images.len(),
            request.use_search
        );

        let body = reasoning_request(request, self.thinking_budget);
        let response = self.send(&self.reasoning_model, &body).await?;

        Ok(ModelReply {
            text: response.text(),
            references: response.references(),
        })
    }

    async fn edit_image(&self, image: InlineImage, instruction: String) -> Result<InlineImage> {
        let body = image_edit_request(image, instruction);
        let response = self.send(&self.image_model, &body).await?;

        response.into_image().ok_or(Error::NoImageGenerated)
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.reasoning_model
    }
}
