//! Reasoning provider trait for audits, questions and image edits

use async_trait::async_trait;

use crate::error::Result;
use crate::types::GroundingReference;

/// Base64 image attached to a request or returned by an edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    /// Base64 payload without the `data:` header
    pub data: String,
}

impl InlineImage {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Render as a `data:` URI
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// A single multimodal generation request
#[derive(Debug, Clone)]
pub struct ModelRequest {
    /// Instruction text, including the serialized corpus
    pub prompt: String,
    /// Page snapshots sent alongside the prompt
    pub images: Vec<InlineImage>,
    /// Allow the model to consult web search
    pub use_search: bool,
}

/// Text reply and any web references the model cited
#[derive(Debug, Clone, Default)]
pub struct ModelReply {
    pub text: String,
    pub references: Vec<GroundingReference>,
}

/// Trait for the remote reasoning service
///
/// Implementations:
/// - `GeminiClient`: Google Generative Language API
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReasoningProvider: Send + Sync {
    /// Generate a text response for a multimodal prompt
    async fn generate(&self, request: ModelRequest) -> Result<ModelReply>;

    /// Edit an image according to an instruction and return the produced image
    async fn edit_image(&self, image: InlineImage, instruction: String) -> Result<InlineImage>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the reasoning model being used
    fn model(&self) -> &str;
}
