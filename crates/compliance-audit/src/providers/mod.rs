//! Provider abstractions for the remote reasoning service

pub mod gemini;
pub mod llm;

pub use gemini::GeminiClient;
pub use llm::{InlineImage, ModelReply, ModelRequest, ReasoningProvider};

#[cfg(test)]
pub use llm::MockReasoningProvider;
