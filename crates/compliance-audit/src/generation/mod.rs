//! Audit generation: prompts, verdicts and report rendering

pub mod auditor;
pub mod markdown;
pub mod prompt;
pub mod verdict;

pub use auditor::Auditor;
pub use markdown::render_markdown;
pub use prompt::PromptBuilder;
pub use verdict::classify_verdict;
