//! Document ingestion pipeline with multi-format parsing

pub mod layout;
mod parser;
mod pipeline;
pub mod render;

pub use parser::{FileParser, ParsedDocument};
pub use pipeline::{BatchOutcome, IngestFailure, IngestPipeline, Ingested, UploadedFile};
pub use render::PageRenderer;

#[cfg(test)]
pub(crate) use parser::fixtures;
#[cfg(test)]
pub(crate) use pipeline::testing;
