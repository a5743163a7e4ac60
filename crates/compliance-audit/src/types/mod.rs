//! Core types for the compliance assistant

pub mod report;
pub mod request;
pub mod source;

pub use report::{AuditReport, AuditStatus, GroundingReference};
pub use source::{RegulationSource, SourceKind};
