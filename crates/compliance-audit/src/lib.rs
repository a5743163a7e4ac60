//! compliance-audit: Regulation ingestion and LLM-backed compliance audits
//!
//! This crate normalizes uploaded regulation documents (PDF, spreadsheets, Word, text)
//! into a persisted corpus and asks a remote reasoning model to audit business scenarios
//! against it, returning a compliant / violation / uncertain verdict with cited clauses.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod server;
pub mod storage;
pub mod types;

pub use config::AuditConfig;
pub use error::{Error, Result};
pub use types::{
    report::{AuditReport, AuditStatus, GroundingReference},
    source::{RegulationSource, SourceKind},
};
