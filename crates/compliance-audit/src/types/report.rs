//! Audit verdicts and reports

use serde::{Deserialize, Serialize};

/// Verdict of an audit
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditStatus {
    /// Scenario complies with the regulations
    Compliant,
    /// Scenario violates the regulations
    Violation,
    /// No clear verdict
    Uncertain,
}

/// A citation link returned when the model used external search
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroundingReference {
    pub uri: String,
    pub title: String,
}

/// Result of auditing a scenario against the corpus
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    /// Classified verdict
    pub status: AuditStatus,
    /// Full formatted response text
    pub raw_markdown: String,
    /// Reference links, when external search was used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grounding_urls: Option<Vec<GroundingReference>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_uppercase() {
        let json = serde_json::to_string(&AuditStatus::Violation).unwrap();
        assert_eq!(json, "\"VIOLATION\"");
    }
}
