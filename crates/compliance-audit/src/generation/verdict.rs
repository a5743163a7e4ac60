//! Verdict classification by marker scan over model output

use crate::config::VerdictConfig;
use crate::types::AuditStatus;

/// Classify a response: exactly one marker decides, both or neither is uncertain
pub fn classify_verdict(text: &str, markers: &VerdictConfig) -> AuditStatus {
    let violation = text.contains(&markers.violation_marker);
    let compliant = text.contains(&markers.compliant_marker);

    match (violation, compliant) {
        (true, false) => AuditStatus::Violation,
        (false, true) => AuditStatus::Compliant,
        _ => AuditStatus::Uncertain,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markers() -> VerdictConfig {
        VerdictConfig::default()
    }

    #[test]
    fn test_compliant_only() {
        let text = "### ⚖️ 판정 결과: 적합\n규정에 부합합니다.";
        assert_eq!(classify_verdict(text, &markers()), AuditStatus::Compliant);
    }

    #[test]
    fn test_violation_only() {
        let text = "### ⚖️ 판정 결과: 위반";
        assert_eq!(classify_verdict(text, &markers()), AuditStatus::Violation);
    }

    #[test]
    fn test_both_or_neither_uncertain() {
        assert_eq!(
            classify_verdict("위반 소지가 있으나 적합 판정 가능", &markers()),
            AuditStatus::Uncertain
        );
        assert_eq!(
            classify_verdict("### ⚖️ 판정 결과: 판단 불가", &markers()),
            AuditStatus::Uncertain
        );
        assert_eq!(classify_verdict("", &markers()), AuditStatus::Uncertain);
    }

    #[test]
    fn test_custom_markers() {
        let markers = VerdictConfig {
            violation_marker: "VIOLATION".to_string(),
            compliant_marker: "COMPLIANT".to_string(),
        };
        assert_eq!(classify_verdict("Verdict: COMPLIANT", &markers), AuditStatus::Compliant);
    }
}
