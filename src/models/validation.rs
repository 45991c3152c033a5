use garde::Validate;
use serde::{Deserialize, Serialize};

/// Issue severity reported by the validation stage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A single issue found in the generated animation code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationIssue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    pub message: String,
    pub severity: Severity,
}

/// Structured output of the validation stage. The score and issue list come
/// straight from the generation capability; only the contract shape is
/// enforced here.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    #[garde(skip)]
    pub is_valid: bool,
    #[garde(skip)]
    pub errors: Vec<ValidationIssue>,
    #[garde(skip)]
    pub suggestions: Vec<String>,
    /// 0–100, how well the animation teaches the concept.
    #[garde(range(max = 100))]
    pub educational_score: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_validator_output() {
        let raw = r#"{
            "isValid": true,
            "errors": [{"line": 10, "message": "unused import", "severity": "warning"}],
            "suggestions": ["Add a pause after the final transform"],
            "educationalScore": 85
        }"#;

        let result: ValidationResult = serde_json::from_str(raw).unwrap();
        assert!(result.is_valid);
        assert_eq!(result.errors[0].severity, Severity::Warning);
        assert_eq!(result.educational_score, 85);
        assert!(result.validate().is_ok());
    }

    #[test]
    fn test_score_above_100_fails_shape_check() {
        let raw = r#"{"isValid": true, "errors": [], "suggestions": [], "educationalScore": 140}"#;
        let result: ValidationResult = serde_json::from_str(raw).unwrap();
        assert!(result.validate().is_err());
    }

    #[test]
    fn test_issue_line_is_optional() {
        let raw = r#"{"message": "vague problem", "severity": "info"}"#;
        let issue: ValidationIssue = serde_json::from_str(raw).unwrap();
        assert!(issue.line.is_none());
    }
}
