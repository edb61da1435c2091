//! Validation verdict shapes shared between the validator and its callers

use serde::{Deserialize, Serialize};

/// One finding from a validation check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Stable machine-readable code (e.g. `MISSING_ID`)
    pub code: String,

    /// Human-readable description
    pub message: String,

    /// Manifest field or file path the finding refers to, when applicable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ValidationIssue {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            field: None,
        }
    }

    pub fn with_field(
        code: impl Into<String>,
        message: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

/// Timing and outcome of one pipeline check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckMetadata {
    /// Check name: schema, security, structure, dependency, version
    pub check: String,

    /// True when the check produced no errors
    pub passed: bool,

    /// Wall-clock duration of the check
    pub duration_ms: u64,
}

/// Immutable verdict of the full validation pipeline
///
/// Invariant: `is_valid == errors.is_empty()`. Construct through
/// [`ValidationResult::from_findings`] to keep it that way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub metadata: Vec<CheckMetadata>,
}

impl ValidationResult {
    /// Build a verdict from accumulated findings
    pub fn from_findings(
        errors: Vec<ValidationIssue>,
        warnings: Vec<ValidationIssue>,
        metadata: Vec<CheckMetadata>,
    ) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            metadata,
        }
    }

    /// A passing verdict with no findings
    pub fn passed() -> Self {
        Self::from_findings(Vec::new(), Vec::new(), Vec::new())
    }

    /// True if any error or warning carries the given code
    pub fn has_code(&self, code: &str) -> bool {
        self.errors.iter().chain(self.warnings.iter()).any(|i| i.code == code)
    }
}
