//! The five pipeline checks
//!
//! Each check is a pure function from (manifest, artifact path) to findings.
//! Checks never short-circuit one another; the pipeline concatenates all
//! findings so the caller sees the complete error set in one pass.

pub mod dependency;
pub mod schema;
pub mod security;
pub mod structure;
pub mod version;

use trellis_core::types::ValidationIssue;

/// Packages with published supply-chain compromises or withdrawal notices
///
/// Flagged by the dependency check. Kept deliberately small; this is a
/// tripwire for well-known incidents, not a vulnerability database.
pub(crate) const KNOWN_VULNERABLE: &[&str] = &["event-stream", "flatmap-stream", "getcookies"];

/// Findings accumulated by one check
#[derive(Debug, Default)]
pub struct CheckFindings {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl CheckFindings {
    pub fn error(&mut self, issue: ValidationIssue) {
        self.errors.push(issue);
    }

    pub fn warning(&mut self, issue: ValidationIssue) {
        self.warnings.push(issue);
    }

    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }
}
