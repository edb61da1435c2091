//! Schema check: manifest field presence and well-formedness

use super::CheckFindings;
use semver::Version;
use trellis_core::types::{TemplatePackage, ValidationIssue};
use url::Url;

/// Validate required fields, version syntax, declared paths, and URLs
///
/// The `type` field needs no check here: it parses into the closed
/// `TemplateType` enum or the manifest fails to load at all.
pub fn run(package: &TemplatePackage) -> CheckFindings {
    let mut findings = CheckFindings::default();

    if package.id.trim().is_empty() {
        findings.error(ValidationIssue::with_field(
            "MISSING_ID",
            "template id is required",
            "id",
        ));
    }
    if package.name.trim().is_empty() {
        findings.error(ValidationIssue::with_field(
            "MISSING_NAME",
            "template name is required",
            "name",
        ));
    }

    if package.version.trim().is_empty() {
        findings.error(ValidationIssue::with_field(
            "MISSING_VERSION",
            "template version is required",
            "version",
        ));
    } else if Version::parse(&package.version).is_err() {
        findings.error(ValidationIssue::with_field(
            "INVALID_VERSION",
            format!("'{}' is not a valid semantic version", package.version),
            "version",
        ));
    }

    for file in &package.files {
        if has_traversal(file) {
            findings.error(ValidationIssue::with_field(
                "PATH_TRAVERSAL",
                format!("declared file path escapes the template root: {}", file),
                file.clone(),
            ));
        }
    }

    for (field, value) in [
        ("repository", &package.repository),
        ("homepage", &package.homepage),
    ] {
        if let Some(value) = value {
            if Url::parse(value).is_err() {
                findings.error(ValidationIssue::with_field(
                    "MALFORMED_URL",
                    format!("{} is not a well-formed URL: {}", field, value),
                    field,
                ));
            }
        }
    }

    findings
}

fn has_traversal(path: &str) -> bool {
    path.starts_with('/')
        || path.starts_with('\\')
        || path.split(['/', '\\']).any(|segment| segment == "..")
}
