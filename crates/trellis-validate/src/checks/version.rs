//! Version check: host compatibility and breaking-change detection

use super::CheckFindings;
use semver::{Version, VersionReq};
use trellis_core::types::{TemplatePackage, ValidationIssue};

/// Check host-tool compatibility and flag major-version jumps
///
/// An unparsable template version is already reported by the schema check;
/// this check just skips the comparisons it cannot make.
pub fn run(
    package: &TemplatePackage,
    host_version: &str,
    previous_version: Option<&str>,
) -> CheckFindings {
    let mut findings = CheckFindings::default();

    let declared = Version::parse(&package.version).ok();

    if !package.supported_versions.is_empty() {
        if let Ok(host) = Version::parse(host_version) {
            let mut any_parsed = false;
            let mut compatible = false;

            for range in &package.supported_versions {
                match VersionReq::parse(range) {
                    Ok(req) => {
                        any_parsed = true;
                        if req.matches(&host) {
                            compatible = true;
                        }
                    }
                    Err(_) => {
                        findings.warning(ValidationIssue::with_field(
                            "INVALID_SUPPORTED_RANGE",
                            format!("unparsable supported version range: '{}'", range),
                            "supportedVersions",
                        ));
                    }
                }
            }

            if any_parsed && !compatible {
                findings.error(ValidationIssue::with_field(
                    "INCOMPATIBLE_CLI_VERSION",
                    format!(
                        "template supports {:?}, host tool is {}",
                        package.supported_versions, host_version
                    ),
                    "supportedVersions",
                ));
            }
        }
    }

    if let (Some(current), Some(previous)) = (
        declared,
        previous_version.and_then(|p| Version::parse(p).ok()),
    ) {
        if current.major > previous.major {
            findings.warning(ValidationIssue::with_field(
                "BREAKING_CHANGE",
                format!(
                    "major version change from {} to {}",
                    previous, current
                ),
                "version",
            ));
        }
    }

    findings
}
