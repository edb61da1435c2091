//! Dependency check: range syntax, range conflicts, known-bad packages

use super::{CheckFindings, KNOWN_VULNERABLE};
use semver::{Version, VersionReq};
use trellis_core::types::{TemplatePackage, ValidationIssue};

/// Validate every declared dependency range and probe for conflicts
pub fn run(package: &TemplatePackage) -> CheckFindings {
    let mut findings = CheckFindings::default();

    for (name, range) in package.dependencies.iter().chain(&package.dev_dependencies) {
        if parse_range(range).is_none() {
            findings.error(ValidationIssue::with_field(
                "INVALID_DEPENDENCY_RANGE",
                format!("'{}' is not a valid version range for {}", range, name),
                name.clone(),
            ));
        }

        if KNOWN_VULNERABLE.contains(&name.as_str()) {
            findings.error(ValidationIssue::with_field(
                "VULNERABLE_DEPENDENCY",
                format!("{} has a known supply-chain compromise", name),
                name.clone(),
            ));
        }
    }

    // A package required by both tables with disjoint ranges cannot resolve
    for (name, runtime_range) in &package.dependencies {
        let Some(dev_range) = package.dev_dependencies.get(name) else {
            continue;
        };
        let (Some(a), Some(b)) = (parse_range(runtime_range), parse_range(dev_range)) else {
            continue;
        };
        if !ranges_overlap(&a, &b) {
            findings.warning(ValidationIssue::with_field(
                "CONFLICTING_RANGES",
                format!(
                    "{} is required as '{}' and '{}', which share no version",
                    name, runtime_range, dev_range
                ),
                name.clone(),
            ));
        }
    }

    findings
}

/// Parse an npm-style range into a `VersionReq`
///
/// npm separates AND-comparators with spaces where `VersionReq` wants
/// commas; normalize before parsing.
fn parse_range(range: &str) -> Option<VersionReq> {
    let trimmed = range.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed == "latest" || trimmed == "*" {
        return Some(VersionReq::STAR);
    }

    let normalized = trimmed
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(", ");
    VersionReq::parse(&normalized).ok()
}

/// Probe whether two ranges admit at least one common version
///
/// Exact intersection of semver ranges is fiddly; instead, enumerate
/// candidate versions derived from each comparator (the version itself plus
/// its patch, minor, and major successors) and test each against both
/// ranges. Any candidate satisfying both proves overlap. Ranges this probe
/// cannot connect are reported as conflicting.
fn ranges_overlap(a: &VersionReq, b: &VersionReq) -> bool {
    candidate_versions(a)
        .into_iter()
        .chain(candidate_versions(b))
        .any(|v| a.matches(&v) && b.matches(&v))
}

fn candidate_versions(req: &VersionReq) -> Vec<Version> {
    let mut candidates = Vec::new();
    for comparator in &req.comparators {
        let base = Version::new(
            comparator.major,
            comparator.minor.unwrap_or(0),
            comparator.patch.unwrap_or(0),
        );
        candidates.push(Version::new(base.major, base.minor, base.patch + 1));
        candidates.push(Version::new(base.major, base.minor + 1, 0));
        candidates.push(Version::new(base.major + 1, 0, 0));
        candidates.push(base);
    }
    if candidates.is_empty() {
        // A bare `*` has no comparators; anything will do
        candidates.push(Version::new(1, 0, 0));
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::parse_manifest;

    fn package_with_deps(deps: &[(&str, &str)], dev: &[(&str, &str)]) -> TemplatePackage {
        let mut pkg: TemplatePackage =
            parse_manifest("id: t\nname: T\nversion: 1.0.0\ntype: web\n").unwrap();
        for (n, r) in deps {
            pkg.dependencies.insert(n.to_string(), r.to_string());
        }
        for (n, r) in dev {
            pkg.dev_dependencies.insert(n.to_string(), r.to_string());
        }
        pkg
    }

    #[test]
    fn test_valid_ranges_pass() {
        let pkg = package_with_deps(
            &[("react", "^18.0.0"), ("lodash", "~4.17.0"), ("express", "*")],
            &[("vite", ">=5.0.0 <6.0.0")],
        );
        let findings = run(&pkg);
        assert!(findings.passed());
        assert!(findings.warnings.is_empty());
    }

    #[test]
    fn test_invalid_range_reported() {
        let pkg = package_with_deps(&[("react", "not-a-range!!")], &[]);
        let findings = run(&pkg);
        assert!(findings
            .errors
            .iter()
            .any(|e| e.code == "INVALID_DEPENDENCY_RANGE"));
    }

    #[test]
    fn test_vulnerable_dependency_flagged() {
        let pkg = package_with_deps(&[("event-stream", "^3.3.0")], &[]);
        let findings = run(&pkg);
        assert!(findings
            .errors
            .iter()
            .any(|e| e.code == "VULNERABLE_DEPENDENCY"));
    }

    #[test]
    fn test_disjoint_ranges_conflict() {
        let pkg = package_with_deps(&[("typescript", "^4.0.0")], &[("typescript", "^5.0.0")]);
        let findings = run(&pkg);
        assert!(findings.passed());
        assert!(findings
            .warnings
            .iter()
            .any(|w| w.code == "CONFLICTING_RANGES"));
    }

    #[test]
    fn test_overlapping_ranges_do_not_conflict() {
        let pkg = package_with_deps(
            &[("typescript", "^5.0.0")],
            &[("typescript", ">=5.2.0")],
        );
        let findings = run(&pkg);
        assert!(findings.warnings.is_empty());
    }

    #[test]
    fn test_range_overlap_probe() {
        let a = VersionReq::parse("^1.2.0").unwrap();
        let b = VersionReq::parse(">=1.3.0, <2.0.0").unwrap();
        assert!(ranges_overlap(&a, &b));

        let c = VersionReq::parse("^2.0.0").unwrap();
        assert!(!ranges_overlap(&a, &c));
    }
}
