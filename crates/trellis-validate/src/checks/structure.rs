//! Structure check: type-specific required files and dependencies

use super::CheckFindings;
use std::path::Path;
use trellis_core::types::{TemplatePackage, ValidationIssue};

/// Verify the artifact matches the layout its declared type requires
pub fn run(package: &TemplatePackage, path: &Path) -> CheckFindings {
    let mut findings = CheckFindings::default();
    let kind = package.template_type;

    for required in kind.required_files() {
        if !path.join(required).exists() {
            findings.error(ValidationIssue::with_field(
                "MISSING_REQUIRED_FILE",
                format!("{} template requires '{}'", kind, required),
                *required,
            ));
        }
    }

    for required in kind.required_dependencies() {
        let declared = package.dependencies.contains_key(*required)
            || package.dev_dependencies.contains_key(*required);
        if !declared {
            findings.error(ValidationIssue::with_field(
                "MISSING_REQUIRED_DEPENDENCY",
                format!("{} template must declare dependency '{}'", kind, required),
                *required,
            ));
        }
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use trellis_core::parse_manifest;

    fn package_of_type(kind: &str) -> TemplatePackage {
        parse_manifest(&format!(
            "id: t\nname: T\nversion: 1.0.0\ntype: {}\n",
            kind
        ))
        .unwrap()
    }

    #[test]
    fn test_web_template_requires_src_and_public() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("src")).unwrap();

        let findings = run(&package_of_type("web"), temp.path());
        assert_eq!(findings.errors.len(), 1);
        assert_eq!(findings.errors[0].code, "MISSING_REQUIRED_FILE");
        assert_eq!(findings.errors[0].field.as_deref(), Some("public"));

        std::fs::create_dir(temp.path().join("public")).unwrap();
        assert!(run(&package_of_type("web"), temp.path()).passed());
    }

    #[test]
    fn test_monorepo_requires_packages_dir() {
        let temp = TempDir::new().unwrap();
        let findings = run(&package_of_type("monorepo"), temp.path());
        assert!(findings
            .errors
            .iter()
            .any(|e| e.field.as_deref() == Some("packages")));
    }

    #[test]
    fn test_plugin_requires_host_api_dependency() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("src")).unwrap();

        let mut pkg = package_of_type("plugin");
        let findings = run(&pkg, temp.path());
        assert!(findings
            .errors
            .iter()
            .any(|e| e.code == "MISSING_REQUIRED_DEPENDENCY"));

        pkg.dependencies
            .insert("trellis-plugin-api".to_string(), "^1.0.0".to_string());
        assert!(run(&pkg, temp.path()).passed());
    }
}
