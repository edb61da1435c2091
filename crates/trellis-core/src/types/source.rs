//! Template identifier classification
//!
//! A template id uniquely determines its transport: registry-style package
//! names and git-URL-style identifiers are mutually exclusive shapes. The
//! coordinator dispatches on this classification before touching the
//! network.

use crate::error::{Error, Result};

/// Transport classification of a template identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    /// npm-style registry package name, optionally scoped (`@scope/name`)
    Registry { name: String },

    /// Git repository URL, optionally carrying a `#ref` fragment
    Git { url: String },
}

impl TemplateSource {
    /// Classify a template identifier by shape
    ///
    /// Git identifiers are URLs (https/ssh/git scheme, scp-style `git@`, or
    /// a path ending in `.git`); cleartext `http://` is not accepted.
    /// Registry identifiers are npm-style package names. Anything else is
    /// `UnsupportedTemplateType`.
    pub fn from_id(id: &str) -> Result<Self> {
        let id = id.trim();
        if id.is_empty() {
            return Err(Error::unsupported_template_type(id));
        }

        if looks_like_git_url(id) {
            return Ok(TemplateSource::Git {
                url: id.to_string(),
            });
        }

        if is_valid_package_name(id) {
            return Ok(TemplateSource::Registry {
                name: id.to_string(),
            });
        }

        Err(Error::unsupported_template_type(id))
    }

    /// True for git-transport identifiers
    pub fn is_git(&self) -> bool {
        matches!(self, TemplateSource::Git { .. })
    }
}

impl std::fmt::Display for TemplateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateSource::Registry { name } => write!(f, "registry:{}", name),
            TemplateSource::Git { url } => write!(f, "git:{}", url),
        }
    }
}

/// Check whether an identifier has a git URL shape
fn looks_like_git_url(id: &str) -> bool {
    // The `#ref` fragment is not part of the repository location
    let base = id.split_once('#').map(|(base, _)| base).unwrap_or(id);
    // Cleartext http is never a supported transport, even with a .git path
    if base.starts_with("http://") {
        return false;
    }
    base.starts_with("https://")
        || base.starts_with("ssh://")
        || base.starts_with("git://")
        || base.starts_with("git@")
        || base.starts_with("file://")
        || base.ends_with(".git")
}

/// Validate an npm-style package name, optionally scoped
///
/// Lowercase alphanumerics plus `-`, `_`, `.`; must not start with `.` or
/// `_`; scope segment starts with `@`.
fn is_valid_package_name(id: &str) -> bool {
    let (scope, name) = match id.strip_prefix('@') {
        Some(rest) => match rest.split_once('/') {
            Some((scope, name)) => (Some(scope), name),
            None => return false,
        },
        None => (None, id),
    };

    if let Some(scope) = scope {
        if !is_valid_name_segment(scope) {
            return false;
        }
    }

    is_valid_name_segment(name)
}

fn is_valid_name_segment(segment: &str) -> bool {
    if segment.is_empty() || segment.len() > 214 {
        return false;
    }
    let first = segment.chars().next().unwrap();
    if first == '.' || first == '_' {
        return false;
    }
    segment
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_identifiers() {
        for id in ["web-starter", "api_kit", "tpl.base", "@acme/web-starter"] {
            let source = TemplateSource::from_id(id).unwrap();
            assert!(!source.is_git(), "{} should be registry-style", id);
        }
    }

    #[test]
    fn test_git_identifiers() {
        for id in [
            "https://github.com/acme/web-starter.git",
            "git@github.com:acme/web-starter.git",
            "ssh://git@example.com/templates/base.git",
            "git://example.com/base",
            "file:///srv/templates/base",
        ] {
            let source = TemplateSource::from_id(id).unwrap();
            assert!(source.is_git(), "{} should be git-style", id);
        }
    }

    #[test]
    fn test_unsupported_identifiers() {
        for id in ["", "  ", "UPPERCASE", "_private", ".hidden", "@scope-only", "a b c"] {
            assert!(
                TemplateSource::from_id(id).is_err(),
                "{:?} should be rejected",
                id
            );
        }
    }

    #[test]
    fn test_cleartext_http_rejected_at_classification() {
        for id in ["http://example.com/t.git", "http://example.com/t"] {
            let err = TemplateSource::from_id(id).unwrap_err();
            assert!(
                matches!(err, Error::UnsupportedTemplateType { .. }),
                "{} should be unsupported",
                id
            );
        }
    }

    #[test]
    fn test_shapes_are_mutually_exclusive() {
        // A plain name never classifies as git, a URL never as registry
        assert!(!TemplateSource::from_id("web-starter").unwrap().is_git());
        assert!(TemplateSource::from_id("https://example.com/t.git")
            .unwrap()
            .is_git());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            TemplateSource::from_id("web-starter").unwrap().to_string(),
            "registry:web-starter"
        );
    }
}
