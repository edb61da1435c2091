//! Registry and git connection descriptors

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Authentication mode for a registry endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "type")]
pub enum RegistryAuth {
    /// Anonymous access
    None,

    /// Bearer token resolved through the CredentialStore collaborator
    Token {
        /// Key passed to `CredentialStore::get`
        credential_id: String,
    },
}

impl Default for RegistryAuth {
    fn default() -> Self {
        Self::None
    }
}

/// One configured registry endpoint
///
/// Created by configuration, mutated only by credential rotation, never
/// auto-deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryConfig {
    /// Stable identifier used for credential lookup and logging
    pub id: String,

    /// Base URL, npm-registry convention (`{url}/{package}` serves metadata)
    pub url: String,

    /// Authentication mode
    #[serde(default)]
    pub auth: RegistryAuth,

    /// Lower numbers are consulted first
    #[serde(default)]
    pub priority: u32,

    /// Disabled registries are skipped entirely
    #[serde(default = "RegistryConfig::default_enabled")]
    pub enabled: bool,

    /// Optional npm scope this registry serves (e.g. "@acme")
    #[serde(default)]
    pub scope: Option<String>,
}

impl RegistryConfig {
    fn default_enabled() -> bool {
        true
    }

    /// Anonymous registry with default priority
    pub fn public(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            auth: RegistryAuth::None,
            priority: 0,
            enabled: true,
            scope: None,
        }
    }

    /// True if this registry serves the given package name
    ///
    /// A scoped registry only serves packages under its scope; an unscoped
    /// registry serves everything.
    pub fn serves(&self, package: &str) -> bool {
        match &self.scope {
            Some(scope) => package.starts_with(scope.as_str()),
            None => true,
        }
    }
}

/// A git branch, tag, or commit reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "name")]
pub enum GitRef {
    Branch(String),
    Tag(String),
    Commit(String),
}

impl GitRef {
    /// The raw ref name
    pub fn name(&self) -> &str {
        match self {
            GitRef::Branch(n) | GitRef::Tag(n) | GitRef::Commit(n) => n,
        }
    }
}

/// A git repository plus an optional ref to materialize
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitRepositoryRef {
    /// Repository URL without any fragment
    pub url: String,

    /// Branch/tag/commit to check out; default branch when absent
    #[serde(default)]
    pub reference: Option<GitRef>,
}

impl GitRepositoryRef {
    /// Parse a template identifier of the form `url[#ref]`
    ///
    /// The fragment is classified by shape: a 40-char hex string is a
    /// commit, a `v`-prefixed or dotted name is a tag, anything else a
    /// branch.
    pub fn parse(id: &str) -> Result<Self> {
        let (url, fragment) = match id.split_once('#') {
            Some((url, fragment)) => (url, Some(fragment)),
            None => (id, None),
        };

        if url.is_empty() {
            return Err(Error::unsupported_template_type(id));
        }

        let reference = match fragment {
            Some("") | None => None,
            Some(fragment) => Some(classify_fragment(fragment)),
        };

        Ok(Self {
            url: url.to_string(),
            reference,
        })
    }
}

fn classify_fragment(fragment: &str) -> GitRef {
    let is_commit =
        fragment.len() == 40 && fragment.chars().all(|c| c.is_ascii_hexdigit());
    if is_commit {
        return GitRef::Commit(fragment.to_string());
    }

    let looks_like_tag = fragment
        .strip_prefix('v')
        .map(|rest| rest.chars().next().is_some_and(|c| c.is_ascii_digit()))
        .unwrap_or(false)
        || fragment.chars().next().is_some_and(|c| c.is_ascii_digit());
    if looks_like_tag {
        return GitRef::Tag(fragment.to_string());
    }

    GitRef::Branch(fragment.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_scope_routing() {
        let mut registry = RegistryConfig::public("acme", "https://npm.acme.dev");
        registry.scope = Some("@acme".to_string());

        assert!(registry.serves("@acme/web-starter"));
        assert!(!registry.serves("web-starter"));

        let open = RegistryConfig::public("public", "https://registry.example.com");
        assert!(open.serves("anything"));
    }

    #[test]
    fn test_git_ref_parse_branch() {
        let r = GitRepositoryRef::parse("https://example.com/t.git#develop").unwrap();
        assert_eq!(r.url, "https://example.com/t.git");
        assert_eq!(r.reference, Some(GitRef::Branch("develop".to_string())));
    }

    #[test]
    fn test_git_ref_parse_tag() {
        let r = GitRepositoryRef::parse("https://example.com/t.git#v1.2.0").unwrap();
        assert_eq!(r.reference, Some(GitRef::Tag("v1.2.0".to_string())));

        let r = GitRepositoryRef::parse("https://example.com/t.git#2.0.0").unwrap();
        assert_eq!(r.reference, Some(GitRef::Tag("2.0.0".to_string())));
    }

    #[test]
    fn test_git_ref_parse_commit() {
        let sha = "0123456789abcdef0123456789abcdef01234567";
        let r = GitRepositoryRef::parse(&format!("https://example.com/t.git#{}", sha)).unwrap();
        assert_eq!(r.reference, Some(GitRef::Commit(sha.to_string())));
    }

    #[test]
    fn test_git_ref_parse_no_fragment() {
        let r = GitRepositoryRef::parse("https://example.com/t.git").unwrap();
        assert!(r.reference.is_none());
    }
}
