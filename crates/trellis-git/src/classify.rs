//! Centralized git failure classification
//!
//! Git reports failures as free text on stderr. Its vocabulary is stable
//! enough to pattern-match, but the matching must live in exactly one place
//! so callers get a typed error they can match exhaustively instead of
//! substring-checking messages themselves.

use trellis_core::error::Error;

/// Failure kind recognized from git stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureKind {
    Authentication,
    RepositoryNotFound,
    RefNotFound,
}

/// Pattern table: first match wins, top to bottom
const PATTERNS: &[(&str, FailureKind)] = &[
    ("authentication failed", FailureKind::Authentication),
    ("could not read username", FailureKind::Authentication),
    ("could not read password", FailureKind::Authentication),
    ("permission denied (publickey", FailureKind::Authentication),
    ("invalid credentials", FailureKind::Authentication),
    ("403", FailureKind::Authentication),
    ("repository not found", FailureKind::RepositoryNotFound),
    ("does not appear to be a git repository", FailureKind::RepositoryNotFound),
    ("does not exist", FailureKind::RepositoryNotFound),
    ("could not resolve host", FailureKind::RepositoryNotFound),
    ("no such device or address", FailureKind::RepositoryNotFound),
    ("couldn't find remote ref", FailureKind::RefNotFound),
    ("remote branch", FailureKind::RefNotFound),
    ("unknown revision or path", FailureKind::RefNotFound),
    ("pathspec", FailureKind::RefNotFound),
];

/// Classify a git failure into the typed error taxonomy
///
/// `reference` is the ref being resolved when the operation had one; it is
/// only used when the stderr matches a ref-shaped failure.
pub fn classify_git_failure(
    operation: &str,
    repository: &str,
    stderr: &str,
    reference: Option<&str>,
) -> Error {
    let haystack = stderr.to_lowercase();

    let kind = PATTERNS
        .iter()
        .find(|(needle, _)| haystack.contains(needle))
        .map(|(_, kind)| *kind);

    match kind {
        Some(FailureKind::Authentication) => {
            Error::authentication(operation, repository, stderr.trim())
        }
        Some(FailureKind::RepositoryNotFound) => {
            Error::repository_not_found(operation, repository, stderr.trim())
        }
        Some(FailureKind::RefNotFound) => Error::ref_not_found(
            operation,
            repository,
            reference.unwrap_or("<unknown>"),
        ),
        None => Error::transport(operation, repository, stderr.trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::error::Error;

    const REPO: &str = "https://example.com/acme/templates.git";

    #[test]
    fn test_authentication_failures() {
        for stderr in [
            "fatal: Authentication failed for 'https://example.com/'",
            "fatal: could not read Username for 'https://example.com'",
            "git@example.com: Permission denied (publickey).",
            "remote: HTTP Basic: Access denied. The provided password... 403",
        ] {
            let err = classify_git_failure("clone", REPO, stderr, None);
            assert!(
                matches!(err, Error::Authentication { .. }),
                "{:?} should classify as authentication",
                stderr
            );
        }
    }

    #[test]
    fn test_repository_not_found() {
        for stderr in [
            "remote: Repository not found.",
            "fatal: 'templates.git' does not appear to be a git repository",
            "fatal: unable to access: Could not resolve host: nohost.invalid",
        ] {
            let err = classify_git_failure("clone", REPO, stderr, None);
            assert!(
                matches!(err, Error::RepositoryNotFound { .. }),
                "{:?} should classify as repository-not-found",
                stderr
            );
        }
    }

    #[test]
    fn test_ref_not_found() {
        let err = classify_git_failure(
            "checkout",
            REPO,
            "fatal: couldn't find remote ref refs/heads/nope",
            Some("nope"),
        );
        match err {
            Error::RefNotFound { reference, .. } => assert_eq!(reference, "nope"),
            other => panic!("expected RefNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_unmatched_falls_back_to_transport() {
        let err = classify_git_failure("fetch", REPO, "error: RPC failed; curl 56", None);
        assert!(matches!(err, Error::Transport { .. }));
    }

    #[test]
    fn test_classification_is_case_insensitive() {
        let err = classify_git_failure("clone", REPO, "REMOTE: REPOSITORY NOT FOUND.", None);
        assert!(matches!(err, Error::RepositoryNotFound { .. }));
    }
}
