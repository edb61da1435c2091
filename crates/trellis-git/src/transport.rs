//! Repository cloning and ref checkout
//!
//! Clones are shallow (`--depth 1`) by default to bound transfer cost; a
//! specific branch, tag, or commit beyond the default branch triggers an
//! explicit fetch of that ref before checkout. Every subprocess runs under
//! a deadline, and a requested ref is verified to exist in the remote's
//! enumerated refs before checkout is attempted.

use crate::classify::classify_git_failure;
use camino::{Utf8Path, Utf8PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};
use trellis_core::error::{Error, Result};
use trellis_core::paths::is_protected_path;
use trellis_core::types::{GitRef, GitRepositoryRef};

/// Options for cloning a repository
#[derive(Debug, Clone)]
pub struct CloneOptions {
    /// Shallow clone depth; `None` clones full history
    pub depth: Option<u32>,
    /// Branch to clone directly (`--branch --single-branch`)
    pub branch: Option<String>,
    /// Deadline for each git subprocess
    pub timeout: Duration,
}

impl Default for CloneOptions {
    fn default() -> Self {
        Self {
            depth: Some(1),
            branch: None,
            timeout: Duration::from_secs(120),
        }
    }
}

/// Clone a repository into `destination`
///
/// The URL is validated against the accepted scheme allow-list before any
/// subprocess is spawned; this is also the injection-prevention boundary,
/// so it must stay in front of every network operation.
pub async fn clone_repository(
    url: &str,
    destination: &Utf8Path,
    options: &CloneOptions,
) -> Result<Utf8PathBuf> {
    validate_repo_url(url)?;

    if destination.exists() {
        return Err(Error::transport(
            "clone",
            url,
            format!("destination already exists: {}", destination),
        ));
    }

    info!("Cloning {} -> {}", url, destination);

    let mut args: Vec<String> = vec!["clone".to_string()];
    if let Some(depth) = options.depth {
        args.push("--depth".to_string());
        args.push(depth.to_string());
    }
    if let Some(branch) = &options.branch {
        args.push("--branch".to_string());
        args.push(branch.clone());
        args.push("--single-branch".to_string());
    }
    args.push(url.to_string());
    args.push(destination.to_string());

    let result = run_git(
        "clone",
        url,
        options.branch.as_deref(),
        &args,
        None,
        options.timeout,
    )
    .await;

    if result.is_err() {
        // Never leave a partial clone behind
        cleanup_clone(destination).ok();
    }
    result?;

    info!("Clone of {} completed", url);
    Ok(destination.to_path_buf())
}

/// Materialize a repository ref into `destination`
///
/// A branch ref is cloned directly (`--branch --single-branch`); tags and
/// commits are checked out after the clone. The default branch is used when
/// `reference` is `None`.
pub async fn fetch_repository(
    repo: &GitRepositoryRef,
    destination: &Utf8Path,
    options: &CloneOptions,
) -> Result<Utf8PathBuf> {
    let mut clone_options = options.clone();
    if let Some(GitRef::Branch(name)) = &repo.reference {
        clone_options.branch = Some(name.clone());
    }

    let path = clone_repository(&repo.url, destination, &clone_options).await?;

    match &repo.reference {
        None | Some(GitRef::Branch(_)) => {}
        Some(GitRef::Tag(name)) => checkout_tag(&path, name, options.timeout).await?,
        Some(GitRef::Commit(sha)) => checkout_commit(&path, sha, options.timeout).await?,
    }

    Ok(path)
}

/// Check out a branch, verifying it exists on the remote first
///
/// An absent branch fails fast with `RefNotFound` instead of letting
/// checkout fail and interpreting its stderr.
pub async fn checkout_branch(path: &Utf8Path, name: &str, timeout: Duration) -> Result<()> {
    let repo = remote_url(path, timeout).await?;

    let refs = list_remote_refs(path, "--heads", &repo, timeout).await?;
    let wanted = format!("refs/heads/{}", name);
    if !refs.iter().any(|r| r == &wanted) {
        return Err(Error::ref_not_found("checkout-branch", &repo, name));
    }

    run_git(
        "fetch",
        &repo,
        Some(name),
        &["fetch".to_string(), "origin".to_string(), name.to_string()],
        Some(path),
        timeout,
    )
    .await?;

    // `-B` handles both cases: creating the branch in a single-branch
    // clone, and resetting it when it is already checked out
    run_git(
        "checkout-branch",
        &repo,
        Some(name),
        &[
            "checkout".to_string(),
            "-B".to_string(),
            name.to_string(),
            "FETCH_HEAD".to_string(),
        ],
        Some(path),
        timeout,
    )
    .await?;

    debug!("Checked out branch {} in {}", name, path);
    Ok(())
}

/// Check out a tag, verifying it exists on the remote first
pub async fn checkout_tag(path: &Utf8Path, name: &str, timeout: Duration) -> Result<()> {
    let repo = remote_url(path, timeout).await?;

    let refs = list_remote_refs(path, "--tags", &repo, timeout).await?;
    let wanted = format!("refs/tags/{}", name);
    let exists = refs.iter().any(|r| r == &wanted || r == &format!("{}^{{}}", wanted));
    if !exists {
        return Err(Error::ref_not_found("checkout-tag", &repo, name));
    }

    run_git(
        "fetch",
        &repo,
        Some(name),
        &[
            "fetch".to_string(),
            "origin".to_string(),
            "tag".to_string(),
            name.to_string(),
        ],
        Some(path),
        timeout,
    )
    .await?;

    run_git(
        "checkout-tag",
        &repo,
        Some(name),
        &["checkout".to_string(), name.to_string()],
        Some(path),
        timeout,
    )
    .await?;

    debug!("Checked out tag {} in {}", name, path);
    Ok(())
}

/// Check out a specific commit
///
/// A shallow clone rarely contains an arbitrary commit, so the commit is
/// fetched explicitly before checkout. A commit the remote does not have
/// surfaces as `RefNotFound`.
pub async fn checkout_commit(path: &Utf8Path, sha: &str, timeout: Duration) -> Result<()> {
    let repo = remote_url(path, timeout).await?;

    let fetched = run_git(
        "fetch",
        &repo,
        Some(sha),
        &["fetch".to_string(), "origin".to_string(), sha.to_string()],
        Some(path),
        timeout,
    )
    .await;

    if fetched.is_err() {
        // Older servers refuse direct sha fetches; fall back to full history
        run_git(
            "fetch",
            &repo,
            Some(sha),
            &[
                "fetch".to_string(),
                "--unshallow".to_string(),
                "origin".to_string(),
            ],
            Some(path),
            timeout,
        )
        .await
        .map_err(|_| Error::ref_not_found("checkout-commit", &repo, sha))?;
    }

    let verified = run_git(
        "verify-commit",
        &repo,
        Some(sha),
        &[
            "cat-file".to_string(),
            "-e".to_string(),
            format!("{}^{{commit}}", sha),
        ],
        Some(path),
        timeout,
    )
    .await;
    if verified.is_err() {
        return Err(Error::ref_not_found("checkout-commit", &repo, sha));
    }

    run_git(
        "checkout-commit",
        &repo,
        Some(sha),
        &["checkout".to_string(), sha.to_string()],
        Some(path),
        timeout,
    )
    .await?;

    debug!("Checked out commit {} in {}", sha, path);
    Ok(())
}

/// Enumerate remote refs of the given kind (`--heads` or `--tags`)
async fn list_remote_refs(
    path: &Utf8Path,
    kind: &str,
    repo: &str,
    timeout: Duration,
) -> Result<Vec<String>> {
    let stdout = run_git(
        "ls-remote",
        repo,
        None,
        &[
            "ls-remote".to_string(),
            kind.to_string(),
            "origin".to_string(),
        ],
        Some(path),
        timeout,
    )
    .await?;

    Ok(stdout
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .map(|s| s.to_string())
        .collect())
}

/// Read the origin URL of a cloned repository
async fn remote_url(path: &Utf8Path, timeout: Duration) -> Result<String> {
    let stdout = run_git(
        "remote-url",
        path.as_str(),
        None,
        &[
            "remote".to_string(),
            "get-url".to_string(),
            "origin".to_string(),
        ],
        Some(path),
        timeout,
    )
    .await?;
    Ok(stdout.trim().to_string())
}

/// Remove a cloned working directory
///
/// Mirrors the cache-entry guard: refuses to delete a protected path.
pub fn cleanup_clone(path: &Utf8Path) -> Result<()> {
    if is_protected_path(path.as_std_path()) {
        return Err(Error::unsafe_path(path.to_string()));
    }
    if path.exists() {
        std::fs::remove_dir_all(path)?;
    }
    Ok(())
}

/// Validate a repository URL against the accepted scheme allow-list
///
/// Accepted: https, ssh (including scp-style `git@host:`), git, and local
/// file paths.
pub fn validate_repo_url(url: &str) -> Result<()> {
    let accepted = url.starts_with("https://")
        || url.starts_with("ssh://")
        || url.starts_with("git://")
        || url.starts_with("git@")
        || url.starts_with("file://")
        || url.starts_with('/')
        || url.starts_with("./")
        || url.starts_with("../");

    if accepted {
        Ok(())
    } else {
        Err(Error::transport(
            "validate-url",
            url,
            "URL scheme not in allow-list (https, ssh, git, local path)",
        ))
    }
}

/// Run one git subprocess under a deadline and classify failures
async fn run_git(
    operation: &str,
    repository: &str,
    reference: Option<&str>,
    args: &[String],
    cwd: Option<&Utf8Path>,
    timeout: Duration,
) -> Result<String> {
    let mut cmd = Command::new("git");
    cmd.args(args);
    if let Some(cwd) = cwd {
        cmd.current_dir(cwd);
    }

    debug!("Running: git {}", args.join(" "));

    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| Error::timeout(operation, repository, timeout.as_millis() as u64))??;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(classify_git_failure(operation, repository, &stderr, reference));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command as StdCommand;
    use tempfile::TempDir;

    /// Build a local origin repository with one commit, a branch, and a tag
    fn make_origin(parent: &std::path::Path) -> Utf8PathBuf {
        let origin = parent.join("origin.git-src");
        std::fs::create_dir_all(&origin).unwrap();

        let run = |args: &[&str]| {
            let output = StdCommand::new("git")
                .args(args)
                .current_dir(&origin)
                .env("GIT_AUTHOR_NAME", "test")
                .env("GIT_AUTHOR_EMAIL", "test@example.com")
                .env("GIT_COMMITTER_NAME", "test")
                .env("GIT_COMMITTER_EMAIL", "test@example.com")
                .output()
                .unwrap();
            assert!(
                output.status.success(),
                "git {:?} failed: {}",
                args,
                String::from_utf8_lossy(&output.stderr)
            );
        };

        run(&["init", "--initial-branch=main"]);
        std::fs::write(origin.join("template.yaml"), "id: git-template\n").unwrap();
        run(&["add", "."]);
        run(&["commit", "-m", "initial"]);
        run(&["tag", "v1.0.0"]);
        run(&["branch", "develop"]);

        Utf8PathBuf::from_path_buf(origin).unwrap()
    }

    #[test]
    fn test_validate_repo_url_allow_list() {
        assert!(validate_repo_url("https://github.com/acme/t.git").is_ok());
        assert!(validate_repo_url("ssh://git@example.com/t.git").is_ok());
        assert!(validate_repo_url("git@github.com:acme/t.git").is_ok());
        assert!(validate_repo_url("git://example.com/t").is_ok());
        assert!(validate_repo_url("file:///srv/templates/t").is_ok());
        assert!(validate_repo_url("/srv/templates/t").is_ok());

        assert!(validate_repo_url("http://example.com/t.git").is_err());
        assert!(validate_repo_url("ftp://example.com/t").is_err());
        assert!(validate_repo_url("--upload-pack=touch /tmp/pwn").is_err());
    }

    #[test]
    fn test_cleanup_refuses_protected_path() {
        let err = cleanup_clone(Utf8Path::new("/etc")).unwrap_err();
        assert!(matches!(err, Error::UnsafePath { .. }));
    }

    #[test]
    fn test_cleanup_removes_ordinary_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("clone");
        std::fs::create_dir(&dir).unwrap();
        let dir = Utf8PathBuf::from_path_buf(dir).unwrap();

        cleanup_clone(&dir).unwrap();
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_clone_local_repository() {
        let temp = TempDir::new().unwrap();
        let origin = make_origin(temp.path());
        let dest = Utf8PathBuf::from_path_buf(temp.path().join("clone")).unwrap();

        let path = clone_repository(origin.as_str(), &dest, &CloneOptions::default())
            .await
            .unwrap();

        assert!(path.join("template.yaml").exists());
    }

    #[tokio::test]
    async fn test_clone_missing_repository_classified() {
        let temp = TempDir::new().unwrap();
        let dest = Utf8PathBuf::from_path_buf(temp.path().join("clone")).unwrap();

        let err = clone_repository(
            "/nonexistent/definitely-missing.git",
            &dest,
            &CloneOptions::default(),
        )
        .await
        .unwrap_err();

        assert!(
            matches!(
                err,
                Error::RepositoryNotFound { .. } | Error::Transport { .. }
            ),
            "unexpected error: {:?}",
            err
        );
        // No partial clone left behind
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_checkout_existing_tag() {
        let temp = TempDir::new().unwrap();
        let origin = make_origin(temp.path());
        let dest = Utf8PathBuf::from_path_buf(temp.path().join("clone")).unwrap();

        let repo = GitRepositoryRef {
            url: origin.to_string(),
            reference: Some(GitRef::Tag("v1.0.0".to_string())),
        };
        let path = fetch_repository(&repo, &dest, &CloneOptions::default())
            .await
            .unwrap();
        assert!(path.join("template.yaml").exists());
    }

    #[tokio::test]
    async fn test_checkout_existing_branch() {
        let temp = TempDir::new().unwrap();
        let origin = make_origin(temp.path());
        let dest = Utf8PathBuf::from_path_buf(temp.path().join("clone")).unwrap();

        let repo = GitRepositoryRef {
            url: origin.to_string(),
            reference: Some(GitRef::Branch("develop".to_string())),
        };
        fetch_repository(&repo, &dest, &CloneOptions::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_checkout_branch_after_default_clone() {
        let temp = TempDir::new().unwrap();
        let origin = make_origin(temp.path());
        let dest = Utf8PathBuf::from_path_buf(temp.path().join("clone")).unwrap();

        let path = clone_repository(origin.as_str(), &dest, &CloneOptions::default())
            .await
            .unwrap();

        // develop is not present in the shallow single-branch clone
        checkout_branch(&path, "develop", Duration::from_secs(30))
            .await
            .unwrap();

        let err = checkout_branch(&path, "no-such-branch", Duration::from_secs(30))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RefNotFound { .. }));
    }

    #[tokio::test]
    async fn test_absent_ref_fails_fast() {
        let temp = TempDir::new().unwrap();
        let origin = make_origin(temp.path());
        let dest = Utf8PathBuf::from_path_buf(temp.path().join("clone")).unwrap();

        let repo = GitRepositoryRef {
            url: origin.to_string(),
            reference: Some(GitRef::Tag("v9.9.9".to_string())),
        };
        let err = fetch_repository(&repo, &dest, &CloneOptions::default())
            .await
            .unwrap_err();

        match err {
            Error::RefNotFound { reference, .. } => assert_eq!(reference, "v9.9.9"),
            other => panic!("expected RefNotFound, got {:?}", other),
        }
    }
}
