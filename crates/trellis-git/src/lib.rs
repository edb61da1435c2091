//! # trellis-git
//!
//! Git transport for Trellis. Repositories are fetched with the system
//! `git` binary rather than an embedded implementation, which keeps the
//! user's existing credential helpers and SSH configuration working.
//!
//! Failures are classified from stderr in one place ([`classify`]) so the
//! rest of the system only ever sees the typed error taxonomy.

pub mod classify;
pub mod transport;

pub use classify::classify_git_failure;
pub use transport::{
    checkout_branch, checkout_commit, checkout_tag, cleanup_clone, clone_repository,
    fetch_repository, validate_repo_url, CloneOptions,
};
