//! Path-safety guard shared by cache removal and git cleanup
//!
//! A configuration bug must never turn a cache purge into `rm -rf /etc`.
//! Both the cache layer and the git transport call through here before any
//! recursive delete.

use std::path::{Component, Path, PathBuf};

/// Directories that must never be removed recursively
const PROTECTED_ROOTS: &[&str] = &[
    "/",
    "/bin",
    "/boot",
    "/dev",
    "/etc",
    "/home",
    "/lib",
    "/opt",
    "/proc",
    "/root",
    "/sbin",
    "/srv",
    "/sys",
    "/tmp",
    "/usr",
    "/usr/bin",
    "/usr/lib",
    "/usr/local",
    "/var",
];

/// True if `path` resolves to a recognized system directory, the filesystem
/// root, or the current working directory.
///
/// Uses the canonicalized path when the target exists so symlinks cannot
/// dodge the guard; falls back to a lexical normalization otherwise.
pub fn is_protected_path(path: &Path) -> bool {
    let resolved = path
        .canonicalize()
        .unwrap_or_else(|_| normalize_lexically(path));

    if PROTECTED_ROOTS.iter().any(|p| Path::new(p) == resolved) {
        return true;
    }

    // A bare drive root on Windows, or anything with no parent
    if resolved.parent().is_none() {
        return true;
    }

    if let Ok(cwd) = std::env::current_dir() {
        if resolved == cwd {
            return true;
        }
    }

    false
}

/// Resolve `.` and `..` components without touching the filesystem
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
