//! Deterministic content hashing over a directory tree
//!
//! The checksum is SHA-256 over the concatenation of all regular file
//! contents visited depth-first with directory entries sorted
//! lexicographically at each level. The sort order is the contract: any
//! reimplementation must sort the same way or checksums stop reproducing
//! across runs and machines.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use trellis_core::Result;
use walkdir::WalkDir;

/// Read buffer size for hashing (1MB)
const HASH_CHUNK_SIZE: usize = 1024 * 1024;

/// Compute the hex-encoded SHA-256 content hash of a directory tree
///
/// Symlinks are not followed; only regular file contents are hashed.
pub fn hash_tree(root: &Path) -> Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry.map_err(|e| {
            std::io::Error::other(format!("tree walk failed under {}: {}", root.display(), e))
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let mut file = File::open(entry.path())?;
        loop {
            let bytes_read = file.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Total size in bytes of all regular files under a directory tree
pub fn tree_size(root: &Path) -> Result<u64> {
    let mut total = 0u64;
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| {
            std::io::Error::other(format!("tree walk failed under {}: {}", root.display(), e))
        })?;
        if entry.file_type().is_file() {
            total += entry.metadata().map(|m| m.len()).unwrap_or(0);
        }
    }
    Ok(total)
}
