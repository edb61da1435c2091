//! Cache index keyed by (template id, version)
//!
//! The index is rebuilt from sidecar files at open time, enforces the TTL
//! tier and integrity policy on every lookup, and owns the only write path
//! into the cache root. A lookup that finds an expired or corrupt entry
//! evicts it and reports a miss; stale data is never returned.

use crate::checksum;
use crate::entry::{CacheEntry, METADATA_SUFFIX};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use trellis_core::config::TtlTier;
use trellis_core::error::{Error, Result};
use trellis_core::paths::is_protected_path;

/// Aggregate cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub total_size: u64,
}

/// Keyed collection of cache entries rooted at one directory
#[derive(Debug)]
pub struct CacheIndex {
    root: PathBuf,
    entries: HashMap<(String, String), CacheEntry>,
}

impl CacheIndex {
    /// Open (or create) a cache root and rebuild the index from sidecars
    ///
    /// Unreadable sidecars are skipped with a warning rather than failing
    /// the whole cache.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;

        let mut entries = HashMap::new();
        for dirent in std::fs::read_dir(&root)? {
            let dirent = dirent?;
            let path = dirent.path();
            let is_sidecar = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(METADATA_SUFFIX));
            if !is_sidecar {
                continue;
            }

            match CacheEntry::load(&path) {
                Ok(entry) => {
                    entries.insert(entry.key(), entry);
                }
                Err(e) => {
                    warn!("Skipping unreadable cache sidecar {:?}: {}", path, e);
                }
            }
        }

        debug!("Opened cache at {:?} with {} entries", root, entries.len());
        Ok(Self { root, entries })
    }

    /// Cache root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Look up an entry, enforcing TTL and integrity policy
    ///
    /// Returns `None` (miss) when no entry exists, the tier disables
    /// caching, the entry is TTL-expired, or validation fails; expired and
    /// corrupt entries are evicted on the way out. A hit is touched before
    /// it is returned.
    pub fn lookup(
        &mut self,
        template_id: &str,
        version: &str,
        tier: TtlTier,
    ) -> Option<CacheEntry> {
        let key = (template_id.to_string(), version.to_string());

        let ttl = match tier.ttl() {
            Some(ttl) => ttl,
            None => {
                debug!("Cache disabled by tier, miss for {}@{}", template_id, version);
                return None;
            }
        };

        let entry = self.entries.get(&key)?;

        if entry.is_expired(ttl) {
            info!("Cache entry {}@{} expired, evicting", template_id, version);
            self.evict_key(&key);
            return None;
        }

        if let Err(e) = entry.validate() {
            warn!(
                "Cache entry {}@{} failed integrity check: {}, evicting",
                template_id, version, e
            );
            self.evict_key(&key);
            return None;
        }

        let entry = self.entries.get_mut(&key)?;
        for warning in entry.touch() {
            warn!("{}", warning);
        }

        debug!("Cache hit for {}@{}", template_id, version);
        Some(entry.clone())
    }

    /// Commit a validated artifact directory into the cache
    ///
    /// Moves `source_dir` under the cache root, records checksum and size,
    /// writes the sidecar, and indexes the entry. When the key is already
    /// committed (a concurrent acquisition won the race), the incoming
    /// directory is discarded and the existing entry returned, so at most
    /// one commit wins per key.
    pub fn commit(
        &mut self,
        template_id: &str,
        version: &str,
        source_dir: &Path,
    ) -> Result<CacheEntry> {
        let key = (template_id.to_string(), version.to_string());

        if let Some(existing) = self.entries.get(&key) {
            if existing.path.is_dir() {
                debug!(
                    "Key {}@{} already committed, discarding staged copy",
                    template_id, version
                );
                std::fs::remove_dir_all(source_dir)?;
                return Ok(existing.clone());
            }
            // Indexed but directory is gone: fall through and recommit
            self.entries.remove(&key);
        }

        let target = self.root.join(entry_dir_name(template_id, version));
        if target.exists() {
            // Leftover from an interrupted commit; replace it
            std::fs::remove_dir_all(&target)?;
        }

        move_tree(source_dir, &target)?;

        let checksum = checksum::hash_tree(&target)?;
        let size = checksum::tree_size(&target)?;
        let entry = CacheEntry::new(template_id, version, target, size, Some(checksum));
        entry.write_metadata()?;

        info!(
            "Committed {}@{} to cache ({} bytes)",
            template_id, version, size
        );

        self.entries.insert(key, entry.clone());
        Ok(entry)
    }

    /// Evict one entry, removing its directory and sidecar
    pub fn evict(&mut self, template_id: &str, version: &str) -> Result<()> {
        let key = (template_id.to_string(), version.to_string());
        if let Some(entry) = self.entries.remove(&key) {
            entry.remove()?;
        }
        Ok(())
    }

    /// Remove every entry in the cache
    pub fn clear(&mut self) -> Result<()> {
        if is_protected_path(&self.root) {
            return Err(Error::unsafe_path(self.root.display().to_string()));
        }

        let keys: Vec<_> = self.entries.keys().cloned().collect();
        for key in keys {
            if let Some(entry) = self.entries.remove(&key) {
                entry.remove()?;
            }
        }
        Ok(())
    }

    /// Entry count and total size
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            total_size: self.entries.values().map(|e| e.size).sum(),
        }
    }

    /// Best-effort eviction used on the lookup path
    fn evict_key(&mut self, key: &(String, String)) {
        if let Some(entry) = self.entries.remove(key) {
            if let Err(e) = entry.remove() {
                warn!(
                    "Failed to remove evicted cache entry {}@{}: {}",
                    key.0, key.1, e
                );
            }
        }
    }
}

/// Directory name for a cache key: `{sanitized-id}_{version}`
fn entry_dir_name(template_id: &str, version: &str) -> String {
    let sanitized: String = template_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect();
    format!("{}_{}", sanitized, version)
}

/// Move a directory, falling back to copy+delete across filesystems
fn move_tree(src: &Path, dst: &Path) -> Result<()> {
    match std::fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(_) => {
            copy_tree(src, dst)?;
            std::fs::remove_dir_all(src)?;
            Ok(())
        }
    }
}

fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    std::fs::create_dir_all(dst)?;
    for dirent in std::fs::read_dir(src)? {
        let dirent = dirent?;
        let target = dst.join(dirent.file_name());
        if dirent.file_type()?.is_dir() {
            copy_tree(&dirent.path(), &target)?;
        } else {
            std::fs::copy(dirent.path(), &target)?;
        }
    }
    Ok(())
}
