//! One on-disk materialization of a template version
//!
//! Each entry is a directory under the cache root plus a JSON metadata
//! sidecar next to it (`<dir>.meta.json`). The sidecar is best-effort: a
//! failed sidecar write never fails the operation, but it is surfaced as a
//! warning instead of being swallowed.

use crate::checksum;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use trellis_core::error::{Error, Result};
use trellis_core::paths::is_protected_path;
use uuid::Uuid;

/// Sidecar file suffix, appended to the entry directory name
pub const METADATA_SUFFIX: &str = ".meta.json";

/// Cache entry metadata, serialized camelCase into the sidecar
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Unique entry id
    pub id: String,

    /// Template identifier this entry materializes
    pub template_id: String,

    /// Template version
    pub version: String,

    /// Absolute entry directory
    pub path: PathBuf,

    /// Total size of regular files in bytes
    pub size: u64,

    /// Full-tree content hash recorded at commit time
    #[serde(default)]
    pub checksum: Option<String>,

    /// Commit timestamp
    pub created_at: DateTime<Utc>,

    /// Last cache-hit timestamp
    pub last_accessed: DateTime<Utc>,

    /// Number of cache hits
    pub access_count: u64,

    /// Cleared when an integrity check fails
    pub is_valid: bool,
}

impl CacheEntry {
    /// Create a fresh entry for a just-committed directory
    pub fn new(
        template_id: impl Into<String>,
        version: impl Into<String>,
        path: PathBuf,
        size: u64,
        checksum: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            template_id: template_id.into(),
            version: version.into(),
            path,
            size,
            checksum,
            created_at: now,
            last_accessed: now,
            access_count: 0,
            is_valid: true,
        }
    }

    /// Cache key for this entry
    pub fn key(&self) -> (String, String) {
        (self.template_id.clone(), self.version.clone())
    }

    /// Sidecar path: sibling of the entry directory
    pub fn metadata_path(&self) -> PathBuf {
        sidecar_path(&self.path)
    }

    /// Check that the on-disk artifact still matches this entry
    ///
    /// Fails with `CacheIntegrity` when the path is missing, not a
    /// directory, or the recorded checksum no longer matches. The full-tree
    /// hash is only recomputed when a checksum was recorded at commit time,
    /// so ordinary hits stay cheap.
    pub fn validate(&self) -> Result<()> {
        if !self.path.exists() {
            return Err(Error::cache_integrity(
                self.describe(),
                format!("path does not exist: {}", self.path.display()),
            ));
        }

        if !self.path.is_dir() {
            return Err(Error::cache_integrity(
                self.describe(),
                format!("path is not a directory: {}", self.path.display()),
            ));
        }

        if let Some(expected) = &self.checksum {
            let actual = checksum::hash_tree(&self.path)?;
            if &actual != expected {
                return Err(Error::cache_integrity(
                    self.describe(),
                    format!("checksum mismatch: expected {}, got {}", expected, actual),
                ));
            }
        }

        Ok(())
    }

    /// Record a cache hit
    ///
    /// Bumps `access_count`, refreshes `last_accessed`, and rewrites the
    /// sidecar. Sidecar failures come back as warnings; the touch itself
    /// always succeeds. Last-writer-wins on the timestamp is acceptable for
    /// concurrent hits.
    pub fn touch(&mut self) -> Vec<String> {
        self.access_count += 1;
        self.last_accessed = Utc::now();

        let mut warnings = Vec::new();
        if let Err(e) = self.write_metadata() {
            warnings.push(format!(
                "failed to persist cache metadata for {}: {}",
                self.describe(),
                e
            ));
        }
        warnings
    }

    /// True when `last_accessed + ttl` lies in the past
    pub fn is_expired(&self, ttl: Duration) -> bool {
        match ChronoDuration::from_std(ttl) {
            Ok(ttl) => self
                .last_accessed
                .checked_add_signed(ttl)
                .map(|deadline| deadline < Utc::now())
                // Overflow means the deadline is unreachably far away
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Delete the entry directory and its sidecar
    ///
    /// Refuses with `UnsafePath` when the directory resolves to a protected
    /// system path.
    pub fn remove(&self) -> Result<()> {
        if is_protected_path(&self.path) {
            return Err(Error::unsafe_path(self.path.display().to_string()));
        }

        if self.path.exists() {
            std::fs::remove_dir_all(&self.path)?;
        }

        let sidecar = self.metadata_path();
        if sidecar.exists() {
            std::fs::remove_file(&sidecar)?;
        }

        debug!("Removed cache entry {}", self.describe());
        Ok(())
    }

    /// Write the sidecar metadata file
    pub fn write_metadata(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(self.metadata_path(), json)?;
        Ok(())
    }

    /// Load an entry from a sidecar file
    pub fn load(sidecar: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(sidecar)?;
        let entry: CacheEntry = serde_json::from_str(&content)?;
        Ok(entry)
    }

    fn describe(&self) -> String {
        format!("{}@{}", self.template_id, self.version)
    }
}

/// Sidecar path for an entry directory
pub fn sidecar_path(entry_dir: &Path) -> PathBuf {
    let mut name = entry_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(METADATA_SUFFIX);
    entry_dir.with_file_name(name)
}
