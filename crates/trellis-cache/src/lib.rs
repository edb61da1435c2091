//! # trellis-cache
//!
//! On-disk template cache for Trellis:
//! - Deterministic full-tree SHA-256 checksums
//! - Cache entries with TTL, access bookkeeping, and JSON metadata sidecars
//! - A (template id, version) index that never returns stale or corrupt data

pub mod checksum;
pub mod entry;
pub mod index;

pub use checksum::{hash_tree, tree_size};
pub use entry::CacheEntry;
pub use index::{CacheIndex, CacheStats};
