//! # trellis-core
//!
//! Core library for the Trellis template toolkit providing:
//! - Template package types and manifest parsing (template.yaml)
//! - The acquisition error taxonomy
//! - Acquisition configuration (cache root, TTL tiers, registry endpoints)
//! - Collaborator trait seams (credentials, file copy, variable substitution)

pub mod collaborators;
pub mod config;
pub mod error;
pub mod manifest;
pub mod paths;
pub mod types;

pub use config::{AcquisitionConfig, TtlTier, ValidationFlags};
pub use error::{Error, Result};
pub use manifest::{load_manifest, parse_manifest, MANIFEST_FILE};
pub use paths::is_protected_path;
