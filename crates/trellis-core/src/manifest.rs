//! Template manifest loading
//!
//! Every template artifact carries a `template.yaml` at its root describing
//! identity, declared files, dependencies, and the install-time variable
//! schema.

use crate::error::{Error, Result};
use crate::types::TemplatePackage;
use std::path::Path;
use tracing::debug;

/// Manifest file name at the artifact root
pub const MANIFEST_FILE: &str = "template.yaml";

/// Load and parse the manifest from an artifact directory
pub fn load_manifest(dir: &Path) -> Result<TemplatePackage> {
    let manifest_path = dir.join(MANIFEST_FILE);
    if !manifest_path.exists() {
        return Err(Error::manifest_not_found(manifest_path.display().to_string()));
    }

    debug!("Loading template manifest from {:?}", manifest_path);
    let content = std::fs::read_to_string(&manifest_path)?;
    parse_manifest(&content)
}

/// Parse manifest YAML content
pub fn parse_manifest(content: &str) -> Result<TemplatePackage> {
    let package: TemplatePackage = serde_yaml_ng::from_str(content)?;
    Ok(package)
}
