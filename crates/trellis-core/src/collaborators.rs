//! Collaborator trait seams
//!
//! The acquisition core consumes these narrow contracts but owns none of
//! their implementations: credential storage, file copying during install,
//! and project-variable substitution all live in the host tool.

use crate::error::Result;
use std::collections::BTreeMap;
use std::path::Path;

/// Resolves registry credentials by registry id
pub trait CredentialStore: Send + Sync {
    /// Bearer token for the registry, or `None` for anonymous access
    fn get(&self, registry_id: &str) -> Option<String>;
}

/// A credential store that never resolves anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCredentials;

impl CredentialStore for NoCredentials {
    fn get(&self, _registry_id: &str) -> Option<String> {
        None
    }
}

/// Copies a template tree into a project directory during install
pub trait FileCopier: Send + Sync {
    fn copy_tree(&self, src: &Path, dst: &Path) -> Result<()>;
}

/// Applies install-time variables to a materialized template
pub trait VariableSubstitutor: Send + Sync {
    fn apply(&self, dir: &Path, vars: &BTreeMap<String, String>) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_credentials() {
        let store = NoCredentials;
        assert!(store.get("any").is_none());
    }

    #[test]
    fn test_credential_store_is_object_safe() {
        let store: Box<dyn CredentialStore> = Box::new(NoCredentials);
        assert!(store.get("acme").is_none());
    }
}
