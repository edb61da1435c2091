//! Error types for trellis-core
//!
//! Every acquisition-facing error carries the operation that failed, the
//! subject it failed on, and a capture timestamp, so callers can decide
//! retry vs. abort without parsing message text.

use crate::types::ValidationResult;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type alias using trellis-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for template acquisition
#[derive(Error, Debug)]
pub enum Error {
    /// Template identifier matches neither the registry nor the git shape
    #[error("Unsupported template identifier: {id}. Expected a registry package name or a git URL")]
    UnsupportedTemplateType { id: String },

    /// Cached artifact failed an integrity check
    #[error("Cache integrity check failed for {entry}: {reason}")]
    CacheIntegrity {
        entry: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// Refused to delete a protected path
    #[error("Refusing to remove protected path: {path}")]
    UnsafePath { path: String },

    /// Transport-level authentication failure
    #[error("Authentication failed during {operation} on {repository}: {cause}")]
    Authentication {
        operation: String,
        repository: String,
        cause: String,
        timestamp: DateTime<Utc>,
    },

    /// Remote repository or registry package does not exist
    #[error("Repository not found during {operation}: {repository}")]
    RepositoryNotFound {
        operation: String,
        repository: String,
        cause: String,
        timestamp: DateTime<Utc>,
    },

    /// Requested branch/tag/commit is absent from the remote
    #[error("Ref '{reference}' not found in {repository}")]
    RefNotFound {
        operation: String,
        repository: String,
        reference: String,
        timestamp: DateTime<Utc>,
    },

    /// Generic transport failure (network, protocol, subprocess)
    #[error("Transport failure during {operation} on {repository}: {cause}")]
    Transport {
        operation: String,
        repository: String,
        cause: String,
        timestamp: DateTime<Utc>,
    },

    /// Template failed the validation pipeline; carries the full verdict
    #[error("Template validation failed with {} error(s)", result.errors.len())]
    Validation { result: Box<ValidationResult> },

    /// The validation pipeline exceeded its configured deadline
    #[error("Validation timed out after {timeout_ms}ms")]
    ValidationTimeout {
        timeout_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A network or subprocess operation exceeded its deadline
    #[error("Operation '{operation}' on {subject} timed out after {timeout_ms}ms")]
    Timeout {
        operation: String,
        subject: String,
        timeout_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// Manifest file missing from an artifact directory
    #[error("Template manifest not found at: {path}")]
    ManifestNotFound { path: String },

    /// Invalid semver version
    #[error("Invalid version format: {version}")]
    InvalidVersion { version: String },

    /// Missing required field
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Semver parsing error
    #[error("Semver error: {0}")]
    Semver(#[from] semver::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an unsupported template type error
    pub fn unsupported_template_type(id: impl Into<String>) -> Self {
        Self::UnsupportedTemplateType { id: id.into() }
    }

    /// Create a cache integrity error
    pub fn cache_integrity(entry: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CacheIntegrity {
            entry: entry.into(),
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create an unsafe path error
    pub fn unsafe_path(path: impl Into<String>) -> Self {
        Self::UnsafePath { path: path.into() }
    }

    /// Create an authentication error
    pub fn authentication(
        operation: impl Into<String>,
        repository: impl Into<String>,
        cause: impl Into<String>,
    ) -> Self {
        Self::Authentication {
            operation: operation.into(),
            repository: repository.into(),
            cause: cause.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a repository not found error
    pub fn repository_not_found(
        operation: impl Into<String>,
        repository: impl Into<String>,
        cause: impl Into<String>,
    ) -> Self {
        Self::RepositoryNotFound {
            operation: operation.into(),
            repository: repository.into(),
            cause: cause.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a ref not found error
    pub fn ref_not_found(
        operation: impl Into<String>,
        repository: impl Into<String>,
        reference: impl Into<String>,
    ) -> Self {
        Self::RefNotFound {
            operation: operation.into(),
            repository: repository.into(),
            reference: reference.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a generic transport error
    pub fn transport(
        operation: impl Into<String>,
        repository: impl Into<String>,
        cause: impl Into<String>,
    ) -> Self {
        Self::Transport {
            operation: operation.into(),
            repository: repository.into(),
            cause: cause.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a validation error wrapping a full verdict
    pub fn validation(result: ValidationResult) -> Self {
        Self::Validation {
            result: Box::new(result),
        }
    }

    /// Create a validation timeout error
    pub fn validation_timeout(timeout_ms: u64) -> Self {
        Self::ValidationTimeout {
            timeout_ms,
            timestamp: Utc::now(),
        }
    }

    /// Create an operation timeout error
    pub fn timeout(
        operation: impl Into<String>,
        subject: impl Into<String>,
        timeout_ms: u64,
    ) -> Self {
        Self::Timeout {
            operation: operation.into(),
            subject: subject.into(),
            timeout_ms,
            timestamp: Utc::now(),
        }
    }

    /// Create a manifest not found error
    pub fn manifest_not_found(path: impl Into<String>) -> Self {
        Self::ManifestNotFound { path: path.into() }
    }

    /// Create an invalid version error
    pub fn invalid_version(version: impl Into<String>) -> Self {
        Self::InvalidVersion {
            version: version.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// True if this error is recoverable by evicting and re-fetching
    pub fn is_cache_recoverable(&self) -> bool {
        matches!(self, Self::CacheIntegrity { .. })
    }
}
