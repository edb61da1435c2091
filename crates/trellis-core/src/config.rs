//! Acquisition configuration
//!
//! The core never reads the global environment; the host passes an explicit
//! [`AcquisitionConfig`] down to the coordinator. Test isolation falls out
//! for free: point `cache_root` at a throwaway directory.

use crate::types::RegistryConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Named cache-aggressiveness tier mapped to a concrete TTL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TtlTier {
    /// 5 minutes
    Aggressive,
    /// 60 minutes
    Default,
    /// 24 hours
    Conservative,
    /// Caching disabled: every lookup is a miss
    None,
}

impl TtlTier {
    /// Concrete TTL for this tier; `None` for the always-miss tier
    pub fn ttl(&self) -> Option<Duration> {
        match self {
            TtlTier::Aggressive => Some(Duration::from_secs(5 * 60)),
            TtlTier::Default => Some(Duration::from_secs(60 * 60)),
            TtlTier::Conservative => Some(Duration::from_secs(24 * 60 * 60)),
            TtlTier::None => None,
        }
    }
}

impl Default for TtlTier {
    fn default() -> Self {
        Self::Default
    }
}

/// Per-check enable flags and strictness for the validation pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationFlags {
    /// Promote selected warnings to errors
    #[serde(default)]
    pub strict_mode: bool,

    #[serde(default = "ValidationFlags::enabled")]
    pub enable_schema_validation: bool,

    #[serde(default = "ValidationFlags::enabled")]
    pub enable_security_validation: bool,

    #[serde(default = "ValidationFlags::enabled")]
    pub enable_structure_validation: bool,

    #[serde(default = "ValidationFlags::enabled")]
    pub enable_dependency_validation: bool,

    #[serde(default = "ValidationFlags::enabled")]
    pub enable_version_validation: bool,
}

impl ValidationFlags {
    fn enabled() -> bool {
        true
    }
}

impl Default for ValidationFlags {
    fn default() -> Self {
        Self {
            strict_mode: false,
            enable_schema_validation: true,
            enable_security_validation: true,
            enable_structure_validation: true,
            enable_dependency_validation: true,
            enable_version_validation: true,
        }
    }
}

/// Everything the acquisition core needs from its host
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcquisitionConfig {
    /// Root directory for committed cache entries
    pub cache_root: PathBuf,

    /// Cache expiry policy
    #[serde(default)]
    pub ttl_tier: TtlTier,

    /// Configured registries, consulted in priority order
    #[serde(default)]
    pub registries: Vec<RegistryConfig>,

    /// Deadline for each network operation (fetch, clone)
    #[serde(default = "AcquisitionConfig::default_network_timeout")]
    pub network_timeout_secs: u64,

    /// Deadline for the whole validation pipeline
    #[serde(default = "AcquisitionConfig::default_validation_timeout")]
    pub validation_timeout_secs: u64,

    /// Validation pipeline flags
    #[serde(default)]
    pub validation: ValidationFlags,

    /// Host tool version, checked against template `supportedVersions`
    pub host_version: String,
}

impl AcquisitionConfig {
    fn default_network_timeout() -> u64 {
        120
    }

    fn default_validation_timeout() -> u64 {
        30
    }

    /// Configuration rooted at an explicit cache directory
    pub fn new(cache_root: impl Into<PathBuf>, host_version: impl Into<String>) -> Self {
        Self {
            cache_root: cache_root.into(),
            ttl_tier: TtlTier::default(),
            registries: Vec::new(),
            network_timeout_secs: Self::default_network_timeout(),
            validation_timeout_secs: Self::default_validation_timeout(),
            validation: ValidationFlags::default(),
            host_version: host_version.into(),
        }
    }

    /// Network deadline as a `Duration`
    pub fn network_timeout(&self) -> Duration {
        Duration::from_secs(self.network_timeout_secs)
    }

    /// Validation deadline as a `Duration`
    pub fn validation_timeout(&self) -> Duration {
        Duration::from_secs(self.validation_timeout_secs)
    }
}

/// Default cache root under the platform cache directory
///
/// Provided as a convenience for hosts; the core itself only ever uses the
/// explicit `cache_root` it was given.
pub fn default_cache_root() -> Option<PathBuf> {
    dirs::cache_dir().map(|d| d.join("trellis").join("templates"))
}
