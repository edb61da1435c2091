//! The validation pipeline
//!
//! Runs the five checks in a fixed order, never short-circuiting, and
//! merges their findings into one [`ValidationResult`]. The whole pipeline
//! runs under a deadline; expiry yields a single synthetic
//! `VALIDATION_TIMEOUT` error instead of a partial verdict.
//!
//! Verdicts are cached in-process keyed by template identity, content
//! checksum, and the rule-set version, so re-validating an unchanged
//! artifact is free.

use crate::checks::{self, CheckFindings};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use trellis_cache::hash_tree;
use trellis_core::types::{CheckMetadata, TemplatePackage, ValidationIssue, ValidationResult};
use trellis_core::{AcquisitionConfig, Result, ValidationFlags};

/// Bumped whenever check behavior changes, so stale cached verdicts die
pub const RULE_SET_VERSION: &str = "2026.1";

/// Warning codes promoted to errors under strict mode
const STRICT_PROMOTED: &[&str] = &["CONFLICTING_RANGES", "BREAKING_CHANGE"];

/// Template validation pipeline with an in-process verdict cache
pub struct TemplateValidator {
    flags: ValidationFlags,
    host_version: String,
    timeout: Duration,
    verdicts: Mutex<HashMap<String, ValidationResult>>,
    /// Artificial delay inside the blocking pipeline, for deadline tests
    #[cfg(test)]
    stall: Option<Duration>,
}

impl TemplateValidator {
    pub fn new(
        flags: ValidationFlags,
        host_version: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            flags,
            host_version: host_version.into(),
            timeout,
            verdicts: Mutex::new(HashMap::new()),
            #[cfg(test)]
            stall: None,
        }
    }

    /// Validator configured the way the host configured acquisition
    pub fn from_config(config: &AcquisitionConfig) -> Self {
        Self::new(
            config.validation.clone(),
            config.host_version.clone(),
            config.validation_timeout(),
        )
    }

    /// Validate an artifact, consulting the verdict cache first
    ///
    /// `previous_version` enables the breaking-change comparison when the
    /// caller knows which version this one replaces.
    pub async fn validate(
        &self,
        package: &TemplatePackage,
        path: &Path,
        previous_version: Option<&str>,
    ) -> Result<ValidationResult> {
        let checksum = hash_tree(path)?;
        let key = verdict_key(&package.id, &package.version, &checksum);

        if let Ok(verdicts) = self.verdicts.lock() {
            if let Some(hit) = verdicts.get(&key) {
                debug!("Validation verdict cache hit for {}", package.coordinate());
                return Ok(hit.clone());
            }
        }

        let result = self.run_pipeline(package, path, previous_version).await;

        match &result {
            Ok(verdict) if !verdict.has_code("VALIDATION_TIMEOUT") => {
                if let Ok(mut verdicts) = self.verdicts.lock() {
                    verdicts.insert(key, verdict.clone());
                }
            }
            _ => {}
        }

        result
    }

    /// Run all enabled checks under the pipeline deadline
    async fn run_pipeline(
        &self,
        package: &TemplatePackage,
        path: &Path,
        previous_version: Option<&str>,
    ) -> Result<ValidationResult> {
        let flags = self.flags.clone();
        let host_version = self.host_version.clone();
        let package = package.clone();
        let path: PathBuf = path.to_path_buf();
        let previous = previous_version.map(|p| p.to_string());

        #[cfg(test)]
        let stall = self.stall;

        let checks = tokio::task::spawn_blocking(move || {
            #[cfg(test)]
            if let Some(stall) = stall {
                std::thread::sleep(stall);
            }
            run_checks(&flags, &host_version, &package, &path, previous.as_deref())
        });

        match tokio::time::timeout(self.timeout, checks).await {
            Ok(joined) => {
                let verdict = joined.map_err(|e| {
                    std::io::Error::other(format!("validation task panicked: {}", e))
                })?;
                if verdict.is_valid {
                    info!("Validation passed");
                } else {
                    warn!("Validation failed with {} error(s)", verdict.errors.len());
                }
                Ok(verdict)
            }
            Err(_) => {
                warn!("Validation exceeded {}ms deadline", self.timeout.as_millis());
                Ok(ValidationResult::from_findings(
                    vec![ValidationIssue::new(
                        "VALIDATION_TIMEOUT",
                        format!(
                            "validation did not complete within {}ms",
                            self.timeout.as_millis()
                        ),
                    )],
                    Vec::new(),
                    Vec::new(),
                ))
            }
        }
    }
}

/// Execute the enabled checks in their fixed order and merge findings
fn run_checks(
    flags: &ValidationFlags,
    host_version: &str,
    package: &TemplatePackage,
    path: &Path,
    previous_version: Option<&str>,
) -> ValidationResult {
    let mut errors: Vec<ValidationIssue> = Vec::new();
    let mut warnings: Vec<ValidationIssue> = Vec::new();
    let mut metadata: Vec<CheckMetadata> = Vec::new();

    type Check<'a> = (&'a str, bool, Box<dyn FnOnce() -> CheckFindings + 'a>);
    let pipeline: Vec<Check> = vec![
        (
            "schema",
            flags.enable_schema_validation,
            Box::new(|| checks::schema::run(package)),
        ),
        (
            "security",
            flags.enable_security_validation,
            Box::new(|| checks::security::run(package, path)),
        ),
        (
            "structure",
            flags.enable_structure_validation,
            Box::new(|| checks::structure::run(package, path)),
        ),
        (
            "dependency",
            flags.enable_dependency_validation,
            Box::new(|| checks::dependency::run(package)),
        ),
        (
            "version",
            flags.enable_version_validation,
            Box::new(|| checks::version::run(package, host_version, previous_version)),
        ),
    ];

    for (name, enabled, check) in pipeline {
        if !enabled {
            continue;
        }
        let started = Instant::now();
        let findings = check();
        metadata.push(CheckMetadata {
            check: name.to_string(),
            passed: findings.passed(),
            duration_ms: started.elapsed().as_millis() as u64,
        });
        errors.extend(findings.errors);
        warnings.extend(findings.warnings);
    }

    if flags.strict_mode {
        let (promoted, kept): (Vec<_>, Vec<_>) = warnings
            .into_iter()
            .partition(|w| STRICT_PROMOTED.contains(&w.code.as_str()));
        errors.extend(promoted);
        warnings = kept;
    }

    ValidationResult::from_findings(errors, warnings, metadata)
}

/// Verdict cache key: identity, content, and rule-set version
fn verdict_key(id: &str, version: &str, checksum: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(id.as_bytes());
    hasher.update(b"\0");
    hasher.update(version.as_bytes());
    hasher.update(b"\0");
    hasher.update(checksum.as_bytes());
    hasher.update(b"\0");
    hasher.update(RULE_SET_VERSION.as_bytes());
    format!("{:x}", hasher.finalize())
}
