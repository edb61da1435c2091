//! The acquisition coordinator
//!
//! One acquisition is a strict sequence: classify the identifier, consult
//! the cache, fetch into private staging, validate, commit. A failure at
//! any stage drops the staging directory; the cache never sees an artifact
//! that has not passed validation.
//!
//! Concurrent misses on the same (template id, version) key serialize on an
//! in-process per-key lock, so the second caller finds the winner's commit
//! and never downloads.

use camino::Utf8PathBuf;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use trellis_cache::{CacheIndex, CacheStats};
use trellis_core::collaborators::CredentialStore;
use trellis_core::error::{Error, Result};
use trellis_core::types::{GitRef, GitRepositoryRef, TemplateSource};
use trellis_core::{load_manifest, AcquisitionConfig};
use trellis_git::CloneOptions;
use trellis_registry::RegistrySource;
use trellis_validate::TemplateValidator;

/// Per-call acquisition options
#[derive(Debug, Clone, Copy, Default)]
pub struct AcquireOptions {
    /// Skip the cache lookup; fetch, validate, and commit fresh
    pub force_download: bool,
}

/// Outcome of a successful acquisition
#[derive(Debug, Clone)]
pub struct Acquisition {
    /// Committed cache path holding the validated template
    pub path: PathBuf,

    /// True when the artifact came from the cache without network I/O
    pub from_cache: bool,
}

/// Coordinates transports, the cache, and the validator
pub struct AcquisitionCoordinator {
    config: AcquisitionConfig,
    index: Arc<Mutex<CacheIndex>>,
    registry: RegistrySource,
    validator: TemplateValidator,
    key_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AcquisitionCoordinator {
    /// Open the cache root and wire up transports and the validator
    pub fn new(
        config: AcquisitionConfig,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self> {
        let index = CacheIndex::open(&config.cache_root)?;
        let registry = RegistrySource::new(
            config.registries.clone(),
            config.network_timeout(),
            credentials,
        )?;
        let validator = TemplateValidator::from_config(&config);

        Ok(Self {
            config,
            index: Arc::new(Mutex::new(index)),
            registry,
            validator,
            key_locks: Mutex::new(HashMap::new()),
        })
    }

    /// Acquire a template, from cache when possible
    ///
    /// `version: None` means the registry's `latest` dist-tag (or the git
    /// default branch), which always resolves over the network.
    pub async fn acquire(
        &self,
        template_id: &str,
        version: Option<&str>,
        options: AcquireOptions,
    ) -> Result<Acquisition> {
        let source = TemplateSource::from_id(template_id)?;
        debug!("Acquiring {} as {}", template_id, source);

        let lock = self.key_lock(template_id, version).await;
        let _guard = lock.lock().await;

        if !options.force_download {
            if let Some(version) = version {
                let mut index = self.index.lock().await;
                if let Some(entry) = index.lookup(template_id, version, self.config.ttl_tier) {
                    info!("Cache hit for {}@{}", template_id, version);
                    return Ok(Acquisition {
                        path: entry.path,
                        from_cache: true,
                    });
                }
            }
        }

        let staging = TempDir::new()?;
        let artifact = staging.path().join("artifact");

        let fetched_version = match &source {
            TemplateSource::Registry { name } => {
                Some(self.registry.fetch(name, version, &artifact).await?.version)
            }
            TemplateSource::Git { url } => {
                self.fetch_git(url, version, &artifact).await?;
                // A pinned git acquisition keeps the caller's ref as its
                // cache identity so the same call hits the cache next time
                version.map(str::to_string)
            }
        };

        let package = load_manifest(&artifact)?;
        // An unpinned git artifact is identified by its manifest version
        let resolved_version =
            fetched_version.unwrap_or_else(|| package.version.clone());

        let verdict = self.validator.validate(&package, &artifact, None).await?;
        if !verdict.is_valid {
            warn!(
                "Validation of {}@{} failed, discarding download",
                template_id, resolved_version
            );
            return Err(Error::validation(verdict));
        }

        let mut index = self.index.lock().await;
        if options.force_download {
            // A fresh copy was demanded; make room for it
            index.evict(template_id, &resolved_version)?;
        }
        let entry = index.commit(template_id, &resolved_version, &artifact)?;

        info!(
            "Acquired {}@{} into cache at {:?}",
            template_id, resolved_version, entry.path
        );
        Ok(Acquisition {
            path: entry.path,
            from_cache: false,
        })
    }

    /// Clone a git identifier into the staging directory
    ///
    /// An explicit `version` argument overrides any `#ref` fragment in the
    /// identifier. The clone's `.git` metadata is stripped so history never
    /// reaches validation or the cache.
    async fn fetch_git(&self, url: &str, version: Option<&str>, artifact: &Path) -> Result<()> {
        let mut repo = GitRepositoryRef::parse(url)?;
        if let Some(version) = version {
            repo.reference = Some(GitRef::Tag(version.to_string()));
        }

        let destination = Utf8PathBuf::from_path_buf(artifact.to_path_buf())
            .map_err(|p| Error::transport("clone", url, format!("non-UTF-8 path: {:?}", p)))?;

        let options = CloneOptions {
            timeout: self.config.network_timeout(),
            ..CloneOptions::default()
        };

        trellis_git::fetch_repository(&repo, &destination, &options).await?;

        let git_dir = artifact.join(".git");
        if git_dir.exists() {
            std::fs::remove_dir_all(&git_dir)?;
        }
        Ok(())
    }

    /// Aggregate statistics over the committed cache
    pub async fn cache_stats(&self) -> CacheStats {
        self.index.lock().await.stats()
    }

    /// Purge every cache entry
    pub async fn clear_cache(&self) -> Result<()> {
        self.index.lock().await.clear()
    }

    /// Lock guarding concurrent acquisitions of one (id, version) key
    ///
    /// Locks nobody holds any more are pruned on the way in, keeping the
    /// map bounded by the number of in-flight acquisitions.
    async fn key_lock(&self, template_id: &str, version: Option<&str>) -> Arc<Mutex<()>> {
        let key = format!("{}@{}", template_id, version.unwrap_or("latest"));
        let mut locks = self.key_locks.lock().await;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(key).or_default().clone()
    }
}
