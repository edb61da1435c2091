//! Registry resolution and tarball acquisition
//!
//! Speaks the npm registry convention: `GET {url}/{package}` returns the
//! packument (all versions plus dist-tags), and each version's `dist.tarball`
//! points at a gzipped tarball whose contents live under a `package/` prefix.
//!
//! Registry selection is by configuration, not probing: the highest-priority
//! enabled registry whose scope matches the package wins.

use flate2::read::GzDecoder;
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use trellis_core::collaborators::CredentialStore;
use trellis_core::error::{Error, Result};
use trellis_core::types::{RegistryAuth, RegistryConfig};

/// Packument: the registry's full document for one package
#[derive(Debug, Deserialize)]
struct Packument {
    #[serde(rename = "dist-tags", default)]
    dist_tags: HashMap<String, String>,

    #[serde(default)]
    versions: HashMap<String, VersionMetadata>,
}

#[derive(Debug, Deserialize)]
struct VersionMetadata {
    dist: DistInfo,
}

#[derive(Debug, Deserialize)]
struct DistInfo {
    tarball: String,
}

/// Outcome of a registry fetch
#[derive(Debug)]
pub struct FetchedPackage {
    /// Concrete version that was resolved and extracted
    pub version: String,

    /// Registry the package came from
    pub registry_id: String,
}

/// Client for configured template registries
pub struct RegistrySource {
    client: reqwest::Client,
    registries: Vec<RegistryConfig>,
    credentials: Arc<dyn CredentialStore>,
    timeout_ms: u64,
}

impl RegistrySource {
    /// Create a client over the configured registries
    pub fn new(
        registries: Vec<RegistryConfig>,
        network_timeout: Duration,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(network_timeout)
            .build()
            .map_err(|e| Error::transport("client-init", "registry", e.to_string()))?;

        Ok(Self {
            client,
            registries,
            credentials,
            timeout_ms: network_timeout.as_millis() as u64,
        })
    }

    /// Pick the registry that serves `package`
    ///
    /// A registry scoped to the package always wins over an unscoped
    /// fallback; priority (lowest number first) breaks ties within each
    /// group.
    pub fn resolve_registry(&self, package: &str) -> Result<&RegistryConfig> {
        let (scoped, unscoped): (Vec<_>, Vec<_>) = self
            .registries
            .iter()
            .filter(|r| r.enabled && r.serves(package))
            .partition(|r| r.scope.is_some());

        scoped
            .into_iter()
            .min_by_key(|r| r.priority)
            .or_else(|| unscoped.into_iter().min_by_key(|r| r.priority))
            .ok_or_else(|| {
                Error::repository_not_found(
                    "resolve-registry",
                    package,
                    "no configured registry serves this package",
                )
            })
    }

    /// Fetch a package version and extract it into `destination`
    ///
    /// `version: None` resolves through the `latest` dist-tag. The tarball's
    /// `package/` wrapper directory is stripped so the template manifest
    /// lands at the destination root.
    pub async fn fetch(
        &self,
        package: &str,
        version: Option<&str>,
        destination: &Path,
    ) -> Result<FetchedPackage> {
        let registry = self.resolve_registry(package)?;
        let packument = self.fetch_packument(registry, package).await?;

        let resolved = match version {
            Some(v) => v.to_string(),
            None => packument
                .dist_tags
                .get("latest")
                .cloned()
                .ok_or_else(|| {
                    Error::repository_not_found(
                        "resolve-version",
                        package,
                        "packument has no 'latest' dist-tag",
                    )
                })?,
        };

        let metadata = packument.versions.get(&resolved).ok_or_else(|| {
            Error::ref_not_found("resolve-version", package, resolved.clone())
        })?;

        info!("Fetching {}@{} from registry {}", package, resolved, registry.id);

        let tarball = self
            .fetch_tarball(registry, package, &metadata.dist.tarball)
            .await?;
        extract_tarball(&tarball, destination)?;

        Ok(FetchedPackage {
            version: resolved,
            registry_id: registry.id.clone(),
        })
    }

    /// GET the packument for a package
    async fn fetch_packument(
        &self,
        registry: &RegistryConfig,
        package: &str,
    ) -> Result<Packument> {
        // npm convention: the slash inside a scoped name is percent-encoded
        let encoded = package.replace('/', "%2F");
        let url = format!("{}/{}", registry.url.trim_end_matches('/'), encoded);

        debug!("Requesting packument: {}", url);

        let mut request = self.client.get(&url);
        request = self.apply_auth(request, registry);

        let response = request
            .send()
            .await
            .map_err(|e| self.map_request_error("fetch-metadata", package, e))?;

        check_status("fetch-metadata", package, response.status())?;

        response
            .json::<Packument>()
            .await
            .map_err(|e| Error::transport("fetch-metadata", package, e.to_string()))
    }

    /// Download a version tarball
    async fn fetch_tarball(
        &self,
        registry: &RegistryConfig,
        package: &str,
        tarball_url: &str,
    ) -> Result<Vec<u8>> {
        debug!("Downloading tarball: {}", tarball_url);

        let mut request = self.client.get(tarball_url);
        request = self.apply_auth(request, registry);

        let response = request
            .send()
            .await
            .map_err(|e| self.map_request_error("fetch-tarball", package, e))?;

        check_status("fetch-tarball", package, response.status())?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.map_request_error("fetch-tarball", package, e))?;

        Ok(bytes.to_vec())
    }

    /// Map a reqwest failure to the error taxonomy
    fn map_request_error(&self, operation: &str, package: &str, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::timeout(operation, package, self.timeout_ms)
        } else {
            Error::transport(operation, package, err.to_string())
        }
    }

    /// Attach a bearer token when the registry requires one
    ///
    /// The token value itself is never logged.
    fn apply_auth(
        &self,
        request: reqwest::RequestBuilder,
        registry: &RegistryConfig,
    ) -> reqwest::RequestBuilder {
        match &registry.auth {
            RegistryAuth::None => request,
            RegistryAuth::Token { credential_id } => {
                match self.credentials.get(credential_id) {
                    Some(token) => {
                        request.header(AUTHORIZATION, format!("Bearer {}", token))
                    }
                    None => {
                        warn!(
                            "No credential '{}' for registry {}; proceeding anonymously",
                            credential_id, registry.id
                        );
                        request
                    }
                }
            }
        }
    }
}

/// Map an HTTP status to the error taxonomy
fn check_status(operation: &str, package: &str, status: StatusCode) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::authentication(
            operation,
            package,
            format!("registry returned {}", status),
        )),
        StatusCode::NOT_FOUND => Err(Error::repository_not_found(
            operation,
            package,
            format!("registry returned {}", status),
        )),
        other => Err(Error::transport(
            operation,
            package,
            format!("registry returned {}", other),
        )),
    }
}

/// Extract a gzipped npm tarball into `destination`
///
/// Every entry is screened first: a path that climbs out of the archive
/// root, or a link whose target resolves outside it, fails the whole
/// extraction. The archive is then unpacked into a scratch directory next
/// to `destination` (so symlink-mediated writes cannot land anywhere else)
/// and the conventional `package/` wrapper is dropped.
pub fn extract_tarball(bytes: &[u8], destination: &Path) -> Result<()> {
    screen_entries(bytes, destination)?;

    let parent = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent)?;
    let scratch = tempfile::tempdir_in(parent)?;

    let decoder = GzDecoder::new(bytes);
    let mut archive = tar::Archive::new(decoder);
    archive.unpack(scratch.path())?;

    std::fs::create_dir_all(destination)?;
    for child in std::fs::read_dir(unpack_root(scratch.path())?)? {
        let child = child?;
        std::fs::rename(child.path(), destination.join(child.file_name()))?;
    }
    Ok(())
}

/// Reject entries that would write outside the archive root
fn screen_entries(bytes: &[u8], destination: &Path) -> Result<()> {
    let decoder = GzDecoder::new(bytes);
    let mut archive = tar::Archive::new(decoder);

    for entry in archive.entries()? {
        let entry = entry?;
        let path = entry.path()?.into_owned();

        let safe = path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !safe {
            return Err(escape_error(destination, &path));
        }

        if let Some(link) = entry.link_name()? {
            if !link_stays_inside(&path, &link) {
                return Err(escape_error(destination, &path));
            }
        }
    }
    Ok(())
}

fn escape_error(destination: &Path, entry: &Path) -> Error {
    Error::transport(
        "extract",
        destination.display().to_string(),
        format!("tarball entry escapes destination: {}", entry.display()),
    )
}

/// True when a link target cannot resolve above the archive root
///
/// Relative targets resolve from the entry's parent directory; the lexical
/// depth count rejects any chain of `..` that climbs past the root.
fn link_stays_inside(entry_path: &Path, target: &Path) -> bool {
    if target.is_absolute() {
        return false;
    }
    let mut depth = entry_path
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .count() as i64
        - 1;
    for component in target.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            Component::CurDir => {}
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    true
}

/// Root to copy from: the `package/` wrapper when it is the sole top-level
/// entry, otherwise the unpacked tree itself
fn unpack_root(scratch: &Path) -> Result<PathBuf> {
    let wrapper = scratch.join("package");
    let mut children = std::fs::read_dir(scratch)?;
    let only_wrapper = match (children.next(), children.next()) {
        (Some(first), None) => first?.path() == wrapper && wrapper.is_dir(),
        _ => false,
    };
    Ok(if only_wrapper {
        wrapper
    } else {
        scratch.to_path_buf()
    })
}
