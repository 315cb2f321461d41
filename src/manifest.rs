//! Package manifest model and the local manifest cache

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::download::Downloader;
use crate::error::{PackageError, PackageResult};
use crate::platform::Platform;

/// Catalog of installable packages
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub packages: Vec<Package>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updateurl: Option<String>,
}

/// One manifest entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub os: Vec<String>,
    #[serde(default)]
    pub requirepath: bool,
    #[serde(default)]
    pub shortcut: bool,
    #[serde(default)]
    pub url: HashMap<String, String>,
    #[serde(default)]
    pub sha256: HashMap<String, String>,
}

/// Download location and expected digest for one platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact<'a> {
    pub url: &'a str,
    pub sha256: &'a str,
}

impl Manifest {
    /// Case-insensitive lookup by package name
    pub fn find(&self, name: &str) -> Option<&Package> {
        self.packages
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }
}

impl Package {
    pub fn supports(&self, platform: Platform) -> bool {
        self.os.iter().any(|id| platform.matches(id))
    }

    /// Artifact for `platform`; requires the platform in `os` plus both a `url` and `sha256` entry
    pub fn artifact_for(&self, platform: Platform) -> PackageResult<Artifact<'_>> {
        let unsupported = || PackageError::UnsupportedPlatform {
            package: self.name.clone(),
            platform: platform.to_string(),
        };

        if !self.supports(platform) {
            return Err(unsupported());
        }

        match (
            entry_for(&self.url, platform),
            entry_for(&self.sha256, platform),
        ) {
            (Some(url), Some(sha256)) => Ok(Artifact { url, sha256 }),
            _ => {
                warn!(
                    "Package '{}' lists {} but has no url/sha256 entry for it",
                    self.name, platform
                );
                Err(unsupported())
            }
        }
    }
}

/// Exact identifier key first, then the first alias match by key order
fn entry_for(map: &HashMap<String, String>, platform: Platform) -> Option<&str> {
    if let Some(value) = map.get(platform.identifier()) {
        return Some(value.as_str());
    }
    map.iter()
        .filter(|(id, _)| platform.matches(id))
        .min_by_key(|(id, _)| id.as_str())
        .map(|(_, value)| value.as_str())
}

/// Where `update` took its URL from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateSource {
    /// `updateurl` from the cached manifest
    Manifest(String),
    /// Configured default; the cached manifest was missing, malformed or had no override
    Default(String),
}

impl UpdateSource {
    pub fn url(&self) -> &str {
        match self {
            UpdateSource::Manifest(url) | UpdateSource::Default(url) => url,
        }
    }
}

/// Local manifest cache, refreshed from the network
#[derive(Debug, Clone)]
pub struct ManifestStore<D> {
    path: PathBuf,
    bootstrap_url: String,
    default_update_url: String,
    downloader: D,
}

impl<D: Downloader> ManifestStore<D> {
    pub fn new(
        path: impl Into<PathBuf>,
        bootstrap_url: impl Into<String>,
        default_update_url: impl Into<String>,
        downloader: D,
    ) -> Self {
        Self {
            path: path.into(),
            bootstrap_url: bootstrap_url.into(),
            default_update_url: default_update_url.into(),
            downloader,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Download the manifest from the bootstrap URL if no cache exists
    ///
    /// Returns `true` when a download happened.
    pub async fn ensure(&self) -> PackageResult<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        info!(
            "Package list not found at {}, downloading from {}",
            self.path.display(),
            self.bootstrap_url
        );
        self.fetch_into_cache(&self.bootstrap_url).await?;
        Ok(true)
    }

    /// Refresh the cache from `updateurl` (or the default URL) and overwrite it
    pub async fn update(&self) -> PackageResult<UpdateSource> {
        let source = match self.load() {
            Ok(Manifest {
                updateurl: Some(url),
                ..
            }) if !url.trim().is_empty() => UpdateSource::Manifest(url),
            Ok(_) => UpdateSource::Default(self.default_update_url.clone()),
            Err(e) => {
                warn!("{e}; using default update URL {}", self.default_update_url);
                UpdateSource::Default(self.default_update_url.clone())
            }
        };

        info!("Updating package list from {}", source.url());
        self.fetch_into_cache(source.url()).await?;
        Ok(source)
    }

    /// Parse the cached manifest
    pub fn load(&self) -> PackageResult<Manifest> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            if e.kind() == IoErrorKind::NotFound {
                PackageError::NotFound(
                    "Package list not found. Try running the 'update' command to fetch the package list."
                        .to_string(),
                )
            } else {
                PackageError::io(format!("Failed to read {}", self.path.display()), e)
            }
        })?;

        serde_json::from_str(&content).map_err(|source| PackageError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    async fn fetch_into_cache(&self, url: &str) -> PackageResult<()> {
        let dir = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&dir)
            .map_err(|e| PackageError::io(format!("Failed to create {}", dir.display()), e))?;

        let tmp = NamedTempFile::new_in(&dir)
            .map_err(|e| PackageError::io(format!("Failed to stage download in {}", dir.display()), e))?;
        self.downloader.fetch(url, tmp.path(), &mut |_, _| {}).await?;

        tmp.persist(&self.path).map_err(|e| {
            PackageError::io(format!("Failed to replace {}", self.path.display()), e.error)
        })?;

        if let Err(e) = self.load() {
            warn!("Downloaded package list does not parse: {e}");
        }
        Ok(())
    }
}
