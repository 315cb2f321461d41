use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::paths::Paths;

pub const CONFIG_ENV: &str = "PACKAGEBOX_CONFIG";
pub const HOME_ENV: &str = "PACKAGEBOX_HOME";

const DEFAULT_BOOTSTRAP_URL: &str =
    "https://raw.githubusercontent.com/radonorg/packagebox/refs/heads/main/packages.json";
const DEFAULT_UPDATE_URL: &str =
    "https://raw.githubusercontent.com/radonorg/packagebox/main/packages.json";

/// User configuration (`config.toml`); every key is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application-data root; defaults to the platform data directory
    pub data_dir: Option<PathBuf>,
    /// Manifest source used when no cached manifest exists yet
    pub bootstrap_url: String,
    /// Update source when the cached manifest has no `updateurl`
    pub update_url: String,
    pub user_agent: String,
    /// Unset means no connect timeout
    pub connect_timeout_secs: Option<u64>,
    /// Create desktop shortcuts for packages that ask for one
    pub shortcuts: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            bootstrap_url: DEFAULT_BOOTSTRAP_URL.to_string(),
            update_url: DEFAULT_UPDATE_URL.to_string(),
            user_agent: format!("packagebox/{}", env!("CARGO_PKG_VERSION")),
            connect_timeout_secs: None,
            shortcuts: true,
        }
    }
}

impl Config {
    /// `$PACKAGEBOX_CONFIG`, else `<config_dir>/packagebox/config.toml`
    pub fn config_path() -> Option<PathBuf> {
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .or_else(|| dirs::config_dir().map(|dir| dir.join("packagebox").join("config.toml")))
    }

    pub fn load_or_default() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Missing file yields defaults; a malformed file is an error
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// `$PACKAGEBOX_HOME`, then `data_dir`, then the platform default
    pub fn data_root(&self) -> PathBuf {
        self.data_root_with(std::env::var_os(HOME_ENV))
    }

    fn data_root_with(&self, home_override: Option<OsString>) -> PathBuf {
        home_override
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .or_else(|| self.data_dir.clone())
            .unwrap_or_else(Paths::default_root)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }
}
