//! Filesystem layout for the manifest cache, installation record and package directories

use std::path::{Component, Path, PathBuf};

const ORG_DIR: &str = "radonteam";
const APP_DIR: &str = "packagebox";
const MANIFEST_FILE: &str = "packages.json";
const RECORD_FILE: &str = "record.json";

/// Resolved locations under a single application-data root
#[derive(Debug, Clone)]
pub struct Paths {
    root: PathBuf,
}

impl Paths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Platform-specific application-data root
    ///
    /// - Windows: `%APPDATA%\radonteam`
    /// - macOS: `~/Library/Application Support/radonteam`
    /// - Linux: `~/.local/share/radonteam`
    pub fn default_root() -> PathBuf {
        dirs::data_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("share")))
            .unwrap_or_else(std::env::temp_dir)
            .join(ORG_DIR)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(APP_DIR).join(MANIFEST_FILE)
    }

    pub fn record_path(&self) -> PathBuf {
        self.root.join(RECORD_FILE)
    }

    pub fn install_dir(&self, package_name: &str) -> PathBuf {
        self.root.join(package_name)
    }
}

/// True if `name` can be used as a single directory name under the root
pub fn is_valid_package_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}
