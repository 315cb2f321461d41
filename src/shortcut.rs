//! Best-effort desktop shortcuts for installed packages

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Creates a desktop entry pointing at an installed file
///
/// Failures are reported to the user as warnings and never fail an install.
pub trait ShortcutCreator {
    /// Create a shortcut named `name` for `target`, returning the shortcut path
    fn create(&self, target: &Path, name: &str) -> Result<PathBuf>;
}

/// Shortcut on the user's desktop directory
#[derive(Debug, Clone)]
pub struct DesktopShortcut {
    desktop: Option<PathBuf>,
}

impl DesktopShortcut {
    pub fn new() -> Self {
        Self {
            desktop: dirs::desktop_dir(),
        }
    }

    #[cfg(test)]
    pub fn in_dir(desktop: impl Into<PathBuf>) -> Self {
        Self {
            desktop: Some(desktop.into()),
        }
    }
}

impl Default for DesktopShortcut {
    fn default() -> Self {
        Self::new()
    }
}

impl ShortcutCreator for DesktopShortcut {
    fn create(&self, target: &Path, name: &str) -> Result<PathBuf> {
        let desktop = self
            .desktop
            .as_deref()
            .context("Could not determine the desktop directory")?;
        std::fs::create_dir_all(desktop)
            .with_context(|| format!("Failed to create {}", desktop.display()))?;
        create_link(desktop, target, name)
    }
}

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        fn create_link(desktop: &Path, target: &Path, name: &str) -> Result<PathBuf> {
            let link = desktop.join(format!("{name}.url"));
            let target_url = url::Url::from_file_path(target)
                .map_err(|_| anyhow::anyhow!("Not an absolute path: {}", target.display()))?;
            let content = format!(
                "[InternetShortcut]\r\nURL={target_url}\r\nIconFile={}\r\nIconIndex=0\r\n",
                target.display()
            );
            std::fs::write(&link, content)
                .with_context(|| format!("Failed to write {}", link.display()))?;
            Ok(link)
        }
    } else if #[cfg(unix)] {
        fn create_link(desktop: &Path, target: &Path, name: &str) -> Result<PathBuf> {
            let file_name = if cfg!(target_os = "macos") {
                format!("{name}.app")
            } else {
                name.to_string()
            };
            let link = desktop.join(file_name);

            // Replace a link left behind by an earlier install
            if link.is_symlink() {
                std::fs::remove_file(&link)
                    .with_context(|| format!("Failed to remove stale {}", link.display()))?;
            }
            std::os::unix::fs::symlink(target, &link)
                .with_context(|| format!("Failed to link {}", link.display()))?;
            Ok(link)
        }
    } else {
        fn create_link(_desktop: &Path, _target: &Path, name: &str) -> Result<PathBuf> {
            anyhow::bail!("Shortcuts are not supported on this platform ({name})")
        }
    }
}
