//! Package removal
//!
//! The install directory decides whether a package can be uninstalled; the
//! record entry is removed when present but its absence is not an error.

use std::fs;

use log::info;

use crate::error::{PackageError, PackageResult};
use crate::paths::{Paths, is_valid_package_name};
use crate::prompt::Prompt;
use crate::record::RecordStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UninstallOutcome {
    Removed { name: String, record_removed: bool },
    Cancelled { name: String },
}

pub struct Uninstaller<'a> {
    paths: &'a Paths,
    records: &'a RecordStore,
    prompt: &'a dyn Prompt,
    assume_yes: bool,
}

impl<'a> Uninstaller<'a> {
    pub fn new(
        paths: &'a Paths,
        records: &'a RecordStore,
        prompt: &'a dyn Prompt,
        assume_yes: bool,
    ) -> Self {
        Self {
            paths,
            records,
            prompt,
            assume_yes,
        }
    }

    pub fn uninstall(&self, requested: &str) -> PackageResult<UninstallOutcome> {
        let name = self.resolve_name(requested);
        let not_installed =
            || PackageError::NotFound(format!("Package '{requested}' is not installed."));

        if !is_valid_package_name(&name) {
            return Err(not_installed());
        }

        let install_dir = self.paths.install_dir(&name);
        if !install_dir.exists() {
            return Err(not_installed());
        }

        if !self.assume_yes {
            let question = format!("Are you sure you want to uninstall '{name}'?");
            if !self.prompt.confirm(&question)? {
                info!("Uninstallation of '{name}' cancelled");
                return Ok(UninstallOutcome::Cancelled { name });
            }
        }

        fs::remove_dir_all(&install_dir).map_err(|e| {
            PackageError::io(format!("Failed to remove {}", install_dir.display()), e)
        })?;
        info!("Removed {}", install_dir.display());

        let record_removed = self.records.delete_entry(&name)?;
        Ok(UninstallOutcome::Removed {
            name,
            record_removed,
        })
    }

    /// Spelling of `requested` as installed
    ///
    /// Tries the record (exact, then case-insensitive), then an install
    /// directory under the root matched case-insensitively, then the name as typed.
    fn resolve_name(&self, requested: &str) -> String {
        let record = self.records.read();
        if record.contains_key(requested) {
            return requested.to_string();
        }
        if let Some(key) = record
            .into_keys()
            .find(|key| key.eq_ignore_ascii_case(requested))
        {
            return key;
        }
        if self.paths.install_dir(requested).is_dir() {
            return requested.to_string();
        }
        self.find_install_dir(requested)
            .unwrap_or_else(|| requested.to_string())
    }

    fn find_install_dir(&self, requested: &str) -> Option<String> {
        let entries = fs::read_dir(self.paths.root()).ok()?;
        entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_ok_and(|kind| kind.is_dir()))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .find(|name| name.eq_ignore_ascii_case(requested))
    }
}
