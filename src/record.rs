//! Persisted record of installed packages
//!
//! The record is derived state: a missing or unreadable file is treated as an
//! empty record. Entries are parsed one at a time, so a single malformed entry
//! is skipped without hiding its siblings, and it is written back untouched
//! when another entry changes. Writes replace the whole file through a temp
//! file + rename.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::{debug, info, warn};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;

use crate::error::{PackageError, PackageResult};

/// One installed package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordEntry {
    pub version: String,
    /// ISO-8601 local date-time, e.g. `2024-05-01T12:30:00.123456`
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub installed_on: NaiveDateTime,
}

pub type Record = BTreeMap<String, RecordEntry>;

/// Record file as stored, before entries are validated
type RawRecord = BTreeMap<String, Value>;

/// Accepts naive date-times, RFC 3339 timestamps with an offset and bare dates
///
/// Offset timestamps keep their wall-clock time; bare dates become midnight.
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    raw.parse::<NaiveDateTime>()
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.naive_local())
        })
        .or_else(|| {
            raw.parse::<NaiveDate>()
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{raw}'")))
}

/// File-backed installation record
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the record; absent or malformed files yield an empty record
    ///
    /// Entries that fail to parse are skipped individually.
    pub fn read(&self) -> Record {
        self.read_raw()
            .into_iter()
            .filter_map(|(name, value)| match serde_json::from_value(value) {
                Ok(entry) => Some((name, entry)),
                Err(e) => {
                    warn!(
                        "Skipping unreadable record entry '{name}' in {}: {e}",
                        self.path.display()
                    );
                    None
                }
            })
            .collect()
    }

    fn read_raw(&self) -> RawRecord {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                debug!("No readable record at {}: {e}", self.path.display());
                return RawRecord::new();
            }
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            debug!("Ignoring malformed record {}: {e}", self.path.display());
            RawRecord::new()
        })
    }

    /// Replace the record file with `record`
    fn write(&self, record: &RawRecord) -> PackageResult<()> {
        let parent = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&parent).map_err(|e| {
            PackageError::io(format!("Failed to create {}", parent.display()), e)
        })?;

        let io_err = |e| PackageError::io(format!("Failed to write {}", self.path.display()), e);

        let mut tmp = NamedTempFile::new_in(&parent).map_err(io_err)?;
        serde_json::to_writer_pretty(&mut tmp, record)
            .map_err(|e| io_err(std::io::Error::other(e)))?;
        tmp.write_all(b"\n").map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;

        info!("Wrote {} record entries to {}", record.len(), self.path.display());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<RecordEntry> {
        self.read().remove(name)
    }

    /// Insert or overwrite the entry for `name`; other entries are kept as stored
    pub fn set_entry(
        &self,
        name: &str,
        version: &str,
        installed_on: NaiveDateTime,
    ) -> PackageResult<()> {
        let entry = RecordEntry {
            version: version.to_string(),
            installed_on,
        };
        let value = serde_json::to_value(&entry).map_err(|e| {
            PackageError::io(
                format!("Failed to write {}", self.path.display()),
                std::io::Error::other(e),
            )
        })?;

        let mut raw = self.read_raw();
        raw.insert(name.to_string(), value);
        self.write(&raw)
    }

    /// Remove the entry for `name`; returns whether one existed
    pub fn delete_entry(&self, name: &str) -> PackageResult<bool> {
        let mut raw = self.read_raw();
        if raw.remove(name).is_none() {
            return Ok(false);
        }
        self.write(&raw)?;
        Ok(true)
    }
}
