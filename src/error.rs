//! Error taxonomy for manifest, record, download and install operations

use std::path::PathBuf;

use thiserror::Error;

/// Broad classification of a [`PackageError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Parse,
    UnsupportedPlatform,
    Network,
    Integrity,
    Io,
    Prompt,
}

/// Errors that abort the current command
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("{0}")]
    NotFound(String),

    #[error("Failed to read {} (corrupted or invalid JSON)", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("'{package}' is not available for your platform ({platform})")]
    UnsupportedPlatform { package: String, platform: String },

    #[error("Failed to download {url}: {message}")]
    Network { url: String, message: String },

    #[error("Checksum mismatch for {package} (expected sha256 {expected}). Installation aborted.")]
    Integrity { package: String, expected: String },

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Confirmation prompt failed: {0}")]
    Prompt(String),
}

impl PackageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PackageError::NotFound(_) => ErrorKind::NotFound,
            PackageError::Parse { .. } => ErrorKind::Parse,
            PackageError::UnsupportedPlatform { .. } => ErrorKind::UnsupportedPlatform,
            PackageError::Network { .. } => ErrorKind::Network,
            PackageError::Integrity { .. } => ErrorKind::Integrity,
            PackageError::Io { .. } => ErrorKind::Io,
            PackageError::Prompt(_) => ErrorKind::Prompt,
        }
    }

    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        PackageError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn network(url: &str, message: impl ToString) -> Self {
        PackageError::Network {
            url: url.to_string(),
            message: message.to_string(),
        }
    }
}

pub type PackageResult<T> = Result<T, PackageError>;
