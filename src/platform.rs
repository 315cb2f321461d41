//! Platform detection and manifest platform identifiers

use std::fmt;

/// Operating system family the manifest keys artifacts by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Linux,
    MacOs,
    /// Anything else; never matches a manifest entry
    Other,
}

impl Platform {
    /// Detect the platform this binary was built for
    pub fn detect() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    fn from_os(os: &str) -> Self {
        match os {
            "windows" => Platform::Windows,
            "linux" => Platform::Linux,
            "macos" => Platform::MacOs,
            _ => Platform::Other,
        }
    }

    /// Parse a manifest identifier such as `"Linux"` or `"Darwin"`
    pub fn from_identifier(id: &str) -> Option<Self> {
        match id.trim().to_ascii_lowercase().as_str() {
            "windows" => Some(Platform::Windows),
            "linux" => Some(Platform::Linux),
            "darwin" | "macos" | "osx" => Some(Platform::MacOs),
            _ => None,
        }
    }

    /// Canonical manifest identifier
    pub fn identifier(&self) -> &'static str {
        match self {
            Platform::Windows => "Windows",
            Platform::Linux => "Linux",
            Platform::MacOs => "Darwin",
            Platform::Other => "Unknown",
        }
    }

    pub fn matches(&self, id: &str) -> bool {
        Self::from_identifier(id) == Some(*self)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}
