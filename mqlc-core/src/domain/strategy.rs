//! Compiler strategy domain types

use serde::{Deserialize, Serialize};

/// Operating platform the service runs on
///
/// Read once from the runtime at startup; never configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Windows,
    Linux,
    MacOs,
    Other,
}

impl Platform {
    /// Detects the platform this binary was built for
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    /// Maps a `std::env::consts::OS` style name to a platform
    pub fn from_os(os: &str) -> Self {
        match os {
            "windows" => Platform::Windows,
            "linux" => Platform::Linux,
            "macos" => Platform::MacOs,
            _ => Platform::Other,
        }
    }

    /// Whether the compiler executable runs here without an emulation layer
    pub fn is_native(self) -> bool {
        matches!(self, Platform::Windows)
    }
}

/// How the external compiler gets invoked for a job
///
/// Chosen once per job from the configured compiler path and the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompilerStrategy {
    /// Run the compiler executable directly
    Native,
    /// Wrap the compiler in an emulation layer (wine)
    Emulation,
    /// Call the configured path directly as an already compatible stand-in
    Mock,
}

impl std::fmt::Display for CompilerStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CompilerStrategy::Native => "native",
            CompilerStrategy::Emulation => "emulation",
            CompilerStrategy::Mock => "mock",
        };
        f.write_str(name)
    }
}
