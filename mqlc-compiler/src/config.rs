//! Compiler configuration
//!
//! Process-wide settings for the compile core: where the compiler lives, how
//! long it may run, whether the fallback path is allowed and how long produced
//! artifacts stay around. Built once at startup and shared by reference; the
//! orchestrator never reads the environment itself.

use mqlc_core::domain::strategy::Platform;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default MetaTrader installation root
pub const DEFAULT_INSTALL_ROOT: &str = "/opt/metatrader5";

/// File name of the MetaEditor compiler inside the installation root
pub const COMPILER_EXECUTABLE: &str = "metaeditor64.exe";

/// Compile core configuration
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// MetaTrader installation root
    pub install_root: PathBuf,

    /// Full path of the compiler executable
    pub compiler_path: PathBuf,

    /// Emulation layer used when the compiler is not native to the platform
    pub emulator: String,

    /// Platform the service runs on
    pub platform: Platform,

    /// Hard wall-clock budget for the primary compiler
    pub compile_timeout: Duration,

    /// Whether a degraded fallback may stand in when the compiler produces nothing
    pub fallback_enabled: bool,

    /// Budget for the fallback path
    pub fallback_timeout: Duration,

    /// Directory that receives per-job artifact directories
    pub output_dir: PathBuf,

    /// How long a produced artifact stays retrievable after success
    pub artifact_grace: Duration,

    /// Max jobs of one batch running at the same time
    pub max_parallel_jobs: usize,
}

impl CompilerConfig {
    /// Creates a configuration with defaults for the given install root
    pub fn new(install_root: impl Into<PathBuf>, platform: Platform) -> Self {
        let install_root = install_root.into();
        let compiler_path = install_root.join(COMPILER_EXECUTABLE);

        Self {
            install_root,
            compiler_path,
            emulator: "wine".to_string(),
            platform,
            compile_timeout: Duration::from_secs(30),
            fallback_enabled: true,
            fallback_timeout: Duration::from_secs(10),
            output_dir: PathBuf::from("compiled"),
            artifact_grace: Duration::from_secs(60),
            max_parallel_jobs: 2,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - MT5_PATH (install root, default: /opt/metatrader5)
    /// - MT5_COMPILER (full compiler path, default: $MT5_PATH/metaeditor64.exe)
    /// - WINE_BINARY (default: wine)
    /// - COMPILE_TIMEOUT (seconds, default: 30)
    /// - FALLBACK_ENABLED (true/false, default: true)
    /// - FALLBACK_TIMEOUT (seconds, default: 10)
    /// - COMPILED_DIR (default: compiled)
    /// - ARTIFACT_GRACE (seconds, default: 60)
    /// - MAX_PARALLEL_JOBS (default: 2)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), Platform::current())
    }

    /// Builds configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F, platform: Platform) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let install_root = lookup("MT5_PATH")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_INSTALL_ROOT.to_string());

        let mut config = Self::new(install_root, platform);

        if let Some(path) = lookup("MT5_COMPILER").filter(|s| !s.trim().is_empty()) {
            config.compiler_path = PathBuf::from(path);
        }

        if let Some(emulator) = lookup("WINE_BINARY").filter(|s| !s.trim().is_empty()) {
            config.emulator = emulator;
        }

        if let Some(secs) = parse_var::<u64>(&lookup, "COMPILE_TIMEOUT")? {
            config.compile_timeout = Duration::from_secs(secs);
        }

        if let Some(enabled) = parse_var::<bool>(&lookup, "FALLBACK_ENABLED")? {
            config.fallback_enabled = enabled;
        }

        if let Some(secs) = parse_var::<u64>(&lookup, "FALLBACK_TIMEOUT")? {
            config.fallback_timeout = Duration::from_secs(secs);
        }

        if let Some(dir) = lookup("COMPILED_DIR").filter(|s| !s.trim().is_empty()) {
            config.output_dir = PathBuf::from(dir);
        }

        if let Some(secs) = parse_var::<u64>(&lookup, "ARTIFACT_GRACE")? {
            config.artifact_grace = Duration::from_secs(secs);
        }

        if let Some(jobs) = parse_var::<usize>(&lookup, "MAX_PARALLEL_JOBS")? {
            config.max_parallel_jobs = jobs;
        }

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.compiler_path.as_os_str().is_empty() {
            anyhow::bail!("compiler_path cannot be empty");
        }

        if self.emulator.trim().is_empty() {
            anyhow::bail!("emulator cannot be empty");
        }

        if self.compile_timeout.is_zero() {
            anyhow::bail!("compile_timeout must be greater than 0");
        }

        if self.fallback_timeout.is_zero() {
            anyhow::bail!("fallback_timeout must be greater than 0");
        }

        if self.max_parallel_jobs == 0 {
            anyhow::bail!("max_parallel_jobs must be greater than 0");
        }

        Ok(())
    }

    /// Whether the compiler executable exists on disk
    pub async fn compiler_available(&self) -> bool {
        is_file(&self.compiler_path).await
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_INSTALL_ROOT, Platform::current())
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("invalid value for {}: '{}' ({})", key, raw, e)),
        _ => Ok(None),
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}
