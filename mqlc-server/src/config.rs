//! Server configuration
//!
//! HTTP-facing settings. Compiler settings live in `CompilerConfig`.

use std::path::PathBuf;
use std::time::Duration;

/// HTTP service configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the listener binds to
    pub bind_addr: String,

    /// Directory uploads are staged in before compilation
    pub upload_dir: PathBuf,

    /// Largest accepted source file
    pub max_upload_bytes: usize,

    /// Most files accepted by one batch request
    pub max_batch_files: usize,

    /// How often pending artifacts and stale files are swept
    pub sweep_interval: Duration,

    /// Age after which leftovers in the upload and output dirs are removed
    pub stale_file_age: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            upload_dir: PathBuf::from("uploads"),
            max_upload_bytes: 10 * 1024 * 1024,
            max_batch_files: 10,
            sweep_interval: Duration::from_secs(15),
            stale_file_age: Duration::from_secs(3600),
        }
    }
}

impl ServerConfig {
    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - BIND_ADDR (default: 0.0.0.0:3000), or PORT to keep the default host
    /// - UPLOAD_DIR (default: uploads)
    /// - MAX_UPLOAD_BYTES (default: 10 MiB)
    /// - MAX_BATCH_FILES (default: 10)
    /// - SWEEP_INTERVAL (seconds, default: 15)
    /// - STALE_FILE_AGE (seconds, default: 3600)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = non_empty(&lookup, "BIND_ADDR") {
            config.bind_addr = addr;
        } else if let Some(port) = parse_var::<u16>(&lookup, "PORT")? {
            config.bind_addr = format!("0.0.0.0:{}", port);
        }

        if let Some(dir) = non_empty(&lookup, "UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(dir);
        }

        if let Some(bytes) = parse_var::<usize>(&lookup, "MAX_UPLOAD_BYTES")? {
            config.max_upload_bytes = bytes;
        }

        if let Some(files) = parse_var::<usize>(&lookup, "MAX_BATCH_FILES")? {
            config.max_batch_files = files;
        }

        if let Some(secs) = parse_var::<u64>(&lookup, "SWEEP_INTERVAL")? {
            config.sweep_interval = Duration::from_secs(secs);
        }

        if let Some(secs) = parse_var::<u64>(&lookup, "STALE_FILE_AGE")? {
            config.stale_file_age = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.trim().is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if self.max_upload_bytes == 0 {
            anyhow::bail!("max_upload_bytes must be greater than 0");
        }

        if self.max_batch_files == 0 {
            anyhow::bail!("max_batch_files must be greater than 0");
        }

        if self.sweep_interval.is_zero() {
            anyhow::bail!("sweep_interval must be greater than 0");
        }

        Ok(())
    }

    /// Request body limit: a full batch plus multipart framing
    pub fn request_body_limit(&self) -> usize {
        self.max_upload_bytes
            .saturating_mul(self.max_batch_files)
            .saturating_add(64 * 1024)
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|value| !value.trim().is_empty())
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty(lookup, key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("invalid value for {}: '{}' ({})", key, raw, e)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.max_batch_files, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_port_only_keeps_default_host() {
        let config = ServerConfig::from_lookup(|key| match key {
            "PORT" => Some("8081".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8081");
    }

    #[test]
    fn test_bind_addr_wins_over_port() {
        let config = ServerConfig::from_lookup(|key| match key {
            "PORT" => Some("8081".to_string()),
            "BIND_ADDR" => Some("127.0.0.1:9000".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
    }

    #[test]
    fn test_invalid_values() {
        assert!(ServerConfig::from_lookup(|key| (key == "PORT").then(|| "http".to_string())).is_err());

        let mut config = ServerConfig::default();
        config.max_batch_files = 0;
        assert!(config.validate().is_err());
    }
}
