//! Configuration module
//!
//! Handles CLI configuration.

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the compile service
    pub server_url: String,
}
