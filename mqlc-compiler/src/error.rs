//! Error types for the compile core
//!
//! Compile jobs never return errors; every failure becomes a `CompileResult`.
//! The only fallible surface is staging an upload onto local storage.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while placing an uploaded file on local storage
#[derive(Debug, Error)]
pub enum StagingError {
    /// The staging directory could not be created
    #[error("Failed to create staging directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The upload could not be written
    #[error("Failed to write upload to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
