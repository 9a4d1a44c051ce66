//! Fallback compilation
//!
//! Secondary path used when the primary compiler produced no artifact. The
//! bundled [`CopyFallback`] does not compile anything: it copies the source
//! bytes next to the target and relabels them as the artifact. Results from
//! it are reported with `Fidelity::Fallback` so callers can tell them apart.

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use crate::files;

/// How a fallback attempt ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackOutcome {
    /// The artifact now exists at the requested path
    Produced { log: String },
    /// No artifact was produced
    Failed { detail: String },
}

/// A secondary way of producing an artifact
#[async_trait]
pub trait FallbackCompiler: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Attempts to produce `artifact` from `source`
    async fn compile(&self, source: &Path, artifact: &Path) -> FallbackOutcome;
}

/// Copies the source to a `.part` file, then renames it to the artifact name
#[derive(Debug, Clone)]
pub struct CopyFallback {
    timeout: Duration,
}

impl CopyFallback {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl FallbackCompiler for CopyFallback {
    fn name(&self) -> &'static str {
        "copy"
    }

    async fn compile(&self, source: &Path, artifact: &Path) -> FallbackOutcome {
        let staged = artifact.with_extension("part");

        if let Some(parent) = artifact.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return FallbackOutcome::Failed {
                    detail: format!("Alternative compilation setup failed: {}", e),
                };
            }
        }

        debug!("Fallback copy {} -> {}", source.display(), staged.display());

        match tokio::time::timeout(self.timeout, tokio::fs::copy(source, &staged)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                files::discard(&staged).await;
                return FallbackOutcome::Failed {
                    detail: format!("Alternative compilation failed: {}", e),
                };
            }
            Err(_) => {
                warn!("Fallback copy exceeded {:?}", self.timeout);
                files::discard(&staged).await;
                return FallbackOutcome::Failed {
                    detail: format!(
                        "Alternative compilation timeout ({} seconds)",
                        self.timeout.as_secs()
                    ),
                };
            }
        }

        if let Err(e) = tokio::fs::rename(&staged, artifact).await {
            files::discard(&staged).await;
            return FallbackOutcome::Failed {
                detail: format!("Failed to rename output file: {}", e),
            };
        }

        FallbackOutcome::Produced {
            log: "Alternative compilation successful".to_string(),
        }
    }
}
