//! MQL Compile Core
//!
//! Turns an uploaded MQL source file into a compiled `.ex5` artifact by
//! driving the external MetaEditor compiler.
//!
//! This crate contains:
//! - Validation: cheap structural checks before any process is spawned
//! - Strategy selection: native, emulated (wine) or mock invocation
//! - Process invocation: bounded, output-capturing child processes
//! - Fallback: a degraded path used when the compiler produced nothing
//! - Orchestration: single jobs and bounded-parallel batches
//! - File lifecycle: staging, artifact cleanup and stale-file sweeping
//!
//! # Example
//!
//! ```no_run
//! use mqlc_compiler::{CleanupRegistry, CompilerConfig, JobOrchestrator, files};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Arc::new(CompilerConfig::from_env()?);
//!     let orchestrator = JobOrchestrator::new(config, Arc::new(CleanupRegistry::new()));
//!
//!     let upload = files::stage_upload("uploads".as_ref(), "expert.mq5", b"void OnTick() {}").await?;
//!     let result = orchestrator.run(upload).await;
//!
//!     println!("success: {}", result.is_success());
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod fallback;
pub mod files;
pub mod invoker;
pub mod orchestrator;
pub mod strategy;
pub mod validator;

#[cfg(all(test, unix))]
mod test_support;

pub use batch::BatchOrchestrator;
pub use cleanup::CleanupRegistry;
pub use config::CompilerConfig;
pub use error::StagingError;
pub use orchestrator::JobOrchestrator;
