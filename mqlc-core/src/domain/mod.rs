//! Core domain types
//!
//! These types describe a compile job from the moment a source file reaches the
//! orchestrator until its result is delivered. They are shared between the
//! compiler (which produces them) and the server (which renders them).

pub mod batch;
pub mod job;
pub mod log;
pub mod result;
pub mod strategy;
