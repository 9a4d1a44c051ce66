//! Data Transfer Objects for the HTTP API
//!
//! Wire shapes exchanged between the compile server and its clients. Field
//! names follow the public JSON contract (`totalFiles`, `outputFile`, ...)
//! rather than Rust naming.

pub mod compile;
pub mod health;
