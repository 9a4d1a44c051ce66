//! MQLC Core
//!
//! Core types shared by the compile service, its client and the CLI.
//!
//! This crate contains:
//! - Domain types: compile jobs, results, batch reports, compiler strategies
//! - DTOs: wire representations used by the HTTP API

pub mod domain;
pub mod dto;
