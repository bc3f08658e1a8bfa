//! CLI command implementations.
//!
//! # Command Modules
//!
//! - [`jobs`] - Ingestion jobs (submit, upload, watch, status, health)
//! - [`terrain`] - Terrain layers and auto-selection (layers, select, mode)

pub mod jobs;
pub mod terrain;
