//! CLI command handlers for Controller Auditor.
//!
//! This module provides headless, scriptable access to validation, geometry
//! resolution, package import and the catalog.

pub mod catalog;
pub mod common;
pub mod config;
pub mod import;
pub mod resolve;
pub mod validate;

// Re-export types used by main.rs and tests
pub use catalog::CatalogArgs;
pub use common::{CliError, CliResult, ExitCode, GlobalOptions};
pub use config::ConfigArgs;
pub use import::ImportArgs;
pub use resolve::ResolveArgs;
pub use validate::ValidateArgs;
