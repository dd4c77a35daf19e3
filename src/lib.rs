//! Controller Auditor Library
//!
//! This library provides core functionality for managing virtual controller
//! layout packages: validating layout manifests, resolving element geometry,
//! importing untrusted package archives and maintaining the controller catalog.

// Module declarations
pub mod cli;
pub mod config;
pub mod constants;
pub mod models;
pub mod parser;
pub mod services;
