//! Shared CLI plumbing: error type, exit codes, output helpers.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::Config;
use crate::services::catalog::Catalog;

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Command succeeded
    Success = 0,
    /// Input was invalid or a package was rejected
    ValidationError = 1,
    /// File system, configuration or usage failure
    IoError = 2,
}

impl ExitCode {
    /// Numeric code passed to the OS.
    pub const fn code(self) -> i32 {
        self as i32
    }
}

/// Error returned by command handlers.
#[derive(Debug)]
pub struct CliError {
    pub exit_code: ExitCode,
    pub message: String,
}

impl CliError {
    /// Validation or rejection failure (exit code 1).
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            exit_code: ExitCode::ValidationError,
            message: message.into(),
        }
    }

    /// I/O, configuration or usage failure (exit code 2).
    pub fn io(message: impl Into<String>) -> Self {
        Self {
            exit_code: ExitCode::IoError,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type of command handlers.
pub type CliResult<T> = Result<T, CliError>;

/// Options shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Repository root given on the command line
    pub repo: Option<PathBuf>,
}

impl GlobalOptions {
    /// Loads the configuration file.
    pub fn load_config(&self) -> CliResult<Config> {
        Config::load().map_err(|e| CliError::io(format!("Failed to load configuration: {e:#}")))
    }

    /// Repository root from `--repo`, falling back to the configuration.
    pub fn repo_root(&self, config: &Config) -> CliResult<PathBuf> {
        match &self.repo {
            Some(path) => Ok(path.clone()),
            None => config
                .require_repo_root()
                .map(Path::to_path_buf)
                .map_err(|e| CliError::io(e.to_string())),
        }
    }

    /// Opens the catalog at the resolved repository root.
    pub fn open_catalog(&self, config: &Config) -> CliResult<Catalog> {
        let root = self.repo_root(config)?;
        Catalog::open(&root).map_err(|e| CliError::io(format!("{e:#}")))
    }
}

/// Prints `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::io(format!("Failed to serialize JSON: {e}")))?;
    println!("{json}");
    Ok(())
}
