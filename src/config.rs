//! Configuration management for the application.
//!
//! This module handles loading, validating, and saving application configuration
//! in TOML format with platform-specific directory resolution.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{APP_CONFIG_DIR_NAME, CONFIG_DIR_ENV};

/// Path configuration for file system locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PathConfig {
    /// Controller repository root (holds `index.json` and `repo_json/`)
    pub repo_root: Option<PathBuf>,
}

/// Limits applied while extracting and classifying untrusted packages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Largest accepted archive, in bytes
    pub max_archive_bytes: u64,
    /// Largest accepted single entry after decompression, in bytes
    pub max_entry_bytes: u64,
    /// Largest accepted total decompressed size, in bytes
    pub max_total_bytes: u64,
    /// Most entries an archive may contain
    pub max_entries: usize,
    /// Locale used when a package ships no `index.json`
    pub default_lang: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_archive_bytes: 64 * 1024 * 1024,
            max_entry_bytes: 16 * 1024 * 1024,
            max_total_bytes: 128 * 1024 * 1024,
            max_entries: 2048,
            default_lang: "zh_CN".to_string(),
        }
    }
}

/// Viewport used for dry-run geometry resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Viewport width in device pixels
    pub viewport_width: u32,
    /// Viewport height in device pixels
    pub viewport_height: u32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            viewport_width: 1920,
            viewport_height: 1080,
        }
    }
}

/// Application configuration.
///
/// # File Location
///
/// - Linux: `~/.config/ControllerAuditor/config.toml`
/// - macOS: `~/Library/Application Support/ControllerAuditor/config.toml`
/// - Windows: `%APPDATA%\ControllerAuditor\config.toml`
///
/// `CONTROLLER_AUDITOR_CONFIG_DIR` replaces the platform directory.
///
/// # Validation
///
/// - every import limit must be non-zero
/// - preview viewport dimensions must be non-zero
/// - `default_lang` must not be empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    /// File system paths
    #[serde(default)]
    pub paths: PathConfig,
    /// Import limits
    #[serde(default)]
    pub import: ImportConfig,
    /// Preview settings
    #[serde(default)]
    pub preview: PreviewConfig,
}

impl Config {
    /// Creates a new Config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the config directory path.
    pub fn config_dir() -> Result<PathBuf> {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
            return Ok(PathBuf::from(dir));
        }

        let config_dir = dirs::config_dir()
            .context("Failed to determine config directory")?
            .join(APP_CONFIG_DIR_NAME);

        Ok(config_dir)
    }

    /// Gets the full path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Loads configuration from the config file.
    ///
    /// If the file doesn't exist, returns default configuration.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    /// Loads configuration from an explicit file.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let content = fs::read_to_string(config_path).context(format!(
            "Failed to read config file: {}",
            config_path.display()
        ))?;

        let config: Self = toml::from_str(&content).context(format!(
            "Failed to parse config file: {}",
            config_path.display()
        ))?;

        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to the config file using atomic write.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    /// Saves configuration to an explicit file (temp file + rename).
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(config_dir) = config_path.parent() {
            fs::create_dir_all(config_dir).context(format!(
                "Failed to create config directory: {}",
                config_dir.display()
            ))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        let temp_path = config_path.with_extension("toml.tmp");

        fs::write(&temp_path, content).context(format!(
            "Failed to write temp config file: {}",
            temp_path.display()
        ))?;

        fs::rename(&temp_path, config_path).context(format!(
            "Failed to rename temp config file to: {}",
            config_path.display()
        ))?;

        Ok(())
    }

    /// Validates configuration values.
    pub fn validate(&self) -> Result<()> {
        let limits = &self.import;
        if limits.max_archive_bytes == 0
            || limits.max_entry_bytes == 0
            || limits.max_total_bytes == 0
            || limits.max_entries == 0
        {
            anyhow::bail!("Import limits must be greater than zero");
        }

        if limits.default_lang.trim().is_empty() {
            anyhow::bail!("Default language must not be empty");
        }

        if self.preview.viewport_width == 0 || self.preview.viewport_height == 0 {
            anyhow::bail!(
                "Preview viewport must be non-zero, got {}x{}",
                self.preview.viewport_width,
                self.preview.viewport_height
            );
        }

        Ok(())
    }

    /// Sets the repository root.
    pub fn set_repo_root(&mut self, path: PathBuf) {
        self.paths.repo_root = Some(path);
    }

    /// Parses and sets the preview viewport from `WIDTHxHEIGHT`.
    pub fn set_viewport(&mut self, spec: &str) -> Result<()> {
        let (width, height) = parse_viewport(spec)?;
        self.preview.viewport_width = width;
        self.preview.viewport_height = height;
        self.validate()
    }

    /// Repository root, or an error telling the user how to set one.
    pub fn require_repo_root(&self) -> Result<&Path> {
        self.paths.repo_root.as_deref().context(
            "No repository root configured (use --repo or `config set --repo-root <DIR>`)",
        )
    }
}

/// Parses `WIDTHxHEIGHT` (e.g. `1920x1080`).
pub fn parse_viewport(spec: &str) -> Result<(u32, u32)> {
    let (width, height) = spec
        .split_once(['x', 'X'])
        .with_context(|| format!("Invalid viewport '{spec}', expected WIDTHxHEIGHT"))?;

    let width: u32 = width
        .trim()
        .parse()
        .with_context(|| format!("Invalid viewport width in '{spec}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .with_context(|| format!("Invalid viewport height in '{spec}'"))?;

    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_new() {
        let config = Config::new();
        assert_eq!(config.paths.repo_root, None);
        assert_eq!(config.import.max_entries, 2048);
        assert_eq!(config.import.max_archive_bytes, 64 * 1024 * 1024);
        assert_eq!(config.import.default_lang, "zh_CN");
        assert_eq!(config.preview.viewport_width, 1920);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validate_rejects_zero_limits() {
        let mut config = Config::new();
        config.import.max_entry_bytes = 0;
        assert!(config.validate().is_err());

        let mut config = Config::new();
        config.preview.viewport_height = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::new();
        config.set_repo_root(PathBuf::from("/srv/controllers"));
        config.import.max_entries = 16;
        config.save_to(&config_file).unwrap();

        assert!(!config_file.with_extension("toml.tmp").exists());
        let loaded = Config::load_from(&config_file).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let loaded = Config::load_from(&temp_dir.path().join("config.toml")).unwrap();
        assert_eq!(loaded, Config::new());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        fs::write(&config_file, "[preview]\nviewport_width = 800\n").unwrap();

        let loaded = Config::load_from(&config_file).unwrap();
        assert_eq!(loaded.preview.viewport_width, 800);
        assert_eq!(loaded.preview.viewport_height, 1080);
        assert_eq!(loaded.import, ImportConfig::default());
    }

    #[test]
    fn test_parse_viewport() {
        assert_eq!(parse_viewport("1280x720").unwrap(), (1280, 720));
        assert_eq!(parse_viewport("640X480").unwrap(), (640, 480));
        assert!(parse_viewport("1280").is_err());
        assert!(parse_viewport("ax1").is_err());

        let mut config = Config::new();
        assert!(config.set_viewport("0x10").is_err());
    }
}
