//! Configuration management CLI commands.

use crate::cli::common::{print_json, CliError, CliResult};
use crate::config::Config;
use clap::{Args, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

/// Configuration management commands
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Display current configuration
    Show(ConfigShowArgs),
    /// Set configuration values
    Set(ConfigSetArgs),
}

/// Display current configuration
#[derive(Args, Debug)]
pub struct ConfigShowArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Set configuration values
#[derive(Args, Debug)]
pub struct ConfigSetArgs {
    /// Controller repository root
    #[arg(long, value_name = "DIR")]
    repo_root: Option<PathBuf>,

    /// Preview viewport as WIDTHxHEIGHT (e.g. 1920x1080)
    #[arg(long, value_name = "WxH")]
    viewport: Option<String>,
}

/// JSON-serializable configuration for output
#[derive(Serialize, Debug)]
struct ConfigOutput<'a> {
    config_file: Option<String>,
    #[serde(flatten)]
    config: &'a Config,
}

impl ConfigArgs {
    /// Execute config subcommand
    pub fn execute(&self) -> CliResult<()> {
        match &self.command {
            ConfigCommand::Show(args) => args.execute(),
            ConfigCommand::Set(args) => args.execute(),
        }
    }
}

impl ConfigShowArgs {
    /// Execute show command
    pub fn execute(&self) -> CliResult<()> {
        let config = Config::load()
            .map_err(|e| CliError::io(format!("Failed to load configuration: {e:#}")))?;

        if self.json {
            print_json(&ConfigOutput {
                config_file: Config::config_file_path()
                    .ok()
                    .map(|p| p.to_string_lossy().to_string()),
                config: &config,
            })
        } else {
            output_human_readable(&config);
            Ok(())
        }
    }
}

impl ConfigSetArgs {
    /// Execute set command
    pub fn execute(&self) -> CliResult<()> {
        if self.repo_root.is_none() && self.viewport.is_none() {
            return Err(CliError::validation(
                "At least one configuration option must be specified: --repo-root or --viewport",
            ));
        }

        let mut config = Config::load()
            .map_err(|e| CliError::io(format!("Failed to load configuration: {e:#}")))?;

        if let Some(path) = &self.repo_root {
            if !path.is_dir() {
                return Err(CliError::validation(format!(
                    "Repository root does not exist: {}",
                    path.display()
                )));
            }
            config.set_repo_root(path.clone());
        }

        if let Some(viewport) = &self.viewport {
            config
                .set_viewport(viewport)
                .map_err(|e| CliError::validation(format!("{e:#}")))?;
        }

        config
            .save()
            .map_err(|e| CliError::io(format!("Failed to save configuration: {e:#}")))?;

        println!("Configuration updated successfully.");

        Ok(())
    }
}

/// Output configuration in human-readable format
fn output_human_readable(config: &Config) {
    println!("Controller Auditor Configuration");
    println!("================================");
    println!();

    println!("Paths:");
    match &config.paths.repo_root {
        Some(root) => println!("  Repository Root: {}", root.display()),
        None => println!("  Repository Root: (not configured)"),
    }
    println!();

    let import = &config.import;
    println!("Import:");
    println!("  Max Archive Bytes: {}", import.max_archive_bytes);
    println!("  Max Entry Bytes:   {}", import.max_entry_bytes);
    println!("  Max Total Bytes:   {}", import.max_total_bytes);
    println!("  Max Entries:       {}", import.max_entries);
    println!("  Default Language:  {}", import.default_lang);
    println!();

    println!("Preview:");
    println!(
        "  Viewport: {}x{}",
        config.preview.viewport_width, config.preview.viewport_height
    );
    println!();
}
