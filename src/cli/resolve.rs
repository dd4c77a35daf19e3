//! Geometry resolution command.

use crate::cli::common::{print_json, CliError, CliResult, GlobalOptions};
use crate::cli::validate::load_manifest;
use crate::services::geometry::{self, GroupResolution};
use clap::Args;
use std::path::PathBuf;

/// Resolve element rectangles of a layout for a viewport
#[derive(Debug, Clone, Args)]
#[command(group(
    clap::ArgGroup::new("source")
        .required(true)
        .args(["manifest", "controller"]),
))]
pub struct ResolveArgs {
    /// Path to a layout manifest
    #[arg(short, long, value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    /// Id of an installed controller (latest version)
    #[arg(short, long, value_name = "ID")]
    pub controller: Option<String>,

    /// Viewport width in pixels (defaults to the configured preview width)
    #[arg(long, value_name = "PX")]
    pub width: Option<u32>,

    /// Viewport height in pixels (defaults to the configured preview height)
    #[arg(long, value_name = "PX")]
    pub height: Option<u32>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

impl ResolveArgs {
    /// Execute the resolve command
    pub fn execute(&self, global: &GlobalOptions) -> CliResult<()> {
        let config = global.load_config()?;

        let layout = match (&self.manifest, &self.controller) {
            (Some(path), _) => load_manifest(path)?,
            (None, Some(id)) => global
                .open_catalog(&config)?
                .load_layout(id)
                .map_err(|e| CliError::io(e.to_string()))?,
            (None, None) => {
                return Err(CliError::io("Either --manifest or --controller is required"))
            }
        };

        let width = self.width.unwrap_or(config.preview.viewport_width);
        let height = self.height.unwrap_or(config.preview.viewport_height);
        if width == 0 || height == 0 {
            return Err(CliError::io("Viewport dimensions must be non-zero"));
        }

        let groups = geometry::resolve_layout(&layout, f64::from(width), f64::from(height));

        if self.json {
            print_json(&groups)?;
        } else {
            print_groups(&layout.id, width, height, &groups);
        }

        Ok(())
    }
}

fn print_groups(layout_id: &str, width: u32, height: u32, groups: &[GroupResolution]) {
    println!("Layout '{layout_id}' at {width}x{height}");

    for group in groups {
        println!();
        println!("View group '{}' ({:?})", group.group_id, group.visibility);
        for (id, element) in &group.resolution.elements {
            let marker = if element.renderable { " " } else { "~" };
            println!(
                "  {marker} {id:<20} x={:<6} y={:<6} w={:<8.1} h={:<8.1}",
                element.x, element.y, element.width, element.height
            );
        }
        for error in &group.resolution.errors {
            println!("  ⚠ {error}");
        }
    }
}
