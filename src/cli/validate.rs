//! Validation command for layout manifests.

use crate::cli::common::{print_json, CliError, CliResult};
use crate::models::ControllerLayout;
use crate::services::schema::{self, SchemaCheck, ValidationReport, Violation};
use clap::Args;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Validate a layout manifest against the schema rules
#[derive(Debug, Clone, Args)]
pub struct ValidateArgs {
    /// Path to a layout manifest (versions/<N>.json)
    #[arg(short, long, value_name = "FILE")]
    pub manifest: PathBuf,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct ValidationResponse<'a> {
    valid: bool,
    id: &'a str,
    version_code: i64,
    failed_check: Option<SchemaCheck>,
    violations: &'a [Violation],
}

impl ValidateArgs {
    /// Execute the validate command
    pub fn execute(&self) -> CliResult<()> {
        let layout = load_manifest(&self.manifest)?;
        let report = schema::validate(&layout);

        if self.json {
            print_json(&ValidationResponse {
                valid: report.is_valid(),
                id: &layout.id,
                version_code: layout.version_code,
                failed_check: report.failed_check,
                violations: &report.violations,
            })?;
        } else {
            print_report(&layout, &report);
        }

        if !report.is_valid() {
            return Err(CliError::validation("Validation failed"));
        }

        Ok(())
    }
}

/// Reads and parses a layout manifest.
///
/// Unreadable files are I/O errors; unparseable JSON is a validation error.
pub fn load_manifest(path: &Path) -> CliResult<ControllerLayout> {
    let content = fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("Failed to read {}: {e}", path.display())))?;
    serde_json::from_str(&content)
        .map_err(|e| CliError::validation(format!("Invalid manifest {}: {e}", path.display())))
}

fn print_report(layout: &ControllerLayout, report: &ValidationReport) {
    if report.is_valid() {
        println!(
            "✓ Validation passed: '{}' (versionCode {})",
            layout.id, layout.version_code
        );
        return;
    }

    println!("✗ Validation failed");
    if let Some(check) = report.failed_check {
        println!("\nFailed check: {check}");
    }
    println!("\nIssues:");
    for violation in &report.violations {
        println!("  ✗ {violation}");
    }
}
