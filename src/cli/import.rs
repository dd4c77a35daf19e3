//! Package import command.

use crate::cli::common::{print_json, CliError, CliResult, GlobalOptions};
use crate::services::catalog::{CatalogError, CommitReceipt};
use crate::services::importer::{
    CommitOverrides, GeometryIssue, ImportError, ImportStage, PackageImporter, ParsedPackage,
    Rejection,
};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use tracing::warn;

/// Import a controller package archive
#[derive(Debug, Clone, Args)]
pub struct ImportArgs {
    /// Path to the package (.zip)
    #[arg(short, long, value_name = "ZIP")]
    pub package: PathBuf,

    /// Install the package into the catalog
    #[arg(long)]
    pub commit: bool,

    /// Override the catalog display name
    #[arg(long, value_name = "TEXT")]
    pub name: Option<String>,

    /// Override the catalog introduction
    #[arg(long, value_name = "TEXT")]
    pub intro: Option<String>,

    /// Override the author
    #[arg(long, value_name = "TEXT")]
    pub author: Option<String>,

    /// Override the description
    #[arg(long, value_name = "TEXT")]
    pub description: Option<String>,

    /// Category id (repeatable; replaces the package's categories)
    #[arg(long = "category", value_name = "ID")]
    pub categories: Vec<i64>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum ImportStatus {
    Ready,
    Committed,
    Rejected,
}

#[derive(Debug, Serialize)]
struct RejectionOutput {
    stage: ImportStage,
    error: String,
}

#[derive(Debug, Serialize)]
struct ImportOutput<'a> {
    status: ImportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    controller_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version_code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_update: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    installed_version_code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    digest: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    import_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    screenshots: Option<usize>,
    geometry_issues: &'a [GeometryIssue],
    #[serde(skip_serializing_if = "Option::is_none")]
    receipt: Option<&'a CommitReceipt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rejection: Option<RejectionOutput>,
}

impl<'a> ImportOutput<'a> {
    fn from_package(package: &'a ParsedPackage, receipt: Option<&'a CommitReceipt>) -> Self {
        Self {
            status: if receipt.is_some() {
                ImportStatus::Committed
            } else {
                ImportStatus::Ready
            },
            controller_id: Some(&package.controller_id),
            version_code: Some(package.version_code),
            is_update: Some(package.is_update),
            installed_version_code: package.current_index.as_ref().map(|r| r.version_code()),
            digest: Some(&package.digest),
            import_id: Some(package.import_id.to_string()),
            screenshots: Some(package.screenshots.len()),
            geometry_issues: &package.geometry_issues,
            receipt,
            rejection: None,
        }
    }

    fn from_rejection(rejection: &Rejection) -> Self {
        Self {
            status: ImportStatus::Rejected,
            controller_id: None,
            version_code: None,
            is_update: None,
            installed_version_code: None,
            digest: None,
            import_id: None,
            screenshots: None,
            geometry_issues: &[],
            receipt: None,
            rejection: Some(RejectionOutput {
                stage: rejection.stage,
                error: rejection.error.to_string(),
            }),
        }
    }
}

impl ImportArgs {
    fn overrides(&self) -> CommitOverrides {
        CommitOverrides {
            name: self.name.clone(),
            introduction: self.intro.clone(),
            categories: (!self.categories.is_empty()).then(|| self.categories.clone()),
            author: self.author.clone(),
            description: self.description.clone(),
        }
    }

    /// Execute the import command
    pub fn execute(&self, global: &GlobalOptions) -> CliResult<()> {
        let config = global.load_config()?;
        let catalog = global.open_catalog(&config)?;
        let importer = PackageImporter::new(&catalog, &config);

        let mut package = match importer.import_path(&self.package) {
            Ok(package) => package,
            Err(rejection) => {
                if self.json {
                    print_json(&ImportOutput::from_rejection(&rejection))?;
                } else {
                    println!("✗ Package rejected at stage '{}'", rejection.stage);
                    println!("  {}", rejection.error);
                }
                return Err(rejection_error(&rejection));
            }
        };

        let overrides = self.overrides();
        if !overrides.is_empty() {
            package.apply_overrides(&overrides);
        }

        let receipt = if self.commit {
            match catalog.commit(&package) {
                Ok(receipt) => Some(receipt),
                Err(e @ CatalogError::CommitConflict { .. }) => {
                    return Err(CliError::validation(format!("Commit failed: {e}")));
                }
                Err(e) => return Err(CliError::io(format!("Commit failed: {e}"))),
            }
        } else {
            None
        };

        if self.json {
            print_json(&ImportOutput::from_package(&package, receipt.as_ref()))?;
        } else {
            print_summary(&package, receipt.as_ref());
        }

        if let Err(e) = package.cleanup() {
            warn!(error = %e, "failed to remove extracted package");
        }

        Ok(())
    }
}

fn rejection_error(rejection: &Rejection) -> CliError {
    let message = format!("Package rejected: {}", rejection.error);
    match rejection.error {
        ImportError::Io(_) => CliError::io(message),
        _ => CliError::validation(message),
    }
}

fn print_summary(package: &ParsedPackage, receipt: Option<&CommitReceipt>) {
    match receipt {
        Some(receipt) => println!(
            "✓ Installed '{}' version {}",
            receipt.controller_id, receipt.version_code
        ),
        None => println!(
            "✓ Package '{}' version {} is ready (not committed)",
            package.controller_id, package.version_code
        ),
    }

    match &package.current_index {
        Some(record) => println!("  Update from version {}", record.version_code()),
        None => println!("  New controller"),
    }
    println!("  Name:        {}", package.index_entry.name);
    println!("  Screenshots: {}", package.screenshots.len());
    println!("  Icon:        {}", if package.icon_path.is_some() { "yes" } else { "no" });
    println!("  SHA-256:     {}", package.digest);

    if let Some(receipt) = receipt {
        let history: Vec<String> = receipt
            .version
            .history
            .iter()
            .map(|v| v.version_code.to_string())
            .collect();
        if !history.is_empty() {
            println!("  History:     {}", history.join(", "));
        }
    }

    if !package.geometry_issues.is_empty() {
        println!("\nGeometry warnings:");
        for issue in &package.geometry_issues {
            println!("  ⚠ [{}] {}", issue.view_group, issue.error);
        }
    }
}
