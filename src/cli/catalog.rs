//! Catalog inspection and initialization commands.

use crate::cli::common::{print_json, CliError, CliResult, GlobalOptions};
use crate::models::{CatalogRecord, Category};
use crate::services::catalog::Catalog;
use clap::{Args, Subcommand};

/// Inspect or initialize the controller catalog
#[derive(Args, Debug)]
pub struct CatalogArgs {
    #[command(subcommand)]
    command: CatalogCommand,
}

#[derive(Subcommand, Debug)]
enum CatalogCommand {
    /// List installed controllers
    List(CatalogListArgs),
    /// Show one installed controller
    Show(CatalogShowArgs),
    /// List categories
    Categories(CatalogCategoriesArgs),
    /// Create an empty catalog at the repository root
    Init,
}

/// List installed controllers
#[derive(Args, Debug)]
pub struct CatalogListArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Show one installed controller
#[derive(Args, Debug)]
pub struct CatalogShowArgs {
    /// Controller id
    #[arg(long, value_name = "ID")]
    id: String,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// List categories
#[derive(Args, Debug)]
pub struct CatalogCategoriesArgs {
    /// Locale used for labels
    #[arg(long, value_name = "LOCALE")]
    locale: Option<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

impl CatalogArgs {
    /// Execute catalog subcommand
    pub fn execute(&self, global: &GlobalOptions) -> CliResult<()> {
        let config = global.load_config()?;

        if let CatalogCommand::Init = self.command {
            let root = global.repo_root(&config)?;
            let catalog = Catalog::init(&root).map_err(|e| CliError::io(format!("{e:#}")))?;
            println!(
                "Catalog ready at {} ({} controllers)",
                catalog.root().display(),
                catalog.entries().len()
            );
            return Ok(());
        }

        let catalog = global.open_catalog(&config)?;
        match &self.command {
            CatalogCommand::List(args) => args.execute(&catalog),
            CatalogCommand::Show(args) => args.execute(&catalog),
            CatalogCommand::Categories(args) => {
                args.execute(&catalog, &config.import.default_lang)
            }
            CatalogCommand::Init => Ok(()),
        }
    }
}

impl CatalogListArgs {
    fn execute(&self, catalog: &Catalog) -> CliResult<()> {
        let records: Vec<CatalogRecord> = catalog
            .entries()
            .iter()
            .filter_map(|entry| catalog.lookup(&entry.id))
            .collect();

        if self.json {
            return print_json(&records);
        }

        if records.is_empty() {
            println!("No controllers installed.");
            return Ok(());
        }

        println!("{:<24} {:>8} {:<12} NAME", "ID", "CODE", "VERSION");
        for record in &records {
            println!(
                "{:<24} {:>8} {:<12} {}",
                record.entry.id,
                record.version_code(),
                record.version.latest.version_name,
                record.entry.name
            );
        }
        Ok(())
    }
}

impl CatalogShowArgs {
    fn execute(&self, catalog: &Catalog) -> CliResult<()> {
        let record = catalog.lookup(&self.id).ok_or_else(|| {
            CliError::validation(format!("Controller '{}' is not installed", self.id))
        })?;

        if self.json {
            return print_json(&record);
        }

        let version = &record.version;
        println!("{} ({})", record.entry.name, record.entry.id);
        println!("==========");
        println!();
        println!("Language:     {}", record.entry.lang);
        println!("Introduction: {}", record.entry.introduction);
        println!("Author:       {}", version.author);
        println!("Description:  {}", version.description);
        println!(
            "Latest:       {} ({})",
            version.latest.version_code, version.latest.version_name
        );
        println!("Screenshots:  {}", version.screenshot);
        if !record.entry.categories.is_empty() {
            let categories: Vec<String> =
                record.entry.categories.iter().map(i64::to_string).collect();
            println!("Categories:   {}", categories.join(", "));
        }
        if !version.history.is_empty() {
            println!();
            println!("History:");
            for past in &version.history {
                println!("  {} ({})", past.version_code, past.version_name);
            }
        }
        Ok(())
    }
}

impl CatalogCategoriesArgs {
    fn execute(&self, catalog: &Catalog, default_locale: &str) -> CliResult<()> {
        let categories: Vec<Category> = catalog.categories();

        if self.json {
            return print_json(&categories);
        }

        if categories.is_empty() {
            println!("No categories defined.");
            return Ok(());
        }

        let locale = self.locale.as_deref().unwrap_or(default_locale);
        for category in &categories {
            println!(
                "{:>4}  {}",
                category.id,
                category.label(locale).unwrap_or("(no label)")
            );
        }
        Ok(())
    }
}
