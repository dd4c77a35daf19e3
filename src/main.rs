//! Controller Auditor - command-line tool for controller layout packages
//!
//! Validates layout manifests, resolves element geometry, imports package
//! archives and inspects the controller catalog.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use controller_auditor::cli::{
    CatalogArgs, CliResult, ConfigArgs, ExitCode, GlobalOptions, ImportArgs, ResolveArgs,
    ValidateArgs,
};
use controller_auditor::constants::APP_BINARY_NAME;

/// Controller Auditor - validate, import and catalog controller layout packages
#[derive(Parser, Debug)]
#[command(name = APP_BINARY_NAME, author, version, about, long_about = None)]
struct Cli {
    /// Controller repository root (overrides the configured one)
    #[arg(long, global = true, value_name = "DIR")]
    repo: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a layout manifest
    Validate(ValidateArgs),
    /// Resolve element geometry for a viewport
    Resolve(ResolveArgs),
    /// Import a package archive
    Import(ImportArgs),
    /// Inspect or initialize the catalog
    Catalog(CatalogArgs),
    /// Show or change configuration
    Config(ConfigArgs),
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: &Cli) -> CliResult<()> {
    let global = GlobalOptions {
        repo: cli.repo.clone(),
    };

    match &cli.command {
        Command::Validate(args) => args.execute(),
        Command::Resolve(args) => args.execute(&global),
        Command::Import(args) => args.execute(&global),
        Command::Catalog(args) => args.execute(&global),
        Command::Config(args) => args.execute(),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match run(&cli) {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            eprintln!("Error: {e}");
            e.exit_code
        }
    };

    std::process::exit(code.code());
}
