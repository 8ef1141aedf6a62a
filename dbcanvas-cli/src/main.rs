mod commands;
mod quota_ledger;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::commands::{AnalyzeArgs, DuplicateArgs, ExportArgs, ValidateArgs};

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a canvas document against the schema graph invariants.
    Validate(ValidateArgs),
    /// Report which properties an export would create or skip.
    Analyze(AnalyzeArgs),
    /// Clone a canvas under fresh identifiers into a canvas store.
    Duplicate(DuplicateArgs),
    /// Export a canvas through the dry-run schema API and print the result.
    Export(ExportArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    setup_logging(&args.log_level);

    match args.command {
        Commands::Validate(args) => commands::validate(args),
        Commands::Analyze(args) => commands::analyze(args),
        Commands::Duplicate(args) => commands::duplicate(args).await,
        Commands::Export(args) => commands::export(args).await,
    }
}

fn setup_logging(log_level: &Option<String>) {
    let log_level = match log_level
        .as_deref()
        .unwrap_or("info")
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level.to_string()))
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}
