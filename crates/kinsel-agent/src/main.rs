//! Kinsel: kinase inhibitor selectivity target selection.
//! Entry point for the command-line binary.

mod commands;
mod config;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use kinsel_ingestion::sources::entrez::EntrezGeneClient;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "kinsel")]
#[command(about = "Normalise kinase selectivity datasets and select consensus targets")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve target labels to gene symbols and write normalised tables
    Process {
        /// Only process the named dataset (repeatable)
        #[arg(short, long = "dataset")]
        datasets: Vec<String>,
    },
    /// Compute the consensus set and rank fusion from normalised tables
    Select,
    /// Process every dataset, then select
    Run,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialise structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("kinsel=debug,info")),
        )
        .init();

    let args = Args::parse();
    info!("Kinsel {}", env!("CARGO_PKG_VERSION"));

    let config = config::Config::load()?;
    info!(
        datasets = config.datasets.len(),
        fusion_tables = config.fusion.tables.len(),
        mode = ?config.fusion.mode,
        "Configuration loaded"
    );

    match args.command {
        Command::Process { datasets } => {
            run_process(&config, &datasets).await?;
        }
        Command::Select => {
            commands::select(&config)?;
        }
        Command::Run => {
            run_process(&config, &[]).await?;
            commands::select(&config)?;
        }
    }
    Ok(())
}

async fn run_process(config: &config::Config, only: &[String]) -> anyhow::Result<()> {
    let mut entrez = config.entrez.clone();
    if let Ok(email) = std::env::var("KINSEL_ENTREZ_EMAIL") {
        entrez.email = email;
    }
    if entrez.api_key.is_none() {
        entrez.api_key = std::env::var("KINSEL_ENTREZ_API_KEY").ok();
    }
    if entrez.api_key.is_none() {
        tracing::warn!("No NCBI API key (set entrez.api_key or KINSEL_ENTREZ_API_KEY); keep concurrency modest");
    }

    let client = EntrezGeneClient::new(entrez)?;
    let reports = commands::process(config, Arc::new(client), only).await?;

    let unresolved: usize = reports.iter().map(|r| r.unresolved.len()).sum();
    let failures: usize = reports.iter().map(|r| r.lookup_failures.len()).sum();
    info!(datasets = reports.len(), unresolved, lookup_failures = failures, "Processing complete");
    Ok(())
}
