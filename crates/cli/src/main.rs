//! # flightscan: Flight Booking Extraction CLI
//!
//! This is the main entry point for the `flightscan` command-line interface.

mod config;
mod extract;
mod query;

use anyhow::Result;
use clap::{Parser, Subcommand};
use extract::{handle_extract, ExtractArgs};
use query::{handle_query, QueryArgs};
use tracing_subscriber::EnvFilter;

// --- CLI Definition ---

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract records from a directory of HTML emails in one batch
    Extract(ExtractArgs),
    /// Print the first-pass mailbox search query
    Query(QueryArgs),
}

// --- Main Application Entry ---

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Extract(args) => {
            handle_extract(args).await?;
        }
        Commands::Query(args) => handle_query(args)?,
    }

    Ok(())
}
