use anyhow::{Context, Result};
use clap::Parser;
use flightscan::search_query::{build_search_query, flight_keywords, load_airline_names};
use std::fs::File;
use std::path::PathBuf;

#[derive(Parser, Debug)]
pub struct QueryArgs {
    /// OpenFlights `airlines.dat` file
    #[arg(long)]
    airlines: PathBuf,
}

/// Prints the first-pass mailbox search query.
pub fn handle_query(args: &QueryArgs) -> Result<()> {
    let file = File::open(&args.airlines)
        .with_context(|| format!("Failed to open '{}'", args.airlines.display()))?;
    let airlines = load_airline_names(file)?;
    let query = build_search_query(flight_keywords(), airlines.iter().map(String::as_str));
    println!("{query}");
    Ok(())
}
