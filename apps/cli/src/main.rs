//! stockscraper CLI: batch stock scraper for configurator-driven storefronts.
//!
//! Reads a list of product page URLs and writes per-variant stock and
//! incoming deliveries to CSV and/or a libSQL database.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
