//! parldata CLI — parliamentary document ingestion pipeline.
//!
//! Scrapes the parliament's document listings into a local database of
//! merged, provenance-tracked records.

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
