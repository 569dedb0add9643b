//! Linkloom CLI — browser bookmark enrichment tool.
//!
//! Collects bookmarks from installed browsers, enriches each with a fetched
//! summary and page text, and persists results for later semantic indexing.

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
