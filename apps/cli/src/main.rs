//! EssayBridge CLI: incremental translation of an essay archive.
//!
//! Discovers essays from a listing page, translates each one with Gemini and
//! keeps one Markdown file per essay under `./essays`, resuming where the
//! previous run stopped.

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
