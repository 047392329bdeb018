//! CreatorFlow CLI — content pipeline runner.
//!
//! Turns a topic into platform-ready content through the research →
//! lead-generation → content → outreach pipeline, persisting each run.

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
