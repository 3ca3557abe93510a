//! ProspectCue CLI — inspect and replay the CRM customization engine.
//!
//! Classifies CRM routes and replays scripted click sessions against the
//! navigation watcher, showing which customization pipelines would run.

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
