//! `rostermark` binary entry point.

mod app;
mod cli;
mod input;
mod prompts;

use anyhow::Result;
use app::MarketValueApp;
use clap::Parser;
use cli::Cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    MarketValueApp::new(cli)?.run().await
}
