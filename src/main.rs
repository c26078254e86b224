//! AVP - validation workflow orchestration service.
//!
//! Main entry point for the CLI and HTTP server.

mod cli;
mod cmd_run;
mod server;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use avp_config::ConfigLoader;

use crate::cli::{Cli, Commands};
use crate::server::{init_tracing, run_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let cli = Cli::parse();
    let config = ConfigLoader::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    info!("Configuration loaded from {}", cli.config.display());

    match cli.command {
        None => run_server(config, None, None).await,
        Some(Commands::Serve { host, port }) => run_server(config, host, port).await,
        Some(Commands::Run {
            project_name,
            strategy,
            videos,
        }) => cmd_run::run_project(&config, project_name, strategy, videos).await,
        Some(Commands::CheckConfig) => cmd_run::check_config(&config),
    }
}
