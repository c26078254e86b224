//! CLI definitions for the validation workflow service.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// AVP CLI.
#[derive(Parser)]
#[command(name = "avp")]
#[command(about = "Validation workflow orchestration service")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the HTTP server in foreground (default)
    Serve {
        /// Server host (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Server port (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Create a project and run its validation workflow in-process
    Run {
        /// Project name
        #[arg(long)]
        project_name: String,

        /// Execution strategy (sequential, parallel, hybrid, adaptive)
        #[arg(long)]
        strategy: Option<String>,

        /// Video IDs to assign
        #[arg(long, num_args = 1..)]
        videos: Vec<String>,
    },

    /// Validate the configuration file
    CheckConfig,
}
