//! Tracing setup and server startup.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use avp_api::{ApiServer, AppState, ProjectWorkflowManager};
use avp_config::Config;

/// Get the ~/.avp directory path.
pub(crate) fn avp_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".avp"))
        .unwrap_or_else(|| PathBuf::from(".avp"))
}

/// Initialize tracing with console and file output.
///
/// Log files are written to ~/.avp/logs/ with daily rotation.
pub(crate) fn init_tracing() -> anyhow::Result<()> {
    let log_dir = avp_dir().join("logs");
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("creating log directory {}", log_dir.display()))?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("avp")
        .filename_suffix("log")
        .max_log_files(30)
        .build(&log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Flushes the file writer on exit.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_ansi(true))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}

/// Run the HTTP server in foreground.
pub(crate) async fn run_server(
    mut config: Config,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    info!("Starting AVP v{}", env!("CARGO_PKG_VERSION"));

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let manager = ProjectWorkflowManager::from_config(&config)
        .await
        .context("initializing workflow manager")?;
    let state = Arc::new(AppState::new(Arc::new(manager)));

    let server = ApiServer::new(config.server.clone(), state);
    info!("Serving on http://{}", server.addr());
    server
        .run()
        .await
        .with_context(|| format!("serving on {}", server.addr()))
}
