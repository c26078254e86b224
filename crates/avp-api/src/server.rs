//! API server implementation.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use avp_config::ServerConfig;

use crate::http::create_router;
use crate::state::AppState;

/// How often finished workflows are pruned.
const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// The HTTP server.
pub struct ApiServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl ApiServer {
    pub fn new(config: ServerConfig, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    /// Get the server address.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Serve until Ctrl-C.
    pub async fn run(&self) -> std::io::Result<()> {
        let app = create_router(self.state.clone());
        let listener = TcpListener::bind(self.addr()).await?;
        info!("API server listening on {}", listener.local_addr()?);

        let pruner = tokio::spawn(prune_loop(self.state.clone()));
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await;
        pruner.abort();

        info!("API server stopped");
        result
    }
}

async fn prune_loop(state: Arc<AppState>) {
    let mut interval = tokio::time::interval(PRUNE_INTERVAL);
    loop {
        interval.tick().await;
        match state.manager().prune_finished().await {
            Ok(0) => {}
            Ok(n) => debug!("Pruned {} finished workflows", n),
            Err(e) => warn!("Workflow pruning failed: {}", e),
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
