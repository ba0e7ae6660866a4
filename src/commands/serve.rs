//! Serve command implementation

use crate::api::{router, AppState};
use crate::config::Config;
use crate::error::Result;
use crate::store::InsightStore;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Run the REST API until Ctrl-C
pub async fn cmd_serve(config: &Config, store: InsightStore) -> Result<()> {
    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr).await?;

    let rows = store.count_insights().await?;
    if rows == 0 {
        warn!("Database is empty; run 'insightdash ingest' to load data");
    }

    info!(
        %addr,
        prefix = %config.server.api_prefix,
        rows,
        "Serving insights API"
    );

    let app = router(AppState::new(store, &config.server.api_prefix));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
