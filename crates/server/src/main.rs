//! greenmap-worker entry point.
//!
//! Boots the offline cache worker and serves its host harness on stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use greenmap_client::fetch::canonicalize;
use greenmap_client::{FetchConfig, HttpNetwork, OfflineWorker};
use greenmap_core::{AppConfig, CacheDb};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let origin = canonicalize(&config.origin)?;

    let db = CacheDb::open(&config.db_path).await?;
    let network = HttpNetwork::new(FetchConfig::from(&config))?;
    let worker = OfflineWorker::from_config(&config, Arc::new(network), Arc::new(db.clone()))?;

    tracing::info!(
        store = %worker.store_name(),
        origin = %origin,
        db = %config.db_path.display(),
        "Starting greenmap-worker on stdio transport"
    );

    match worker.resume().await {
        Ok(true) => match worker.activate().await {
            Ok(report) => tracing::info!(deleted = report.deleted.len(), "resumed worker activated"),
            Err(e) => tracing::warn!(error = %e, "resumed worker could not activate"),
        },
        Ok(false) => tracing::info!("no complete store for this version, waiting for install"),
        Err(e) => tracing::warn!(error = %e, "could not inspect existing store"),
    }

    let worker = Arc::new(worker);
    let handler = handler::GreenmapWorkerServer::new(Arc::clone(&worker), db, origin);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    worker.settle_writes().await;
    tracing::info!("pending cache writes settled, shutting down");

    Ok(())
}
