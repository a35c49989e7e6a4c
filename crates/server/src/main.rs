//! fallow server entry point.
//!
//! Boots the caching layer, starts the lifecycle controller in the
//! background, and serves the MCP tools on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use anyhow::Result;
use fallow_client::{FetchConfig, Fetcher, HttpFetcher, LifecycleController, Worker};
use fallow_core::{AppConfig, CacheDb, Partitions};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

const CONTROL_CHANNEL_CAPACITY: usize = 32;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(version = %config.cache_version, db = %config.db_path.display(), "Starting fallow on stdio transport");

    let db = CacheDb::open(&config.db_path).await?;
    let partitions = Partitions::new(db, config.cache_version.clone());
    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(FetchConfig::from(&config))?);
    let worker = Worker::from_config(&config, partitions, fetcher)?;
    let lifecycle = Arc::new(LifecycleController::from_config(&config, worker.context().clone())?);

    let (control_tx, control_rx) = mpsc::channel(CONTROL_CHANNEL_CAPACITY);
    let lifecycle_task = tokio::spawn(lifecycle.clone().run(control_rx));

    let handler = handler::FallowServer::new(worker.clone(), lifecycle, control_tx);
    let server = serve_server(handler, stdio()).await?;
    server.waiting().await?;

    lifecycle_task.abort();
    worker.settle().await;
    tracing::info!("fallow stopped");

    Ok(())
}
