use std::sync::Arc;

use actors::JobService;
use stats::{Dataset, StatsEngine};
use storage::{ResultStore, Storage};
use tracing_subscriber::EnvFilter;

mod config;
mod shutdown;

use config::ServerConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;

    // A dataset that fails to load aborts startup before any worker exists.
    let dataset = Dataset::from_csv_path(&config.dataset)?;
    let engine = StatsEngine::new(dataset);
    let results = ResultStore::new(Storage::new(config.storage.clone())?);

    let (service, pool_handle) = JobService::start(config.pool, Arc::new(engine), results).await?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(
        addr = %config.bind_addr,
        workers = service.pool_size(),
        "Statistics server listening"
    );

    axum::serve(listener, api::router(service.clone()))
        .with_graceful_shutdown(shutdown::signal())
        .await?;

    tracing::info!(running = service.running_jobs(), "Waiting for queued jobs to finish");
    service.shutdown();
    service.wait_stopped().await;
    pool_handle.await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
