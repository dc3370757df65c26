use std::sync::Arc;

use rust_vproc::api::{ApiServer, ApiServerConfig, AppState};
use rust_vproc::config::AppConfig;
use rust_vproc::logging;
use rust_vproc::pipeline::VideoProcessor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging; the guard must live for the process lifetime.
    let _guard = logging::init_logging("logs")?;

    let config = AppConfig::from_env_or_default();
    tracing::info!(
        max_concurrent_jobs = config.scheduler.max_concurrent_jobs,
        enhance_workers = config.enhance_pool.workers,
        recognize_workers = config.recognize_pool.workers,
        "rust-vproc starting"
    );

    let processor = Arc::new(VideoProcessor::with_defaults(config));
    processor.start();

    let server = ApiServer::new(
        ApiServerConfig::from_env_or_default(),
        AppState::new(processor.clone()),
    );

    // Ctrl-C triggers graceful shutdown of the API server.
    let cancel_token = server.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            cancel_token.cancel();
        }
    });

    server.run().await?;
    processor.shutdown().await;

    tracing::info!("rust-vproc shut down");
    Ok(())
}
