mod setup;
mod telemetry;

use anyhow::Context;
use stowage_core::Config;

// Use mimalloc as the global allocator for better performance and lower fragmentation,
// especially when running on musl-based systems inside containers.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;

    telemetry::init_telemetry(config.is_production())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;
    tracing::info!(config = ?config, "Configuration loaded and validated successfully");

    // Connect database and broker, declare queues
    let pipeline = setup::initialize_pipeline(&config).await?;

    let shutdown = pipeline.shutdown_handle();
    tokio::spawn(async move {
        setup::signal::shutdown_signal().await;
        shutdown.shutdown();
    });

    pipeline.run().await.context("Pipeline failed")?;
    Ok(())
}
