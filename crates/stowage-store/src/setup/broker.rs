//! Broker connection

use anyhow::{Context, Result};
use std::sync::Arc;
use stowage_core::Config;
use stowage_worker::{MessageChannel, NatsChannel};

/// Connect to NATS JetStream with the configured credentials
pub async fn setup_broker(config: &Config) -> Result<Arc<dyn MessageChannel>> {
    let channel = NatsChannel::connect(
        &config.nats_url,
        config.nats_user.as_deref(),
        config.nats_password.as_deref(),
        "stowage-store",
    )
    .await
    .context("Failed to connect to message broker")?;

    Ok(Arc::new(channel))
}
