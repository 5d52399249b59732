use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use std::time::Duration;
use stowage_cli::{init_tracing, parse_tags, BrokerArgs, OutputFormat};
use stowage_core::models::FileRequest;
use stowage_worker::{Delivery, MessageChannel};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "stowage-lookup")]
#[command(about = "Look up stored file names by name substring and/or tags")]
struct Args {
    /// Substring the file name must contain
    #[arg(long, default_value = "")]
    name: String,

    /// Comma separated tags the file must all carry
    #[arg(long, default_value = "")]
    tags: String,

    /// Seconds to wait for the response
    #[arg(long, default_value = "30")]
    timeout: u64,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Lines)]
    format: OutputFormat,

    #[command(flatten)]
    broker: BrokerArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse();

    let request = FileRequest {
        name: args.name.clone(),
        tags: parse_tags(&args.tags),
    };
    if request.is_unfiltered() {
        return Err(anyhow::anyhow!("Pass at least one of --name or --tags"));
    }

    let channel = args.broker.connect("stowage-lookup").await?;

    // Subscribe before publishing so the reply cannot be missed
    let correlation_id = Uuid::new_v4().to_string();
    let mut responses = channel
        .consume_correlated(&args.broker.file_names_queue, &correlation_id)
        .await
        .context("Failed to open response queue")?;

    let payload = serde_json::to_vec(&request).context("Failed to encode request")?;
    channel
        .publish(
            &args.broker.file_request_queue,
            Delivery::new(payload).with_correlation_id(correlation_id.clone()),
        )
        .await
        .context("Failed to publish request")?;

    tracing::debug!(correlation_id = %correlation_id, "Lookup request published");

    let delivery = tokio::time::timeout(Duration::from_secs(args.timeout), responses.next())
        .await
        .map_err(|_| anyhow::anyhow!("No response within {} seconds", args.timeout))?
        .context("Response queue closed")??;

    let names: Vec<String> =
        serde_json::from_slice(&delivery.payload).context("Malformed lookup response")?;

    let rendered = args.format.render(&names)?;
    if !rendered.is_empty() {
        println!("{}", rendered);
    }

    Ok(())
}
