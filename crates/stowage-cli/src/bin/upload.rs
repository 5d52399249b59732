use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use stowage_cli::{guess_content_type, init_tracing, parse_tags, BrokerArgs};
use stowage_core::models::FileData;
use stowage_worker::{Delivery, MessageChannel};

#[derive(Parser, Debug)]
#[command(name = "stowage-upload")]
#[command(about = "Publish a file to the upload queue")]
struct Args {
    /// File to upload
    file: PathBuf,

    /// Name to store the file under (defaults to the file's own name)
    #[arg(long)]
    name: Option<String>,

    /// Comma separated tags, e.g. "finance,q3"
    #[arg(long, default_value = "")]
    tags: String,

    /// Content type (guessed from the extension when omitted)
    #[arg(long)]
    content_type: Option<String>,

    #[command(flatten)]
    broker: BrokerArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse();

    let bytes = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let file_name = match args.name {
        Some(name) => name,
        None => args
            .file
            .file_name()
            .and_then(|n| n.to_str())
            .map(String::from)
            .context("File path has no usable file name, pass --name")?,
    };
    let content_type = args
        .content_type
        .unwrap_or_else(|| guess_content_type(&args.file).to_string());

    let data = FileData::new(file_name, content_type, parse_tags(&args.tags), bytes);
    let payload = serde_json::to_vec(&data).context("Failed to encode upload")?;

    let channel = args.broker.connect("stowage-upload").await?;
    channel
        .publish(&args.broker.file_data_queue, Delivery::new(payload))
        .await
        .context("Failed to publish upload")?;

    tracing::info!(
        file_name = %data.file_name,
        size_bytes = data.file_size,
        tags = ?data.file_tags,
        queue = %args.broker.file_data_queue,
        "Upload published"
    );

    Ok(())
}
