//! Shared helpers for the Stowage command line tools.
//!
//! Broker settings come from flags or the same environment variables the store service
//! reads (`NATS_URL`, `NATS_USER`, `NATS_PASSWORD`, queue names).

use clap::{Args, ValueEnum};
use std::path::Path;
use stowage_core::config::{
    DEFAULT_FILE_DATA_QUEUE, DEFAULT_FILE_NAMES_QUEUE, DEFAULT_FILE_REQUEST_QUEUE,
};
use stowage_worker::NatsChannel;

/// How `stowage-lookup` prints the matched names
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One name per line (default)
    #[default]
    Lines,
    /// Pretty-printed JSON array
    Json,
}

impl OutputFormat {
    pub fn render(&self, names: &[String]) -> serde_json::Result<String> {
        match self {
            OutputFormat::Lines => Ok(names.join("\n")),
            OutputFormat::Json => serde_json::to_string_pretty(names),
        }
    }
}

/// Broker connection flags shared by the publishing tools
#[derive(Args, Debug, Clone)]
pub struct BrokerArgs {
    /// NATS server URL
    #[arg(long, env = "NATS_URL", default_value = "nats://127.0.0.1:4222")]
    pub nats_url: String,

    /// NATS user name
    #[arg(long, env = "NATS_USER")]
    pub nats_user: Option<String>,

    /// NATS password
    #[arg(long, env = "NATS_PASSWORD", hide_env_values = true)]
    pub nats_password: Option<String>,

    /// Queue carrying uploads
    #[arg(long, env = "FILE_DATA_QUEUE", default_value = DEFAULT_FILE_DATA_QUEUE)]
    pub file_data_queue: String,

    /// Queue carrying lookup requests
    #[arg(long, env = "FILE_REQUEST_QUEUE", default_value = DEFAULT_FILE_REQUEST_QUEUE)]
    pub file_request_queue: String,

    /// Queue carrying lookup responses
    #[arg(long, env = "FILE_NAMES_QUEUE", default_value = DEFAULT_FILE_NAMES_QUEUE)]
    pub file_names_queue: String,
}

impl BrokerArgs {
    pub async fn connect(&self, client_name: &str) -> anyhow::Result<NatsChannel> {
        let channel = NatsChannel::connect(
            &self.nats_url,
            self.nats_user.as_deref(),
            self.nats_password.as_deref(),
            client_name,
        )
        .await?;
        Ok(channel)
    }
}

/// Split a comma separated tag list. Blank entries are dropped.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// Best-effort content type from the file extension
pub fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("txt") | Some("log") => "text/plain",
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("zip") => "application/zip",
        _ => "application/octet-stream",
    }
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
