use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use stowage_cli::init_tracing;
use stowage_core::config::decode_key;

#[derive(Parser, Debug)]
#[command(name = "stowage-decrypt")]
#[command(about = "Decrypt a stored object")]
struct Args {
    /// Path of the `.encrypted` object
    source: PathBuf,

    /// Hex-encoded key (16 or 32 bytes)
    #[arg(long, env = "SECRET_KEY", hide_env_values = true)]
    key: String,

    /// Write plaintext here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse();
    let key = decode_key(&args.key)?;

    let plaintext = stowage_storage::decrypt(&args.source, &key)
        .await
        .with_context(|| format!("Failed to decrypt {}", args.source.display()))?;

    match args.output {
        Some(path) => {
            tokio::fs::write(&path, &plaintext)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(
                path = %path.display(),
                size_bytes = plaintext.len(),
                "Object decrypted"
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&plaintext)?;
            stdout.flush()?;
        }
    }

    Ok(())
}
