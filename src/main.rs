//! Command-line host for the chunking step.
//!
//! Reads an invocation event, runs it against the local filesystem blob
//! store and prints the output manifest as JSON.

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use row_chunk_transform::{
    AppError, ChunkingHandler, FsBlobStore, InvocationEvent, OutputManifest, Settings,
};

#[derive(Debug, Parser)]
#[command(name = "chunk-transform", version, about = "Split staged tabular batches into fixed-row chunks")]
struct Cli {
    /// Path to the invocation event JSON, or `-` for stdin.
    #[arg(long, default_value = "-")]
    event: String,

    /// Settings file (defaults to ./chunker.toml if present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the configured rows per chunk.
    #[arg(long, allow_negative_numbers = true)]
    rows_per_chunk: Option<i64>,

    /// Overrides the configured filesystem store root.
    #[arg(long)]
    storage_root: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(manifest) => match serde_json::to_string_pretty(&manifest) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => report(AppError::from(e)),
        },
        Err(e) => report(e),
    }
}

async fn run(cli: Cli) -> Result<OutputManifest, AppError> {
    let mut settings = Settings::read(cli.config.as_deref())?;
    if let Some(rows) = cli.rows_per_chunk {
        settings.rows_per_chunk = rows;
    }
    if let Some(root) = cli.storage_root {
        settings.storage_root = root;
    }
    settings.validate()?;

    init_tracing(&settings.log_filter);

    let event = read_event(&cli.event)?;
    let store = Arc::new(FsBlobStore::new(settings.storage_root.clone()));
    let handler = ChunkingHandler::new(store, settings.handler_options())?;

    handler.handle(&event).await
}

fn read_event(source: &str) -> Result<InvocationEvent, AppError> {
    let raw = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| AppError::InvalidPayload(format!("Failed to read stdin: {}", e)))?;
        buf
    } else {
        std::fs::read_to_string(source)
            .map_err(|e| AppError::InvalidPayload(format!("Failed to read {}: {}", source, e)))?
    };

    Ok(serde_json::from_str(&raw)?)
}

/// Logs to stderr; `RUST_LOG` takes precedence over the configured filter.
fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn report(err: AppError) -> ExitCode {
    tracing::error!(error = %err, "Chunk invocation failed");
    match serde_json::to_string(&err) {
        Ok(json) => eprintln!("{}", json),
        Err(_) => eprintln!("{}", err),
    }
    ExitCode::FAILURE
}
