//! Document text extraction service.
//!
//! Listens for storage CloudEvents and extracts PDF text with Document AI,
//! or processes a single object given on the command line.

use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use ingester::{metrics, start_server, IngesterConfig, ServerState};
use ingestion::TriggerEvent;

#[derive(Parser, Debug)]
#[command(name = "ingester")]
#[command(about = "Extracts PDF text with Document AI when metadata files land in a bucket")]
struct Args {
    /// HTTP listen port
    #[arg(long, env = "PORT", default_value = "8080")]
    port: u16,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Process this bucket's object once and exit (requires --object)
    #[arg(long, requires = "object")]
    bucket: Option<String>,

    /// Object key to process with --bucket
    #[arg(long, requires = "bucket")]
    object: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting document text extraction service");

    let config = IngesterConfig::from_env()?;
    let ingester = config.build_ingester();

    if let (Some(bucket), Some(object)) = (args.bucket, args.object) {
        // Single event mode
        let event = TriggerEvent::new(bucket, object);
        return match ingester.handle_event(&event).await {
            Ok(outcome) => {
                info!(outcome = outcome.label(), "Function finished successfully");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Errors found during execution");
                bail!("processing gs://{}/{} failed: {}", event.bucket, event.key, e)
            }
        };
    }

    let prometheus = metrics::install_recorder()?;
    info!("Prometheus metrics exporter initialized");

    let state = Arc::new(ServerState {
        ingester,
        prometheus: Some(prometheus),
    });

    start_server(state, args.port).await
}
