//! `abx-client` binary.
//!
//! Parses CLI arguments, runs both feed phases and writes the output
//! document. Exits non-zero when the run cannot connect or the document
//! cannot be written.

mod cli;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use abx_client::FeedClient;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    // RUST_LOG wins; otherwise info, or debug with --verbose.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let client = FeedClient::new(cli.to_config());
    match client.run_and_write().await {
        Ok(report) => {
            tracing::info!("Total packets received: {}", report.store.len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Feed run failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
