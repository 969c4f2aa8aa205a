//! Command line interface for the `abx-client` binary.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use abx_client::config::{
    ClientConfig, DEFAULT_ENDPOINT, DEFAULT_MAX_RETRY_PASSES, DEFAULT_OUTPUT_PATH,
};

/// Command line arguments for the `abx-client` binary.
#[derive(Debug, Parser)]
#[command(
    name = "abx-client",
    version,
    about = "Fetch the ABX packet feed, recover gaps and write it as JSON"
)]
pub struct Cli {
    /// Feed server address as host:port.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Seconds a receive waits before treating the socket as idle.
    #[arg(long, default_value = "5", value_parser = parse_seconds)]
    pub idle_timeout: Duration,

    /// Maximum passes over the missing set during resend.
    #[arg(long = "max-retries", default_value_t = DEFAULT_MAX_RETRY_PASSES)]
    pub max_retries: u32,

    /// End the stream phase after this many consecutive idle timeouts.
    #[arg(long)]
    pub max_idle_polls: Option<u32>,

    /// Path of the JSON document to write.
    #[arg(short, long, default_value = DEFAULT_OUTPUT_PATH)]
    pub output: PathBuf,

    /// Log at debug level.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn to_config(&self) -> ClientConfig {
        ClientConfig {
            endpoint: self.endpoint.clone(),
            idle_timeout: self.idle_timeout,
            max_retry_passes: self.max_retries,
            max_idle_polls: self.max_idle_polls,
            output_path: self.output.clone(),
        }
    }
}

fn parse_seconds(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .parse()
        .map_err(|_| format!("`{value}` is not a number of seconds"))?;
    if !(secs.is_finite() && secs > 0.0) {
        return Err(format!("idle timeout must be positive, got {value}"));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| format!("idle timeout `{value}`: {e}"))
}
