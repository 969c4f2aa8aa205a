//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Default feed endpoint.
pub const DEFAULT_ENDPOINT: &str = "127.0.0.1:3000";

/// Default idle timeout for a single receive.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default bound on resend passes.
pub const DEFAULT_MAX_RETRY_PASSES: u32 = 5;

/// Default output document path.
pub const DEFAULT_OUTPUT_PATH: &str = "output.json";

/// Settings for one feed run.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// `host:port` of the feed server.
    pub endpoint: String,
    /// How long a receive waits before reporting "nothing yet".
    pub idle_timeout: Duration,
    /// Upper bound on passes over the missing set during resend.
    pub max_retry_passes: u32,
    /// Consecutive idle timeouts after which the stream phase gives up.
    /// `None` waits for the peer to close, however long that takes.
    pub max_idle_polls: Option<u32>,
    /// Where the output document is written.
    pub output_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            max_retry_passes: DEFAULT_MAX_RETRY_PASSES,
            max_idle_polls: None,
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
        }
    }
}
