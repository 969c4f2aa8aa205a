//! Client builder and run orchestration.
//!
//! The [`FeedClientBuilder`] provides a fluent API for configuration. The
//! [`FeedClient`] owns the run lifecycle:
//! 1. Connect, request the full dump, record frames until the peer closes
//! 2. Compute the missing sequences
//! 3. Reconnect and re-request each gap, bounded by the retry budget
//! 4. Hand the ordered packets to the output writer
//!
//! # Example
//!
//! ```ignore
//! use abx_client::FeedClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = FeedClient::builder()
//!         .endpoint("127.0.0.1:3000")
//!         .max_retry_passes(5)
//!         .build();
//!
//!     let report = client.run_and_write().await?;
//!     println!("{} packets", report.store.len());
//!     Ok(())
//! }
//! ```

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::output::{assemble, write_document};
use crate::protocol::Packet;
use crate::resolver::{GapResolver, Phase, ResendSummary, StreamSummary};
use crate::store::SequenceStore;
use crate::transport::Session;

/// Builder for configuring a [`FeedClient`].
#[derive(Debug, Clone, Default)]
pub struct FeedClientBuilder {
    config: ClientConfig,
}

impl FeedClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `host:port` of the feed server.
    ///
    /// Default: `127.0.0.1:3000`
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    /// Set how long one receive waits before reporting "nothing yet".
    ///
    /// Default: 5 seconds
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    /// Set the bound on resend passes.
    ///
    /// Default: 5
    pub fn max_retry_passes(mut self, passes: u32) -> Self {
        self.config.max_retry_passes = passes;
        self
    }

    /// End the stream phase after this many consecutive idle timeouts.
    ///
    /// Default: unbounded
    pub fn max_idle_polls(mut self, limit: Option<u32>) -> Self {
        self.config.max_idle_polls = limit;
        self
    }

    /// Set the output document path.
    ///
    /// Default: `output.json`
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_path = path.into();
        self
    }

    pub fn build(self) -> FeedClient {
        FeedClient::new(self.config)
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Everything recorded across both phases.
    pub store: SequenceStore,
    pub stream: StreamSummary,
    /// Gaps found after the stream phase.
    pub missing_after_stream: BTreeSet<i32>,
    /// `None` when there was nothing to resend.
    pub resend: Option<ResendSummary>,
}

impl RunReport {
    /// Packets in ascending sequence order, gaps skipped.
    pub fn packets(&self) -> Vec<Packet> {
        assemble(&self.store)
    }

    /// Sequences that never arrived.
    pub fn still_missing(&self) -> BTreeSet<i32> {
        match &self.resend {
            Some(resend) => resend.still_missing.clone(),
            None => BTreeSet::new(),
        }
    }

    /// Packets recovered in the resend phase.
    pub fn recovered(&self) -> usize {
        self.resend.as_ref().map_or(0, |r| r.recovered)
    }
}

/// A configured feed client.
#[derive(Debug, Clone)]
pub struct FeedClient {
    config: ClientConfig,
}

impl FeedClient {
    pub fn builder() -> FeedClientBuilder {
        FeedClientBuilder::new()
    }

    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Run both protocol phases and return what was received.
    ///
    /// Only a failed connect aborts the run. Every other failure leaves the
    /// affected sequences missing.
    pub async fn run(&self) -> Result<RunReport> {
        let resolver = GapResolver::from_config(&self.config);
        let endpoint = self.config.endpoint.as_str();
        let mut store = SequenceStore::new();

        let mut stream = StreamSummary::default();
        let mut missing_after_stream = BTreeSet::new();
        let mut resend = None;

        let mut phase = Phase::Streaming;
        loop {
            tracing::debug!("Entering {}", phase);
            phase = match phase {
                Phase::Streaming => {
                    let mut session = Session::open(endpoint).await?;
                    let summary = resolver.stream_all(&mut session, &mut store).await;
                    session.close().await;
                    tracing::info!(
                        "Stream phase ended ({:?}): {} packets recorded, {} dropped",
                        summary.end,
                        summary.recorded,
                        summary.dropped
                    );
                    stream = summary;
                    Phase::GapCompute
                }
                Phase::GapCompute => {
                    missing_after_stream = store.missing();
                    if missing_after_stream.is_empty() {
                        Phase::Done
                    } else {
                        tracing::info!(
                            "{} of {} sequences missing",
                            missing_after_stream.len(),
                            store.max_sequence_seen()
                        );
                        Phase::Resending
                    }
                }
                Phase::Resending => {
                    let horizon = store.max_sequence_seen();
                    let mut session = Session::open(endpoint).await?;
                    let summary = resolver
                        .resend_missing(&mut session, &mut store, horizon)
                        .await;
                    session.close().await;
                    resend = Some(summary);
                    Phase::Done
                }
                Phase::Done => break,
            };
        }

        Ok(RunReport {
            store,
            stream,
            missing_after_stream,
            resend,
        })
    }

    /// Run, then persist the ordered packets to the configured output path.
    ///
    /// Nothing is written when the run fails.
    pub async fn run_and_write(&self) -> Result<RunReport> {
        let report = self.run().await?;
        let packets = report.packets();
        write_document(&self.config.output_path, &packets)?;

        tracing::info!(
            "Wrote {} packets to {} ({} recovered, {} still missing)",
            packets.len(),
            self.config.output_path.display(),
            report.recovered(),
            report.still_missing().len()
        );
        Ok(report)
    }
}
