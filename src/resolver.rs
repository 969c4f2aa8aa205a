//! Gap detection and bounded resend.
//!
//! A run moves through four phases:
//!
//! ```text
//! Streaming ──► GapCompute ──► Resending ──► Done
//!                   │                         ▲
//!                   └──── no gaps ────────────┘
//! ```
//!
//! - **Streaming**: read frames until the peer closes. Idle timeouts only
//!   mean "nothing yet".
//! - **GapCompute**: `missing = [1, max_sequence_seen] \ recorded`.
//! - **Resending**: up to `max_retry_passes` sweeps over the missing set,
//!   one request and one awaited frame at a time, on a fresh session.
//! - **Done**: whatever is still missing stays missing.
//!
//! The resolver never opens or closes sessions itself; the caller owns both
//! session lifetimes.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::config::ClientConfig;
use crate::protocol::Request;
use crate::store::SequenceStore;
use crate::transport::{Received, Session};

/// Protocol phase of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Streaming,
    GapCompute,
    Resending,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Streaming => "STREAMING",
            Phase::GapCompute => "GAP_COMPUTE",
            Phase::Resending => "RESENDING",
            Phase::Done => "DONE",
        };
        f.write_str(name)
    }
}

/// Why the stream phase ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StreamEnd {
    /// Peer closed the connection.
    #[default]
    Closed,
    /// Read failed or a frame arrived short.
    ReceiveError,
    /// The `STREAM_ALL` request could not be written.
    SendError,
    /// `max_idle_polls` consecutive timeouts.
    Idle,
}

/// Counters for the stream phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub recorded: usize,
    pub dropped: usize,
    pub end: StreamEnd,
}

/// Counters for the resend phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResendSummary {
    /// Passes actually performed.
    pub passes: u32,
    /// Sequences that were missing before the phase and are present after it.
    pub recovered: usize,
    /// Sequences still missing when the phase ended.
    pub still_missing: BTreeSet<i32>,
    /// The session died before the retry budget was spent.
    pub session_lost: bool,
}

/// Result of one resend request.
#[derive(Debug)]
enum Attempt {
    Recorded,
    Failed,
    SessionLost,
}

/// Drives the stream and resend phases against a [`SequenceStore`].
#[derive(Debug, Clone)]
pub struct GapResolver {
    idle_timeout: Duration,
    max_retry_passes: u32,
    max_idle_polls: Option<u32>,
}

impl GapResolver {
    pub fn new(idle_timeout: Duration, max_retry_passes: u32) -> Self {
        Self {
            idle_timeout,
            max_retry_passes,
            max_idle_polls: None,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            idle_timeout: config.idle_timeout,
            max_retry_passes: config.max_retry_passes,
            max_idle_polls: config.max_idle_polls,
        }
    }

    /// Give up streaming after `limit` consecutive idle timeouts.
    pub fn with_max_idle_polls(mut self, limit: Option<u32>) -> Self {
        self.max_idle_polls = limit;
        self
    }

    /// Request the full dump and record every valid frame until the peer
    /// closes.
    pub async fn stream_all<S>(
        &self,
        session: &mut Session<S>,
        store: &mut SequenceStore,
    ) -> StreamSummary
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut recorded = 0;
        let mut dropped = 0;

        if let Err(e) = session.send_request(&Request::stream_all()).await {
            tracing::warn!("Failed to request stream from {}: {}", session.peer(), e);
            return StreamSummary {
                recorded,
                dropped,
                end: StreamEnd::SendError,
            };
        }

        let mut idle_polls = 0u32;
        let end = loop {
            match session.receive_frame(self.idle_timeout).await {
                Received::Frame(frame) => {
                    idle_polls = 0;
                    match store.record_frame(&frame) {
                        Ok(sequence) => {
                            recorded += 1;
                            tracing::debug!("Received packet {}", sequence);
                        }
                        Err(e) => {
                            dropped += 1;
                            tracing::warn!("Dropping packet: {}", e);
                        }
                    }
                }
                Received::Timeout => {
                    idle_polls += 1;
                    tracing::debug!("No data from {} ({} idle polls)", session.peer(), idle_polls);
                    if self.max_idle_polls.is_some_and(|limit| idle_polls >= limit) {
                        tracing::warn!("Stream idle for {} polls, ending stream phase", idle_polls);
                        break StreamEnd::Idle;
                    }
                }
                Received::Closed => break StreamEnd::Closed,
                Received::Failed(e) => {
                    tracing::warn!("Stream receive from {} failed: {}", session.peer(), e);
                    break StreamEnd::ReceiveError;
                }
            }
        };

        StreamSummary {
            recorded,
            dropped,
            end,
        }
    }

    /// Re-request every sequence in `[1, horizon]` not yet recorded.
    ///
    /// Performs at most `max_retry_passes` passes. A pass that recovers
    /// nothing still counts. Stops early once nothing is missing or the
    /// session is lost.
    pub async fn resend_missing<S>(
        &self,
        session: &mut Session<S>,
        store: &mut SequenceStore,
        horizon: i32,
    ) -> ResendSummary
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let initial = store.missing_up_to(horizon);
        let mut missing = initial.clone();
        let mut passes = 0;
        let mut session_lost = false;

        while !missing.is_empty() && passes < self.max_retry_passes && !session_lost {
            passes += 1;
            tracing::info!(
                "Resend pass {} of {}: requesting {} missing packets",
                passes,
                self.max_retry_passes,
                missing.len()
            );

            for &sequence in &missing {
                // An aliased reply may already have filled this one.
                if store.contains(sequence) {
                    continue;
                }
                match self.request_one(session, store, sequence).await {
                    Attempt::Recorded | Attempt::Failed => {}
                    Attempt::SessionLost => {
                        session_lost = true;
                        break;
                    }
                }
            }

            missing = store.missing_up_to(horizon);
        }

        let recovered = initial.iter().filter(|seq| store.contains(**seq)).count();
        if !missing.is_empty() {
            tracing::info!(
                "Giving up on {} packets after {} passes",
                missing.len(),
                passes
            );
        }

        ResendSummary {
            passes,
            recovered,
            still_missing: missing,
            session_lost,
        }
    }

    /// Send one `RESEND_ONE` request and wait for exactly one frame.
    async fn request_one<S>(
        &self,
        session: &mut Session<S>,
        store: &mut SequenceStore,
        sequence: i32,
    ) -> Attempt
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        if let Err(e) = session.send_request(&Request::resend(sequence)).await {
            tracing::warn!("Failed to send request for packet {}: {}", sequence, e);
            return Attempt::Failed;
        }

        match session.receive_frame(self.idle_timeout).await {
            Received::Frame(frame) => match store.record_frame(&frame) {
                Ok(got) => {
                    if got == sequence {
                        tracing::debug!("Recovered packet {}", got);
                    } else {
                        tracing::debug!("Requested packet {} but received {}", sequence, got);
                    }
                    Attempt::Recorded
                }
                Err(e) => {
                    tracing::warn!("Dropping resent packet for {}: {}", sequence, e);
                    Attempt::Failed
                }
            },
            Received::Timeout => {
                tracing::warn!("No response for packet {}", sequence);
                Attempt::Failed
            }
            Received::Closed => {
                tracing::warn!("{} closed the resend session", session.peer());
                Attempt::SessionLost
            }
            Received::Failed(e) => {
                tracing::warn!("Failed to receive packet {}: {}", sequence, e);
                Attempt::SessionLost
            }
        }
    }
}
