//! Connection session over a reliable byte stream.
//!
//! One [`Session`] is opened per protocol phase and closed at phase end. The
//! server treats connection boundaries as phase boundaries, so a session is
//! never reused across phases.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use abx_client::protocol::Request;
//! use abx_client::transport::{Received, Session};
//!
//! let mut session = Session::open("127.0.0.1:3000").await?;
//! session.send_request(&Request::stream_all()).await?;
//! match session.receive_frame(Duration::from_secs(5)).await {
//!     Received::Frame(frame) => println!("{} bytes", frame.len()),
//!     Received::Timeout => {}
//!     Received::Closed | Received::Failed(_) => session.close().await,
//! }
//! ```

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::{FeedError, Result};
use crate::protocol::{Request, PACKET_SIZE};

/// Outcome of waiting for one response frame.
#[derive(Debug)]
pub enum Received {
    /// Exactly one full frame arrived.
    Frame([u8; PACKET_SIZE]),
    /// Nothing arrived within the idle timeout.
    Timeout,
    /// The peer closed the connection.
    Closed,
    /// Read error or short read.
    Failed(FeedError),
}

/// One connection to the feed server.
pub struct Session<S> {
    stream: Option<S>,
    peer: String,
}

impl Session<TcpStream> {
    /// Connect to the feed endpoint.
    ///
    /// Failure is returned as [`FeedError::Connect`] and is not retried here.
    pub async fn open(endpoint: &str) -> Result<Self> {
        let stream = TcpStream::connect(endpoint)
            .await
            .map_err(|source| FeedError::Connect {
                endpoint: endpoint.to_string(),
                source,
            })?;
        // 2-byte requests must go out immediately.
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!("Could not set TCP_NODELAY on {}: {}", endpoint, e);
        }
        tracing::debug!("Connected to {}", endpoint);
        Ok(Self::from_stream(stream, endpoint))
    }
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an already connected stream.
    pub fn from_stream(stream: S, peer: impl Into<String>) -> Self {
        Self {
            stream: Some(stream),
            peer: peer.into(),
        }
    }

    /// Peer label used in log lines.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Write exactly `bytes`.
    pub async fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(FeedError::ConnectionClosed)?;
        stream.write_all(bytes).await.map_err(FeedError::Send)?;
        stream.flush().await.map_err(FeedError::Send)
    }

    /// Encode and send a request frame.
    pub async fn send_request(&mut self, request: &Request) -> Result<()> {
        self.send(&request.encode()).await
    }

    /// Wait up to `timeout` for one response frame.
    ///
    /// The frame must arrive whole in a single read. A short read is
    /// reported as [`Received::Failed`] with [`FeedError::FrameSize`] and the
    /// partial bytes are discarded.
    pub async fn receive_frame(&mut self, timeout: Duration) -> Received {
        let Some(stream) = self.stream.as_mut() else {
            return Received::Closed;
        };

        let mut buf = [0u8; PACKET_SIZE];
        match tokio::time::timeout(timeout, stream.read(&mut buf)).await {
            Err(_elapsed) => Received::Timeout,
            Ok(Ok(0)) => Received::Closed,
            Ok(Ok(PACKET_SIZE)) => Received::Frame(buf),
            Ok(Ok(n)) => Received::Failed(FeedError::FrameSize {
                expected: PACKET_SIZE,
                actual: n,
            }),
            Ok(Err(e)) => Received::Failed(FeedError::Io(e)),
        }
    }

    /// Shut down and release the connection. Safe to call more than once.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                tracing::debug!("Shutdown of {} failed: {}", self.peer, e);
            }
            tracing::debug!("Closed session to {}", self.peer);
        }
    }
}
