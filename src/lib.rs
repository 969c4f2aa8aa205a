//! # abx-client
//!
//! Client for the ABX sequenced packet feed.
//!
//! The client connects to the feed server, requests a full dump of
//! sequence-numbered packets, detects gaps in what arrived, and re-requests
//! each missing packet over a second connection until a retry budget is
//! spent. The packets it ends up with are written, in sequence order, to a
//! JSON document.
//!
//! ## Architecture
//!
//! - **Protocol**: 2-byte request frames, 17-byte big-endian response frames
//! - **Store**: sequence number to packet map plus the highest sequence seen
//! - **Transport**: one session per protocol phase with bounded-wait receives
//! - **Resolver**: stream phase, gap computation, bounded resend passes
//! - **Output**: ordered assembly and JSON persistence
//!
//! ## Example
//!
//! ```ignore
//! use abx_client::FeedClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let report = FeedClient::builder()
//!         .endpoint("127.0.0.1:3000")
//!         .build()
//!         .run_and_write()
//!         .await?;
//!
//!     println!("missing: {:?}", report.still_missing());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod output;
pub mod protocol;
pub mod resolver;
pub mod store;
pub mod transport;

mod client;

pub use client::{FeedClient, FeedClientBuilder, RunReport};
pub use config::ClientConfig;
pub use error::{FeedError, Result};
pub use store::SequenceStore;
