//! Transport module - per-phase connection sessions.
//!
//! Provides a bounded-wait receive over any async byte stream, with a TCP
//! constructor for the real feed endpoint.

mod session;

pub use session::{Received, Session};
