//! Wire format constants and request frame encoding.
//!
//! Request frame (client to server), 2 bytes:
//! ```text
//! ┌───────────┬──────────┐
//! │ Call type │ Index    │
//! │ 1 byte    │ 1 byte   │
//! └───────────┴──────────┘
//! ```
//!
//! Response frame (server to client), 17 bytes:
//! ```text
//! ┌──────────┬──────┬──────────┬──────────┬──────────┐
//! │ Symbol   │ Side │ Quantity │ Price    │ Sequence │
//! │ 4 bytes  │ 1    │ i32 BE   │ i32 BE   │ i32 BE   │
//! └──────────┴──────┴──────────┴──────────┴──────────┘
//! ```
//!
//! All multi-byte integers are Big Endian.

use crate::error::{FeedError, Result};

/// Request frame size in bytes (fixed, exactly 2).
pub const REQUEST_SIZE: usize = 2;

/// Response frame size in bytes (fixed, exactly 17).
pub const PACKET_SIZE: usize = 17;

/// Width of the symbol field.
pub const SYMBOL_LEN: usize = 4;

/// Exclusive upper bound shared by sequence, price and quantity.
pub const FIELD_LIMIT: i32 = 1_000_000;

/// Highest sequence number the one-byte resend index can address.
pub const MAX_RESEND_INDEX: i32 = u8::MAX as i32;

/// Call type carried in byte 0 of a request frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CallType {
    /// Ask the server to push every packet, then close.
    StreamAll = 1,
    /// Ask the server for the single packet at `index`.
    ResendOne = 2,
}

impl TryFrom<u8> for CallType {
    type Error = FeedError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(CallType::StreamAll),
            2 => Ok(CallType::ResendOne),
            other => Err(FeedError::UnknownCallType(other)),
        }
    }
}

/// A transient request value. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub call_type: CallType,
    /// Resend index; only meaningful for `ResendOne`.
    pub index: u8,
}

impl Request {
    /// Request the full dump.
    pub fn stream_all() -> Self {
        Self {
            call_type: CallType::StreamAll,
            index: 0,
        }
    }

    /// Request a resend of `sequence`.
    ///
    /// The index field is a single byte, so sequences above 255 are
    /// truncated to their low byte and alias a different packet. This is a
    /// known limitation of the wire format and is kept as is.
    pub fn resend(sequence: i32) -> Self {
        if !(0..=MAX_RESEND_INDEX).contains(&sequence) {
            tracing::warn!(
                "Sequence {} does not fit the one-byte resend index, requesting {} instead",
                sequence,
                sequence as u8
            );
        }
        Self {
            call_type: CallType::ResendOne,
            index: sequence as u8,
        }
    }

    /// Encode request to bytes.
    ///
    /// # Example
    ///
    /// ```
    /// use abx_client::protocol::Request;
    ///
    /// assert_eq!(Request::stream_all().encode(), [1, 0]);
    /// assert_eq!(Request::resend(3).encode(), [2, 3]);
    /// ```
    pub fn encode(&self) -> [u8; REQUEST_SIZE] {
        [self.call_type as u8, self.index]
    }

    /// Decode a request frame. The buffer must hold exactly 2 bytes.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() != REQUEST_SIZE {
            return Err(FeedError::FrameSize {
                expected: REQUEST_SIZE,
                actual: buf.len(),
            });
        }
        Ok(Self {
            call_type: CallType::try_from(buf[0])?,
            index: buf[1],
        })
    }
}

/// Encode a request frame (standalone function).
#[inline]
pub fn encode_request(call_type: CallType, index: u8) -> [u8; REQUEST_SIZE] {
    Request { call_type, index }.encode()
}
