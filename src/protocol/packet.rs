//! Decoded response packet.
//!
//! A [`Packet`] is only constructed through [`Packet::decode`], which first
//! checks that the buffer holds exactly one 17-byte frame and then reads each
//! field with explicit big-endian decoding.
//!
//! # Example
//!
//! ```
//! use abx_client::protocol::Packet;
//!
//! let packet = Packet::new(*b"AAPL", b'B', 50, 100, 1);
//! let bytes = packet.encode();
//! let decoded = Packet::decode(&bytes).unwrap();
//!
//! assert_eq!(decoded, packet);
//! assert!(decoded.is_valid());
//! ```

use bytes::{Buf, BufMut};

use super::wire_format::{FIELD_LIMIT, PACKET_SIZE, SYMBOL_LEN};
use crate::error::{FeedError, Result};

/// One sequenced market data packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    /// Ticker code, 4 ASCII bytes.
    pub symbol: [u8; SYMBOL_LEN],
    /// Buy/sell indicator, expected `B` or `S`.
    pub side: u8,
    pub quantity: i32,
    pub price: i32,
    pub sequence: i32,
}

impl Packet {
    /// Create a new packet from raw field values.
    pub fn new(
        symbol: [u8; SYMBOL_LEN],
        side: u8,
        quantity: i32,
        price: i32,
        sequence: i32,
    ) -> Self {
        Self {
            symbol,
            side,
            quantity,
            price,
            sequence,
        }
    }

    /// Decode a packet from a response frame.
    ///
    /// Returns `FrameSize` unless `buf` is exactly [`PACKET_SIZE`] bytes.
    /// Field invariants are not checked here, see [`Packet::validate`].
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() != PACKET_SIZE {
            return Err(FeedError::FrameSize {
                expected: PACKET_SIZE,
                actual: buf.len(),
            });
        }

        let mut cursor = buf;
        let mut symbol = [0u8; SYMBOL_LEN];
        cursor.copy_to_slice(&mut symbol);
        let side = cursor.get_u8();
        let quantity = cursor.get_i32();
        let price = cursor.get_i32();
        let sequence = cursor.get_i32();

        Ok(Self {
            symbol,
            side,
            quantity,
            price,
            sequence,
        })
    }

    /// Encode to the 17-byte wire layout.
    pub fn encode(&self) -> [u8; PACKET_SIZE] {
        let mut out = [0u8; PACKET_SIZE];
        let mut buf = &mut out[..];
        buf.put_slice(&self.symbol);
        buf.put_u8(self.side);
        buf.put_i32(self.quantity);
        buf.put_i32(self.price);
        buf.put_i32(self.sequence);
        out
    }

    /// Check the numeric field invariants.
    ///
    /// - `0 < sequence < 1_000_000`
    /// - `0 <= price < 1_000_000`
    /// - `0 <= quantity < 1_000_000`
    pub fn validate(&self) -> Result<()> {
        if !(self.sequence > 0 && self.sequence < FIELD_LIMIT) {
            return Err(FeedError::Validation(format!(
                "sequence {} out of range",
                self.sequence
            )));
        }
        if !(0..FIELD_LIMIT).contains(&self.price) {
            return Err(FeedError::Validation(format!(
                "price {} out of range for sequence {}",
                self.price, self.sequence
            )));
        }
        if !(0..FIELD_LIMIT).contains(&self.quantity) {
            return Err(FeedError::Validation(format!(
                "quantity {} out of range for sequence {}",
                self.quantity, self.sequence
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Symbol as text, ending at the first NUL. Non-UTF-8 bytes are replaced.
    pub fn symbol_str(&self) -> String {
        let end = self
            .symbol
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(SYMBOL_LEN);
        String::from_utf8_lossy(&self.symbol[..end]).into_owned()
    }

    /// Side as a character.
    #[inline]
    pub fn side_char(&self) -> char {
        self.side as char
    }
}

/// Decode and validate a frame in one step (standalone function).
pub fn decode_frame(buf: &[u8]) -> Result<Packet> {
    let packet = Packet::decode(buf)?;
    packet.validate()?;
    Ok(packet)
}
