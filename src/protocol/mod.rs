//! Protocol module - wire format and frame types.
//!
//! This module implements the binary feed protocol:
//! - 2-byte request frames (`STREAM_ALL`, `RESEND_ONE`)
//! - 17-byte response frames decoded into [`Packet`]
//! - Field invariant validation

mod packet;
mod wire_format;

pub use packet::{decode_frame, Packet};
pub use wire_format::{
    encode_request, CallType, Request, FIELD_LIMIT, MAX_RESEND_INDEX, PACKET_SIZE, REQUEST_SIZE,
    SYMBOL_LEN,
};
