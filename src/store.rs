//! In-memory sequence store.
//!
//! The [`SequenceStore`] is the single record of what has been received in a
//! run: a map from sequence number to [`Packet`] plus the highest sequence
//! observed. It is owned by the run and handed to the resolver by `&mut`.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::Result;
use crate::protocol::{decode_frame, Packet};

/// Packets received so far, keyed by sequence number.
#[derive(Debug, Default, Clone)]
pub struct SequenceStore {
    packets: BTreeMap<i32, Packet>,
    max_sequence_seen: i32,
}

impl SequenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode, validate and record one response frame.
    ///
    /// Returns the recorded sequence number. Nothing is stored when the frame
    /// is malformed or the packet fails validation.
    pub fn record_frame(&mut self, frame: &[u8]) -> Result<i32> {
        let packet = decode_frame(frame)?;
        self.insert(packet);
        Ok(packet.sequence)
    }

    /// Insert an already validated packet.
    ///
    /// A later packet with the same sequence replaces the earlier one.
    pub(crate) fn insert(&mut self, packet: Packet) {
        if self.packets.insert(packet.sequence, packet).is_some() {
            tracing::debug!("Replaced duplicate packet {}", packet.sequence);
        }
        self.max_sequence_seen = self.max_sequence_seen.max(packet.sequence);
    }

    pub fn get(&self, sequence: i32) -> Option<&Packet> {
        self.packets.get(&sequence)
    }

    pub fn contains(&self, sequence: i32) -> bool {
        self.packets.contains_key(&sequence)
    }

    /// Highest sequence recorded so far (0 when empty).
    #[inline]
    pub fn max_sequence_seen(&self) -> i32 {
        self.max_sequence_seen
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Sequences in `[1, max_sequence_seen]` with no recorded packet.
    pub fn missing(&self) -> BTreeSet<i32> {
        self.missing_up_to(self.max_sequence_seen)
    }

    /// Sequences in `[1, horizon]` with no recorded packet.
    pub fn missing_up_to(&self, horizon: i32) -> BTreeSet<i32> {
        (1..=horizon).filter(|seq| !self.contains(*seq)).collect()
    }

    /// Iterate recorded packets in ascending sequence order.
    pub fn iter(&self) -> impl Iterator<Item = &Packet> {
        self.packets.values()
    }
}
