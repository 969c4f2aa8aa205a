//! Output assembly and the persisted JSON document.
//!
//! The document shape is:
//!
//! ```json
//! {
//!     "packets": [
//!         { "symbol": "AAPL", "buySellIndicator": "B", "quantity": 50, "price": 100, "sequence": 1 }
//!     ]
//! }
//! ```
//!
//! Packets appear in ascending sequence order and only sequences that were
//! received and validated are present.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FeedError, Result};
use crate::protocol::Packet;
use crate::store::SequenceStore;

/// Walk `1..=max_sequence_seen` and collect the packets that are present.
pub fn assemble(store: &SequenceStore) -> Vec<Packet> {
    (1..=store.max_sequence_seen())
        .filter_map(|seq| store.get(seq).copied())
        .collect()
}

/// One packet as it appears in the output document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketRecord {
    pub symbol: String,
    #[serde(rename = "buySellIndicator")]
    pub buy_sell_indicator: String,
    pub quantity: i32,
    pub price: i32,
    pub sequence: i32,
}

impl From<&Packet> for PacketRecord {
    fn from(packet: &Packet) -> Self {
        Self {
            symbol: packet.symbol_str(),
            buy_sell_indicator: packet.side_char().to_string(),
            quantity: packet.quantity,
            price: packet.price,
            sequence: packet.sequence,
        }
    }
}

/// The persisted document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedDocument {
    pub packets: Vec<PacketRecord>,
}

impl FeedDocument {
    pub fn from_packets(packets: &[Packet]) -> Self {
        Self {
            packets: packets.iter().map(PacketRecord::from).collect(),
        }
    }

    /// Serialize with a 4-space indent.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(writer, formatter);
        self.serialize(&mut ser)?;
        Ok(())
    }

    pub fn to_json_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        String::from_utf8(buf)
            .map_err(|e| FeedError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
    }
}

/// Write the assembled packets to `path`, replacing any existing file.
pub fn write_document(path: &Path, packets: &[Packet]) -> Result<()> {
    let document = FeedDocument::from_packets(packets);
    let mut writer = BufWriter::new(File::create(path)?);
    document.write_to(&mut writer)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    tracing::debug!("Wrote {} packets to {}", packets.len(), path.display());
    Ok(())
}
