use log::warn;

use dawn_serde::{BitReader, BitWrite, BitWriter, Serde};

use crate::messages::MessageError;

/// Protocol id (32 bits) followed by the message count (16 bits)
pub const PACKET_HEADER_BITS: u32 = 48;

/// Largest single message that fits in a datagram of `max_bytes`
pub fn max_message_bits(max_bytes: usize) -> u32 {
    u32::try_from(max_bytes.saturating_mul(8))
        .unwrap_or(u32::MAX)
        .saturating_sub(PACKET_HEADER_BITS)
}

/// Batches messages into datagrams no larger than a byte budget
pub struct PacketWriter<M: Serde> {
    protocol_id: u32,
    max_bits: u32,
    messages: Vec<M>,
    bits: u32,
}

impl<M: Serde> PacketWriter<M> {
    pub fn new(protocol_id: u32, max_bytes: usize) -> Self {
        let max_bits = u32::try_from(max_bytes.saturating_mul(8)).unwrap_or(u32::MAX);
        Self {
            protocol_id,
            max_bits,
            messages: Vec::new(),
            bits: PACKET_HEADER_BITS,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Adds the message if it fits in the budget, otherwise hands it back
    pub fn try_push(&mut self, message: M) -> Result<(), M> {
        let message_bits = message.bit_length();
        let total = self.bits.saturating_add(message_bits);
        if total > self.max_bits || self.messages.len() >= usize::from(u16::MAX) {
            return Err(message);
        }
        self.bits = total;
        self.messages.push(message);
        Ok(())
    }

    pub fn finish(self) -> Box<[u8]> {
        let mut writer = BitWriter::with_capacity(self.bits.div_ceil(8) as usize);
        self.protocol_id.ser(&mut writer);
        // try_push caps the count at u16::MAX
        (self.messages.len() as u16).ser(&mut writer);
        for message in &self.messages {
            message.ser(&mut writer);
        }
        writer.to_bytes()
    }
}

/// Packs `messages` into as few datagrams as fit the byte budget, keeping
/// their order. A message too large for an empty datagram is dropped.
pub fn pack_messages<M: Serde>(
    protocol_id: u32,
    max_bytes: usize,
    messages: impl IntoIterator<Item = M>,
) -> Vec<Box<[u8]>> {
    let mut packets = Vec::new();
    let mut writer = PacketWriter::new(protocol_id, max_bytes);
    for message in messages {
        if let Err(message) = writer.try_push(message) {
            if writer.is_empty() {
                warn!(
                    "dropping message of {} bits, larger than a {} byte packet",
                    message.bit_length(),
                    max_bytes
                );
                continue;
            }
            packets.push(writer.finish());
            writer = PacketWriter::new(protocol_id, max_bytes);
            if let Err(message) = writer.try_push(message) {
                warn!(
                    "dropping message of {} bits, larger than a {} byte packet",
                    message.bit_length(),
                    max_bytes
                );
            }
        }
    }
    if !writer.is_empty() {
        packets.push(writer.finish());
    }
    packets
}

/// Reads every message of a datagram. Fails on the first message that
/// can't be decoded.
pub fn read_packet<M: Serde>(protocol_id: u32, payload: &[u8]) -> Result<Vec<M>, MessageError> {
    let mut reader = BitReader::new(payload);
    let received = u32::de(&mut reader)?;
    if received != protocol_id {
        return Err(MessageError::ProtocolMismatch {
            expected: protocol_id,
            received,
        });
    }
    let count = u16::de(&mut reader)?;
    let mut messages = Vec::with_capacity(usize::from(count).min(64));
    for _ in 0..count {
        messages.push(M::de(&mut reader)?);
    }
    Ok(messages)
}
