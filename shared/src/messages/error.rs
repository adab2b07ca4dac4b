use thiserror::Error;

use dawn_serde::SerdeErr;

/// Errors that can occur while reading a packet
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    /// The packet belongs to a different protocol or version
    #[error("Packet protocol id {received:#010x} does not match {expected:#010x}")]
    ProtocolMismatch { expected: u32, received: u32 },

    /// A message in the packet could not be decoded
    #[error("Malformed message in packet: {0}")]
    Malformed(#[from] SerdeErr),
}
