mod client;
mod error;
mod packet;
mod server;

pub use client::ClientMessage;
pub use error::MessageError;
pub use packet::{
    max_message_bits, pack_messages, read_packet, PacketWriter, PACKET_HEADER_BITS,
};
pub use server::{RejectReason, ServerMessage};
