use std::{net::SocketAddr, time::Duration};

use log::warn;

use dawn_shared::{messages::pack_messages, Serde};

use crate::{config::NetConfig, error::TransportError, transport::PacketSender};

/// Timing, error accounting and the outgoing queue for one peer
pub(crate) struct Connection<M: Serde> {
    address: SocketAddr,
    last_received: Duration,
    last_sent: Option<Duration>,
    protocol_errors: u32,
    outbox: Vec<M>,
}

impl<M: Serde> Connection<M> {
    pub fn new(address: SocketAddr, now: Duration) -> Self {
        Self {
            address,
            last_received: now,
            last_sent: None,
            protocol_errors: 0,
            outbox: Vec::new(),
        }
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn mark_received(&mut self, now: Duration) {
        self.last_received = now;
    }

    pub fn timed_out(&self, now: Duration, timeout: Duration) -> bool {
        now.saturating_sub(self.last_received) >= timeout
    }

    pub fn heartbeat_due(&self, now: Duration, interval: Duration) -> bool {
        self.outbox.is_empty()
            && self
                .last_sent
                .map_or(true, |sent| now.saturating_sub(sent) >= interval)
    }

    /// Counts a protocol error and returns true once the peer has reached
    /// the limit
    pub fn record_protocol_error(&mut self, max: u32) -> bool {
        self.protocol_errors = self.protocol_errors.saturating_add(1);
        self.protocol_errors >= max
    }

    pub fn queue(&mut self, message: M) {
        self.outbox.push(message);
    }

    /// Packs and sends everything queued
    pub fn flush(
        &mut self,
        sender: &dyn PacketSender,
        config: &NetConfig,
        now: Duration,
    ) -> Result<(), TransportError> {
        if self.outbox.is_empty() {
            return Ok(());
        }
        let messages = std::mem::take(&mut self.outbox);
        let packets = pack_messages(config.protocol_id, config.max_packet_bytes, messages);
        for packet in packets {
            if let Err(error) = sender.send(&self.address, &packet) {
                warn!("failed to send packet to {}: {}", self.address, error);
                return Err(error);
            }
        }
        self.last_sent = Some(now);
        Ok(())
    }
}
