use std::net::{SocketAddr, ToSocketAddrs};

use crate::error::TransportError;

mod local;
pub use local::LocalTransport;

cfg_if! {
    if #[cfg(feature = "transport_udp")] {
        mod udp;
        pub use udp::UdpTransport;
    }
}

pub type Socket = (Box<dyn PacketSender>, Box<dyn PacketReceiver>);

/// Opens sockets for a `NetInstance`
pub trait Transport: Send + Sync {
    /// Binds a server socket to `address`
    fn listen(&self, address: SocketAddr) -> Result<Socket, TransportError>;

    /// Opens a client socket for talking to `server`
    fn connect(&self, server: SocketAddr) -> Result<Socket, TransportError>;
}

/// Used to send packets through a socket
pub trait PacketSender: Send {
    /// Sends a packet to the given address. Unreachable destinations are not
    /// an error.
    fn send(&self, address: &SocketAddr, payload: &[u8]) -> Result<(), TransportError>;

    fn local_addr(&self) -> SocketAddr;
}

/// Used to receive packets from a socket
pub trait PacketReceiver: Send {
    /// Receives the next packet, if one is waiting
    fn receive(&mut self) -> Result<Option<(SocketAddr, &[u8])>, TransportError>;
}

pub(crate) fn resolve(host: &str, port: u16) -> Result<SocketAddr, TransportError> {
    (host, port)
        .to_socket_addrs()
        .ok()
        .and_then(|mut addresses| addresses.next())
        .ok_or_else(|| TransportError::InvalidAddress {
            host: host.to_string(),
            port,
        })
}
