use std::{
    io,
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket},
    sync::Arc,
};

use log::warn;

use super::{PacketReceiver, PacketSender, Socket, Transport};
use crate::error::TransportError;

const RECEIVE_BUFFER_BYTES: usize = 1500;

/// Non-blocking UDP sockets from the standard library
#[derive(Clone, Copy, Debug, Default)]
pub struct UdpTransport;

fn open(bind: SocketAddr) -> Result<Socket, TransportError> {
    let socket = UdpSocket::bind(bind).map_err(|error| {
        if error.kind() == io::ErrorKind::AddrInUse {
            TransportError::AddressInUse { address: bind }
        } else {
            TransportError::io("bind", error)
        }
    })?;
    socket
        .set_nonblocking(true)
        .map_err(|error| TransportError::io("set_nonblocking", error))?;
    let local_addr = socket
        .local_addr()
        .map_err(|error| TransportError::io("local_addr", error))?;

    let socket = Arc::new(socket);
    Ok((
        Box::new(UdpSender {
            socket: socket.clone(),
            local_addr,
        }),
        Box::new(UdpReceiver {
            socket,
            buffer: vec![0; RECEIVE_BUFFER_BYTES].into_boxed_slice(),
        }),
    ))
}

impl Transport for UdpTransport {
    fn listen(&self, address: SocketAddr) -> Result<Socket, TransportError> {
        open(address)
    }

    fn connect(&self, server: SocketAddr) -> Result<Socket, TransportError> {
        let any_host = match server.ip() {
            IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        };
        open(SocketAddr::new(any_host, 0))
    }
}

struct UdpSender {
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
}

impl PacketSender for UdpSender {
    fn send(&self, address: &SocketAddr, payload: &[u8]) -> Result<(), TransportError> {
        match self.socket.send_to(payload, address) {
            Ok(_) => Ok(()),
            // datagrams are unreliable anyway; a full buffer loses this one
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                warn!("UDP send buffer full, dropping packet to {}", address);
                Ok(())
            }
            Err(error) => Err(TransportError::io("send_to", error)),
        }
    }

    fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

struct UdpReceiver {
    socket: Arc<UdpSocket>,
    buffer: Box<[u8]>,
}

impl PacketReceiver for UdpReceiver {
    fn receive(&mut self) -> Result<Option<(SocketAddr, &[u8])>, TransportError> {
        loop {
            match self.socket.recv_from(&mut self.buffer) {
                Ok((length, address)) => return Ok(Some((address, &self.buffer[..length]))),
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => return Ok(None),
                // reported on some platforms after sending to a closed port
                Err(error) if error.kind() == io::ErrorKind::ConnectionReset => continue,
                Err(error) => return Err(TransportError::io("recv_from", error)),
            }
        }
    }
}
