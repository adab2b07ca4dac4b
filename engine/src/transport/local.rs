use std::{
    collections::HashMap,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::{Arc, Mutex, MutexGuard},
};

use log::trace;
use smol::channel::{self, Receiver, Sender, TryRecvError};

use super::{PacketReceiver, PacketSender, Socket, Transport};
use crate::error::TransportError;

type Datagram = (SocketAddr, Box<[u8]>);

const FIRST_EPHEMERAL_PORT: u16 = 49152;

/// In-process transport. Every socket opened through clones of the same
/// `LocalTransport` can reach every other one. A listener bound to an
/// unspecified address receives packets sent to any host on its port.
#[derive(Clone, Default)]
pub struct LocalTransport {
    hub: Arc<Mutex<Hub>>,
}

#[derive(Default)]
struct Hub {
    endpoints: HashMap<SocketAddr, Sender<Datagram>>,
    next_port: u16,
}

impl Hub {
    fn route(&self, destination: &SocketAddr) -> Option<&Sender<Datagram>> {
        self.endpoints.get(destination).or_else(|| {
            let any_host = match destination.ip() {
                IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                IpAddr::V6(_) => IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED),
            };
            self.endpoints
                .get(&SocketAddr::new(any_host, destination.port()))
        })
    }

    fn ephemeral_address(&mut self) -> SocketAddr {
        loop {
            if self.next_port < FIRST_EPHEMERAL_PORT {
                self.next_port = FIRST_EPHEMERAL_PORT;
            }
            let address = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), self.next_port);
            self.next_port = self.next_port.wrapping_add(1);
            if !self.endpoints.contains_key(&address) {
                return address;
            }
        }
    }

    fn open(&mut self, hub: &Arc<Mutex<Hub>>, address: SocketAddr) -> Socket {
        let (sender, receiver) = channel::unbounded();
        self.endpoints.insert(address, sender);
        (
            Box::new(LocalSender {
                hub: hub.clone(),
                address,
            }),
            Box::new(LocalReceiver {
                hub: hub.clone(),
                address,
                receiver,
                current_payload: None,
            }),
        )
    }
}

impl LocalTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Hub>, TransportError> {
        self.hub.lock().map_err(|_| TransportError::Closed)
    }
}

impl Transport for LocalTransport {
    fn listen(&self, address: SocketAddr) -> Result<Socket, TransportError> {
        let mut hub = self.lock()?;
        if hub.endpoints.contains_key(&address) {
            return Err(TransportError::AddressInUse { address });
        }
        Ok(hub.open(&self.hub, address))
    }

    fn connect(&self, _server: SocketAddr) -> Result<Socket, TransportError> {
        let mut hub = self.lock()?;
        let address = hub.ephemeral_address();
        Ok(hub.open(&self.hub, address))
    }
}

struct LocalSender {
    hub: Arc<Mutex<Hub>>,
    address: SocketAddr,
}

impl PacketSender for LocalSender {
    fn send(&self, address: &SocketAddr, payload: &[u8]) -> Result<(), TransportError> {
        let hub = self.hub.lock().map_err(|_| TransportError::Closed)?;
        // a wildcard socket answers from the host it was reached on
        let source = if self.address.ip().is_unspecified() {
            SocketAddr::new(address.ip(), self.address.port())
        } else {
            self.address
        };
        match hub.route(address) {
            Some(endpoint) => {
                // a receiver that went away is the same as an unreachable host
                let _ = endpoint.try_send((source, payload.into()));
            }
            None => trace!("dropping packet from {} to unbound {}", self.address, address),
        }
        Ok(())
    }

    fn local_addr(&self) -> SocketAddr {
        self.address
    }
}

struct LocalReceiver {
    hub: Arc<Mutex<Hub>>,
    address: SocketAddr,
    receiver: Receiver<Datagram>,
    current_payload: Option<Box<[u8]>>,
}

impl PacketReceiver for LocalReceiver {
    fn receive(&mut self) -> Result<Option<(SocketAddr, &[u8])>, TransportError> {
        match self.receiver.try_recv() {
            Ok((address, payload)) => {
                let payload = self.current_payload.insert(payload);
                Ok(Some((address, &payload[..])))
            }
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Closed) => Err(TransportError::Closed),
        }
    }
}

impl Drop for LocalReceiver {
    fn drop(&mut self) {
        if let Ok(mut hub) = self.hub.lock() {
            hub.endpoints.remove(&self.address);
        }
    }
}
