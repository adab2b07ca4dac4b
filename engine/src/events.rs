use std::{any::Any, fmt, mem, rc::Rc};

use dawn_shared::{messages::RejectReason, ClientId};

use crate::error::TransportError;

pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Something that happened during a tick, delivered to the game mode at the
/// start of the next one
pub trait Event: AsAny + fmt::Debug + 'static {}

impl dyn Event {
    pub fn is<E: Event>(&self) -> bool {
        self.as_any().is::<E>()
    }

    pub fn downcast_ref<E: Event>(&self) -> Option<&E> {
        self.as_any().downcast_ref::<E>()
    }
}

/// Queues events raised during a tick and hands them out as a batch.
///
/// Events pushed during tick N are dispatched at the start of tick N+1 and
/// stay readable through `dispatched` until the following flip.
pub struct EventSystem {
    pending: Vec<Box<dyn Event>>,
    dispatched: Rc<[Box<dyn Event>]>,
}

impl EventSystem {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            dispatched: Rc::from(Vec::new()),
        }
    }

    pub fn push<E: Event>(&mut self, event: E) {
        self.pending.push(Box::new(event));
    }

    /// Makes the pending events the dispatched batch and returns it
    pub fn flip(&mut self) -> Rc<[Box<dyn Event>]> {
        let pending = mem::take(&mut self.pending);
        self.dispatched = Rc::from(pending);
        self.dispatched.clone()
    }

    pub fn dispatched<E: Event>(&self) -> impl Iterator<Item = &E> {
        self.dispatched
            .iter()
            .filter_map(|event| event.downcast_ref::<E>())
    }

    pub fn has_dispatched<E: Event>(&self) -> bool {
        self.dispatched.iter().any(|event| event.is::<E>())
    }

    pub fn pending<E: Event>(&self) -> impl Iterator<Item = &E> {
        self.pending
            .iter()
            .filter_map(|event| event.downcast_ref::<E>())
    }

    pub fn has_pending<E: Event>(&self) -> bool {
        self.pending.iter().any(|event| event.is::<E>())
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

impl Default for EventSystem {
    fn default() -> Self {
        Self::new()
    }
}

// JoinServerEvent
/// The local client was accepted by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinServerEvent {
    pub client: ClientId,
}
impl Event for JoinServerEvent {}

/// Why a connection attempt ended without joining
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectFailure {
    Rejected(RejectReason),
    TimedOut,
    Transport(TransportError),
}

// ConnectionFailedEvent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionFailedEvent {
    pub reason: ConnectFailure,
}
impl Event for ConnectionFailedEvent {}

// DisconnectedFromServerEvent
/// The local client lost its server, by notice or timeout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectedFromServerEvent;
impl Event for DisconnectedFromServerEvent {}

// ServerClientConnectedEvent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerClientConnectedEvent {
    pub client: ClientId,
}
impl Event for ServerClientConnectedEvent {}

// ServerClientDisconnectedEvent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerClientDisconnectedEvent {
    pub client: ClientId,
}
impl Event for ServerClientDisconnectedEvent {}

// ExitEvent
/// Asks the engine to stop after the current step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitEvent;
impl Event for ExitEvent {}
