use std::{io, net::SocketAddr};

use thiserror::Error;

use dawn_shared::{messages::MessageError, EntityId, EntityType, NetRole, RegistryError, RepError};

use crate::net::NetState;

/// Errors that can occur while opening or using a transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The host and port didn't resolve to a socket address
    #[error("Could not resolve {host}:{port} to a socket address")]
    InvalidAddress { host: String, port: u16 },

    /// Something is already bound to the address
    #[error("Address {address} is already in use")]
    AddressInUse { address: SocketAddr },

    /// The operating system rejected a socket operation
    #[error("Socket {operation} failed: {kind:?}")]
    Io {
        operation: &'static str,
        kind: io::ErrorKind,
    },

    /// The other end of an in-process channel is gone
    #[error("Transport channel is closed")]
    Closed,
}

impl TransportError {
    pub(crate) fn io(operation: &'static str, error: io::Error) -> Self {
        TransportError::Io {
            operation,
            kind: error.kind(),
        }
    }
}

/// Errors that can occur while building an entity through a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// The pipeline doesn't know how to build this type
    #[error("Unknown entity type {entity_type}")]
    UnknownEntityType { entity_type: EntityType },

    /// The net instance has no pipeline to build entities with
    #[error("No entity pipeline is set, cannot build entity type {entity_type}")]
    NoPipeline { entity_type: EntityType },

    /// The pipeline built an entity without `CNetData`
    #[error("Pipeline built entity type {entity_type} without net data")]
    MissingNetData { entity_type: EntityType },

    /// The registry refused an operation
    #[error("Registry error while building entity: {0}")]
    Registry(#[from] RegistryError),
}

/// Errors surfaced by `NetInstance`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetError {
    /// Opening or using the socket failed
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Building an entity failed
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Reading or writing replicated state failed
    #[error("Replication error: {0}")]
    Rep(#[from] RepError),

    /// A packet could not be read
    #[error("Message error: {0}")]
    Message(#[from] MessageError),

    /// The operation isn't available in the instance's current state
    #[error("Cannot {operation} while the net instance is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: NetState,
    },
}

/// A message from a peer that was dropped. Each one counts against the
/// peer's protocol error budget.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The packet could not be read
    #[error("{0}")]
    Message(#[from] MessageError),

    /// Replicated state or RPC arguments could not be applied
    #[error("{0}")]
    Rep(#[from] RepError),

    /// The entity type could not be built
    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    /// The message names an entity that is not replicated here
    #[error("Entity {entity} is not a replicated entity")]
    UnknownEntity { entity: EntityId },

    /// The sender may not call this RPC on this entity
    #[error("RPC {index} on entity {entity} is not permitted for this sender")]
    RpcNotPermitted { entity: EntityId, index: u16 },

    /// A spawn with a client-local id or a non-proxy role
    #[error("Invalid spawn of {entity} with role {role:?}")]
    InvalidSpawn { entity: EntityId, role: NetRole },
}
