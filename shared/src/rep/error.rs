use thiserror::Error;

use dawn_serde::SerdeErr;

use crate::{rep::RpcDirection, EntityId, NetRole};

/// Errors that can occur while reading or writing replicated state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepError {
    /// The buffer was truncated or held a value the layout can't accept
    #[error("Malformed replication data: {0}")]
    Malformed(#[from] SerdeErr),

    /// The entity lacks a component the layout describes
    #[error("Entity is missing replicated component {component}")]
    MissingComponent { component: &'static str },

    /// The sender built its layout from different components or fields
    #[error("Layout fingerprint {received:#018x} does not match local layout {local:#018x}")]
    LayoutMismatch { local: u64, received: u64 },

    /// An RPC index outside the layout's RPC table
    #[error("RPC index {index} is out of range for a layout with {count} RPCs")]
    UnknownRpcIndex { index: u64, count: usize },

    /// The encoded state can never fit in a single packet
    #[error("Replicated state of {bits} bits exceeds the {max_bits} bits a packet can carry")]
    StateTooLarge { bits: u32, max_bits: u32 },
}

/// Errors that can occur when calling an RPC
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    /// The entity's layout has no RPC with this name and argument type
    #[error("No RPC named {name} with these arguments on component {component}")]
    UnknownRpc {
        component: &'static str,
        name: &'static str,
    },

    /// The caller's role doesn't allow this RPC to be called
    #[error("{direction:?} RPC {name} cannot be called from role {role:?}")]
    NotPermitted {
        name: &'static str,
        direction: RpcDirection,
        role: Option<NetRole>,
    },

    /// No entity with this id exists
    #[error("Entity {entity} does not exist")]
    UnknownEntity { entity: EntityId },

    /// The call has to cross the wire but there is no live connection
    #[error("RPC {name} needs a connection but the net instance is not connected")]
    NotConnected { name: &'static str },

    /// Invoking the handler locally failed
    #[error("RPC invocation failed: {0}")]
    Rep(#[from] RepError),
}
