//! # Dawn Engine
//! Game sessions, the fixed-timestep engine loop and the net instance that
//! replicates a session's entities between a server and its clients.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

#[macro_use]
extern crate cfg_if;

pub mod events;
pub mod net;
pub mod session;
pub mod transport;

mod config;
mod context;
mod engine;
mod error;

pub use config::{EngineConfig, NetConfig};
pub use context::Context;
pub use engine::Engine;
pub use error::{NetError, PipelineError, ProtocolError, TransportError};

pub mod shared {
    pub use dawn_shared::{
        assign_role, ClientId, EntityId, EntityType, NetMode, NetRole, RepLayout, Replicate, Rpc,
        RpcDirection, RpcError, SceneManager,
    };
}
