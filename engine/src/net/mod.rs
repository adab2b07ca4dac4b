use std::time::Duration;

use dawn_shared::SceneManager;

use crate::{config::NetConfig, events::EventSystem, transport::PacketSender};

mod client;
mod connection;
mod net_data;
mod net_game_mode;
mod net_instance;
mod net_transform;
mod pipeline;
mod replicator;
mod server;

pub use net_data::CNetData;
pub use net_game_mode::{NetGameMode, NetGameModeHooks};
pub use net_instance::NetInstance;
pub use net_transform::{CNetTransform, TransformIntegrator};
pub use pipeline::{EntitySpawner, NetEntityPipeline};

/// Lifecycle of a `NetInstance`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetState {
    /// Created, no socket opened yet
    Uninitialized,
    /// Bound and accepting clients
    Listening,
    /// Handshake with the server in progress
    Connecting,
    /// Accepted by the server
    Connected,
    /// Connection lost, refused or left
    Disconnected,
    /// Shut down, nothing more happens
    Closed,
}

/// Everything one side of the net instance needs while handling a frame
pub(crate) struct Tick<'a> {
    pub config: &'a NetConfig,
    pub now: Duration,
    pub sender: &'a dyn PacketSender,
    pub pipeline: Option<&'a dyn NetEntityPipeline>,
    pub scene: &'a mut SceneManager,
    pub events: &'a mut EventSystem,
}
