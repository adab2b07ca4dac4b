use std::{default::Default, time::Duration};

/// Settings for the engine loop
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Length of one simulation step, in seconds
    pub fixed_timestep: f32,
    /// Upper bound on steps run by a single `Engine::advance`; time beyond
    /// it is dropped rather than caught up
    pub max_steps_per_frame: u32,
    pub net: NetConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fixed_timestep: 1.0 / 60.0,
            max_steps_per_frame: 5,
            net: NetConfig::default(),
        }
    }
}

/// Settings for a `NetInstance`, on either side of a session
#[derive(Clone, Debug)]
pub struct NetConfig {
    /// Packets carrying a different id are dropped
    pub protocol_id: u32,
    /// Send a heartbeat when nothing else was sent for this long
    pub heartbeat_interval: Duration,
    /// Drop a peer we haven't heard from for this long
    pub disconnection_timeout: Duration,
    /// Time between connect requests while connecting
    pub connect_retry_interval: Duration,
    /// Give up connecting after this long
    pub connect_timeout: Duration,
    /// Time before an unacknowledged spawn, update or destroy is sent again
    pub resend_interval: Duration,
    /// Largest datagram written
    pub max_packet_bytes: usize,
    /// Protocol errors a peer may cause before it is disconnected
    pub max_protocol_errors: u32,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            protocol_id: 0xDA57_0001,
            heartbeat_interval: Duration::from_millis(500),
            disconnection_timeout: Duration::from_secs(10),
            connect_retry_interval: Duration::from_millis(250),
            connect_timeout: Duration::from_secs(5),
            resend_interval: Duration::from_millis(200),
            max_packet_bytes: dawn_shared::MTU_SIZE_BYTES,
            max_protocol_errors: 16,
        }
    }
}
