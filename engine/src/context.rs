use std::sync::Arc;

use crate::{config::EngineConfig, transport::Transport};

/// Engine-wide services, passed explicitly to everything that needs them
#[derive(Clone)]
pub struct Context {
    config: EngineConfig,
    transport: Arc<dyn Transport>,
}

impl Context {
    pub fn new(config: EngineConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut EngineConfig {
        &mut self.config
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }
}

cfg_if! {
    if #[cfg(feature = "transport_udp")] {
        fn default_transport() -> Arc<dyn Transport> {
            Arc::new(crate::transport::UdpTransport)
        }
    } else {
        fn default_transport() -> Arc<dyn Transport> {
            Arc::new(crate::transport::LocalTransport::new())
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(EngineConfig::default(), default_transport())
    }
}
