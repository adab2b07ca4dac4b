use dawn_engine::{net::NetGameModeHooks, session::SessionContext};
use dawn_shared::ClientId;

use crate::shooter::SHIP;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookCall {
    ServerStart,
    ServerEnd,
    JoinServer(ClientId),
    ClientConnected(ClientId),
    ClientDisconnected(ClientId),
}

/// Hooks that write down every call, optionally spawning a ship for each
/// client that connects
#[derive(Debug, Default)]
pub struct RecordingHooks {
    pub calls: Vec<HookCall>,
    pub spawn_ship_per_client: bool,
    pub updates: u32,
}

impl RecordingHooks {
    pub fn spawning_ships() -> Self {
        Self {
            spawn_ship_per_client: true,
            ..Self::default()
        }
    }

    pub fn count(&self, call: HookCall) -> usize {
        self.calls.iter().filter(|recorded| **recorded == call).count()
    }

    pub fn count_matching(&self, filter: impl Fn(&HookCall) -> bool) -> usize {
        self.calls.iter().filter(|recorded| filter(recorded)).count()
    }
}

impl NetGameModeHooks for RecordingHooks {
    fn server_on_start(&mut self, _session: &mut SessionContext<'_>) {
        self.calls.push(HookCall::ServerStart);
    }

    fn server_on_end(&mut self, _session: &mut SessionContext<'_>) {
        self.calls.push(HookCall::ServerEnd);
    }

    fn client_on_join_server(&mut self, _session: &mut SessionContext<'_>, client: ClientId) {
        self.calls.push(HookCall::JoinServer(client));
    }

    fn server_on_client_connected(&mut self, session: &mut SessionContext<'_>, client: ClientId) {
        self.calls.push(HookCall::ClientConnected(client));
        if !self.spawn_ship_per_client {
            return;
        }
        if let Some(net) = session.net.as_deref_mut() {
            net.spawn_entity(session.scene, SHIP, Some(client))
                .expect("ship spawn failed");
        }
    }

    fn server_on_client_disconnected(
        &mut self,
        _session: &mut SessionContext<'_>,
        client: ClientId,
    ) {
        self.calls.push(HookCall::ClientDisconnected(client));
    }

    fn update(&mut self, _session: &mut SessionContext<'_>, _dt: f32) {
        self.updates += 1;
    }
}
