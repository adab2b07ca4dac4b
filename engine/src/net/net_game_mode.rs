use log::debug;

use dawn_shared::{ClientId, NetMode};

use crate::{
    events::{Event, JoinServerEvent, ServerClientConnectedEvent, ServerClientDisconnectedEvent},
    session::{GameMode, SessionContext},
};

/// Callbacks of a networked game mode. Every hook defaults to doing nothing.
pub trait NetGameModeHooks: 'static {
    /// The session started serving, either at mode start or later
    fn server_on_start(&mut self, _session: &mut SessionContext<'_>) {}

    /// The session stopped serving or the mode ended while serving
    fn server_on_end(&mut self, _session: &mut SessionContext<'_>) {}

    fn client_on_join_server(&mut self, _session: &mut SessionContext<'_>, _client: ClientId) {}

    fn server_on_client_connected(&mut self, _session: &mut SessionContext<'_>, _client: ClientId) {
    }

    fn server_on_client_disconnected(
        &mut self,
        _session: &mut SessionContext<'_>,
        _client: ClientId,
    ) {
    }

    fn update(&mut self, _session: &mut SessionContext<'_>, _dt: f32) {}
}

/// Game mode that turns net state changes and events into
/// [`NetGameModeHooks`] calls. `server_on_start` and `server_on_end` fire
/// exactly once per stretch of serving.
pub struct NetGameMode<H: NetGameModeHooks> {
    hooks: H,
    server_started: bool,
}

impl<H: NetGameModeHooks> NetGameMode<H> {
    pub fn new(hooks: H) -> Self {
        Self {
            hooks,
            server_started: false,
        }
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    /// True between `server_on_start` and `server_on_end`
    pub fn running_as_server(&self) -> bool {
        self.server_started
    }

    fn start_server(&mut self, session: &mut SessionContext<'_>) {
        debug!("net game mode: server started");
        self.server_started = true;
        self.hooks.server_on_start(session);
    }

    fn end_server(&mut self, session: &mut SessionContext<'_>) {
        debug!("net game mode: server ended");
        self.server_started = false;
        self.hooks.server_on_end(session);
    }
}

impl<H: NetGameModeHooks> GameMode for NetGameMode<H> {
    fn on_start(&mut self, session: &mut SessionContext<'_>) {
        if session.net_mode() == NetMode::Server {
            self.start_server(session);
        }
    }

    fn on_end(&mut self, session: &mut SessionContext<'_>) {
        if self.server_started {
            self.end_server(session);
        }
    }

    fn update(&mut self, session: &mut SessionContext<'_>, dt: f32) {
        let serving = session.net_mode() == NetMode::Server;
        if serving && !self.server_started {
            self.start_server(session);
        } else if !serving && self.server_started {
            self.end_server(session);
        }
        self.hooks.update(session, dt);
    }

    fn on_event(&mut self, session: &mut SessionContext<'_>, event: &dyn Event) {
        if let Some(event) = event.downcast_ref::<JoinServerEvent>() {
            self.hooks.client_on_join_server(session, event.client);
        } else if let Some(event) = event.downcast_ref::<ServerClientConnectedEvent>() {
            self.hooks.server_on_client_connected(session, event.client);
        } else if let Some(event) = event.downcast_ref::<ServerClientDisconnectedEvent>() {
            self.hooks.server_on_client_disconnected(session, event.client);
        }
    }
}
