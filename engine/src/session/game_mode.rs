use dawn_shared::{NetMode, SceneManager};

use crate::{
    context::Context,
    events::{AsAny, Event, EventSystem},
    net::NetInstance,
};

/// What a game mode can reach while the session runs it
pub struct SessionContext<'a> {
    pub ctx: &'a Context,
    pub scene: &'a mut SceneManager,
    pub events: &'a mut EventSystem,
    pub net: Option<&'a mut NetInstance>,
}

impl SessionContext<'_> {
    pub fn net(&mut self) -> Option<&mut NetInstance> {
        self.net.as_deref_mut()
    }

    /// Mode of the session's net instance, `NetMode::None` for local sessions and
    /// once the instance has shut down
    pub fn net_mode(&self) -> NetMode {
        self.net.as_ref().map_or(NetMode::None, |net| net.net_mode())
    }
}

/// Rules of the game running in a session. Every hook defaults to doing
/// nothing.
pub trait GameMode: AsAny {
    /// Called when the session makes this the current mode
    fn on_start(&mut self, _session: &mut SessionContext<'_>) {}

    /// Called when the mode is replaced or the session shuts down
    fn on_end(&mut self, _session: &mut SessionContext<'_>) {}

    /// Called once per step after the network and the scene were updated
    fn update(&mut self, _session: &mut SessionContext<'_>, _dt: f32) {}

    /// Called for every event dispatched this step
    fn on_event(&mut self, _session: &mut SessionContext<'_>, _event: &dyn Event) {}
}
