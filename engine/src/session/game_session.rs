use log::{debug, info};

use dawn_shared::{IdSpace, SceneManager};

use crate::{
    context::Context,
    error::NetError,
    events::{EventSystem, ExitEvent},
    net::{NetInstance, TransformIntegrator},
    session::{GameMode, SessionContext},
};

/// How a session takes part in the network
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameSessionInfo {
    /// No networking
    Local,
    /// Host a game and accept up to `max_clients` clients
    CreateNetGame {
        host: String,
        port: u16,
        max_clients: u16,
    },
    /// Join a game hosted elsewhere
    JoinNetGame { host: String, port: u16 },
}

fn session_context<'a>(
    ctx: &'a Context,
    scene: &'a mut SceneManager,
    events: &'a mut EventSystem,
    net: &'a mut Option<NetInstance>,
) -> SessionContext<'a> {
    SessionContext {
        ctx,
        scene,
        events,
        net: net.as_mut(),
    }
}

/// A running game: the scene, its events, an optional net instance and the
/// game mode driving them
pub struct GameSession {
    ctx: Context,
    events: EventSystem,
    scene: SceneManager,
    net: Option<NetInstance>,
    game_mode: Option<Box<dyn GameMode>>,
    new_game_mode: Option<Box<dyn GameMode>>,
}

impl GameSession {
    pub fn new(ctx: Context, info: GameSessionInfo) -> Result<Self, NetError> {
        let (mut scene, net) = match &info {
            GameSessionInfo::Local => (SceneManager::new(), None),
            GameSessionInfo::CreateNetGame {
                host,
                port,
                max_clients,
            } => (
                SceneManager::new(),
                Some(NetInstance::listen(&ctx, host, *port, *max_clients)?),
            ),
            GameSessionInfo::JoinNetGame { host, port } => (
                SceneManager::with_id_space(IdSpace::Local),
                Some(NetInstance::connect(&ctx, host, *port)?),
            ),
        };
        info!("starting session: {:?}", info);

        scene.add_system(TransformIntegrator);
        Ok(Self {
            ctx,
            events: EventSystem::new(),
            scene,
            net,
            game_mode: None,
            new_game_mode: None,
        })
    }

    /// Replaces the game mode at the start of the next update
    pub fn set_game_mode<M: GameMode + 'static>(&mut self, game_mode: M) {
        self.new_game_mode = Some(Box::new(game_mode));
    }

    /// Runs one step: mode swap, event dispatch, network, scene systems and
    /// finally the game mode
    pub fn update(&mut self, dt: f32) {
        if let Some(mut next) = self.new_game_mode.take() {
            let mut session =
                session_context(&self.ctx, &mut self.scene, &mut self.events, &mut self.net);
            if let Some(mut previous) = self.game_mode.take() {
                previous.on_end(&mut session);
            }
            debug!("starting new game mode");
            next.on_start(&mut session);
            self.game_mode = Some(next);
        }

        let dispatched = self.events.flip();
        if let Some(game_mode) = self.game_mode.as_deref_mut() {
            let mut session =
                session_context(&self.ctx, &mut self.scene, &mut self.events, &mut self.net);
            for event in dispatched.iter() {
                game_mode.on_event(&mut session, &**event);
            }
        }

        if let Some(net) = self.net.as_mut() {
            net.update(dt, &mut self.scene, &mut self.events);
        }
        self.scene.update(dt);

        if let Some(game_mode) = self.game_mode.as_deref_mut() {
            let mut session =
                session_context(&self.ctx, &mut self.scene, &mut self.events, &mut self.net);
            game_mode.update(&mut session, dt);
        }
    }

    pub fn ctx(&self) -> &Context {
        &self.ctx
    }

    pub fn scene(&self) -> &SceneManager {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneManager {
        &mut self.scene
    }

    pub fn events(&self) -> &EventSystem {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventSystem {
        &mut self.events
    }

    pub fn net(&self) -> Option<&NetInstance> {
        self.net.as_ref()
    }

    pub fn net_mut(&mut self) -> Option<&mut NetInstance> {
        self.net.as_mut()
    }

    /// Borrows the scene and the net instance together, for spawning
    pub fn scene_and_net(&mut self) -> (&mut SceneManager, Option<&mut NetInstance>) {
        (&mut self.scene, self.net.as_mut())
    }

    /// The current game mode, if it is an `M`
    pub fn game_mode_as<M: GameMode + 'static>(&self) -> Option<&M> {
        self.game_mode
            .as_deref()
            .and_then(|game_mode| game_mode.as_any().downcast_ref::<M>())
    }

    pub fn game_mode_as_mut<M: GameMode + 'static>(&mut self) -> Option<&mut M> {
        self.game_mode
            .as_deref_mut()
            .and_then(|game_mode| game_mode.as_any_mut().downcast_mut::<M>())
    }

    /// True if an `ExitEvent` was raised
    pub fn exit_requested(&self) -> bool {
        self.events.has_pending::<ExitEvent>() || self.events.has_dispatched::<ExitEvent>()
    }

    /// Ends the game mode and closes the net instance
    pub fn shutdown(&mut self) {
        self.new_game_mode = None;
        if let Some(mut game_mode) = self.game_mode.take() {
            let mut session =
                session_context(&self.ctx, &mut self.scene, &mut self.events, &mut self.net);
            game_mode.on_end(&mut session);
        }
        if let Some(net) = self.net.as_mut() {
            net.close();
        }
        info!("session shut down");
    }
}
