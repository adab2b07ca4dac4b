use std::sync::Arc;

use dawn_engine::{
    net::{NetGameMode, NetInstance},
    session::{GameSession, GameSessionInfo},
    transport::LocalTransport,
    Context, EngineConfig,
};

use crate::{hooks::RecordingHooks, shooter::ShooterPipeline};

pub const SERVER_PORT: u16 = 9000;

type ShooterMode = NetGameMode<RecordingHooks>;

/// Context whose sockets all live on one in-process hub
pub fn local_context(config: EngineConfig) -> Context {
    Context::new(config, Arc::new(LocalTransport::new()))
}

/// A server session on `0.0.0.0:9000` and any number of client sessions
/// joining it through `127.0.0.1:9000`, all stepped by hand
pub struct TestNetwork {
    ctx: Context,
    pub server: GameSession,
    pub clients: Vec<GameSession>,
    paused: Vec<bool>,
}

impl TestNetwork {
    pub fn new(max_clients: u16, hooks: RecordingHooks) -> Self {
        Self::with_config(EngineConfig::default(), max_clients, hooks)
    }

    pub fn with_config(config: EngineConfig, max_clients: u16, hooks: RecordingHooks) -> Self {
        let ctx = local_context(config);
        let mut server = GameSession::new(
            ctx.clone(),
            GameSessionInfo::CreateNetGame {
                host: "0.0.0.0".to_string(),
                port: SERVER_PORT,
                max_clients,
            },
        )
        .expect("server session");
        server
            .net_mut()
            .expect("server net instance")
            .set_entity_pipeline(ShooterPipeline::new());
        server.set_game_mode(NetGameMode::new(hooks));

        Self {
            ctx,
            server,
            clients: Vec::new(),
            paused: Vec::new(),
        }
    }

    /// Starts a client session joining the server and returns its index
    pub fn add_client(&mut self) -> usize {
        let mut client = GameSession::new(
            self.ctx.clone(),
            GameSessionInfo::JoinNetGame {
                host: "127.0.0.1".to_string(),
                port: SERVER_PORT,
            },
        )
        .expect("client session");
        client
            .net_mut()
            .expect("client net instance")
            .set_entity_pipeline(ShooterPipeline::new());
        client.set_game_mode(NetGameMode::new(RecordingHooks::default()));
        self.clients.push(client);
        self.paused.push(false);
        self.clients.len() - 1
    }

    pub fn dt(&self) -> f32 {
        self.ctx.config().fixed_timestep
    }

    /// Stops stepping a client, as if its process hung
    pub fn pause_client(&mut self, index: usize) {
        self.paused[index] = true;
    }

    /// Steps the server, then every client that isn't paused
    pub fn step(&mut self) {
        let dt = self.dt();
        self.server.update(dt);
        for (client, paused) in self.clients.iter_mut().zip(&self.paused) {
            if !paused {
                client.update(dt);
            }
        }
    }

    pub fn step_n(&mut self, steps: usize) {
        for _ in 0..steps {
            self.step();
        }
    }

    /// Steps until `done` holds, at most `max_steps` times. Returns whether
    /// it held.
    pub fn step_until(&mut self, max_steps: usize, done: impl Fn(&TestNetwork) -> bool) -> bool {
        for _ in 0..max_steps {
            if done(self) {
                return true;
            }
            self.step();
        }
        done(self)
    }

    pub fn server_net(&self) -> &NetInstance {
        self.server.net().expect("server net instance")
    }

    pub fn client_net(&self, index: usize) -> &NetInstance {
        self.clients[index].net().expect("client net instance")
    }

    pub fn server_mode(&self) -> &ShooterMode {
        self.server
            .game_mode_as::<ShooterMode>()
            .expect("server game mode")
    }

    pub fn client_mode(&self, index: usize) -> &ShooterMode {
        self.clients[index]
            .game_mode_as::<ShooterMode>()
            .expect("client game mode")
    }

    pub fn server_hooks(&self) -> &RecordingHooks {
        self.server_mode().hooks()
    }

    pub fn client_hooks(&self, index: usize) -> &RecordingHooks {
        self.client_mode(index).hooks()
    }

    /// Steps until every client is connected and the server has seen it
    pub fn connect_all(&mut self) -> bool {
        self.step_until(120, |network| {
            network.server_net().client_count() == network.clients.len()
                && (0..network.clients.len()).all(|index| {
                    network.client_net(index).local_client().is_some()
                        && !network.client_hooks(index).calls.is_empty()
                })
        })
    }
}
