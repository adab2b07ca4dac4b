use log::{info, warn};

use crate::{context::Context, session::GameSession};

/// Fixed-timestep driver for one or more game sessions
pub struct Engine {
    ctx: Context,
    sessions: Vec<GameSession>,
    accumulator: f32,
    running: bool,
}

impl Engine {
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            sessions: Vec::new(),
            accumulator: 0.0,
            running: true,
        }
    }

    pub fn ctx(&self) -> &Context {
        &self.ctx
    }

    /// Adds a session and returns its index
    pub fn add_session(&mut self, session: GameSession) -> usize {
        self.sessions.push(session);
        self.sessions.len() - 1
    }

    pub fn session(&self, index: usize) -> Option<&GameSession> {
        self.sessions.get(index)
    }

    pub fn session_mut(&mut self, index: usize) -> Option<&mut GameSession> {
        self.sessions.get_mut(index)
    }

    pub fn sessions(&self) -> &[GameSession] {
        &self.sessions
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Adds `frame_time` seconds to the accumulator and runs as many fixed
    /// steps as fit, up to `max_steps_per_frame`. Returns the steps run.
    pub fn advance(&mut self, frame_time: f32) -> u32 {
        let dt = self.ctx.config().fixed_timestep;
        let max_steps = self.ctx.config().max_steps_per_frame;
        if !self.running || dt <= 0.0 {
            return 0;
        }

        self.accumulator += frame_time.max(0.0);
        let mut steps = 0;
        while self.accumulator >= dt && steps < max_steps {
            for session in self.sessions.iter_mut() {
                session.update(dt);
            }
            self.accumulator -= dt;
            steps += 1;

            if self.sessions.iter().any(GameSession::exit_requested) {
                info!("exit requested, stopping engine");
                self.running = false;
                break;
            }
        }

        if self.running && self.accumulator >= dt {
            warn!(
                "engine fell behind, dropping {:.3}s of simulation time",
                self.accumulator - self.accumulator % dt
            );
            self.accumulator %= dt;
        }
        steps
    }

    /// Shuts down every session and stops the engine
    pub fn shutdown(&mut self) {
        for session in self.sessions.iter_mut() {
            session.shutdown();
        }
        self.sessions.clear();
        self.running = false;
    }
}
