mod game_mode;
mod game_session;

pub use game_mode::{GameMode, SessionContext};
pub use game_session::{GameSession, GameSessionInfo};
