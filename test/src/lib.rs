//! Shared fixtures for the end-to-end tests: a small space shooter built on
//! the engine, recording game mode hooks and an in-process network.

mod hooks;
mod network;

pub use hooks::{HookCall, RecordingHooks};
pub use network::{local_context, TestNetwork, SERVER_PORT};
pub use shooter::{
    CProjectile, CShipControls, CWeapon, ShooterPipeline, FIRE_AT, NOTIFY_HIT, PROJECTILE,
    SET_ANGULAR_VELOCITY, SET_LINEAR_VELOCITY, SHIP, TOGGLE_WEAPON,
};
