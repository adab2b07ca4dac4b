mod entity;
mod error;
mod scene;

pub use entity::Entity;
pub use error::RegistryError;
pub use scene::{IdSpace, SceneManager, System};
