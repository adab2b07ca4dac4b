mod error;
mod layout;
mod property;
mod rpc;

pub use error::{RepError, RpcError};
pub use layout::{RepLayout, RepSnapshot, Replicate, ReplicateSet};
pub use property::{ComponentKind, RepProperty};
pub use rpc::{Rpc, RpcDirection, RpcProperty};
