//! # Dawn Shared
//! Entity registry, replication layouts, roles and wire messages shared by
//! both halves of a Dawn net session.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub use dawn_serde::{
    BitCounter, BitReader, BitWrite, BitWriter, Serde, SerdeErr, SignedInteger,
    SignedVariableInteger, UnsignedInteger, UnsignedVariableInteger, MTU_SIZE_BITS,
    MTU_SIZE_BYTES,
};

pub mod math;
pub mod messages;

mod net_role;
mod rep;
mod types;
mod world;
mod wrapping_number;

pub use net_role::{assign_role, EntityOrigin, NetMode, NetRole};
pub use rep::{
    ComponentKind, RepError, RepLayout, RepProperty, RepSnapshot, Replicate, ReplicateSet, Rpc,
    RpcDirection, RpcError, RpcProperty,
};
pub use types::{ClientId, EntityId, EntityType};
pub use world::{Entity, IdSpace, RegistryError, SceneManager, System};
pub use wrapping_number::{sequence_greater_than, sequence_less_than, wrapping_diff};
