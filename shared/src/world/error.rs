use thiserror::Error;

use crate::EntityId;

/// Errors that can occur while manipulating the entity registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No entity with this id exists
    #[error("Entity {entity} does not exist")]
    UnknownEntity { entity: EntityId },

    /// An entity with this id already exists
    #[error("Entity id {entity} is already in use")]
    IdInUse { entity: EntityId },

    /// Replicated ids must come from the authoritative id space
    #[error("Entity id {entity} is in the client-local id space and cannot be reserved")]
    LocalIdReserved { entity: EntityId },

    /// Parenting would make an entity its own ancestor
    #[error("Making {parent} the parent of {child} would create a cycle")]
    ParentCycle { child: EntityId, parent: EntityId },
}
