use std::sync::Arc;

use dawn_shared::{ClientId, EntityType, NetRole, RepLayout};

/// Marks an entity as networked and holds what replication needs to know
/// about it
#[derive(Debug, Clone)]
pub struct CNetData {
    entity_type: EntityType,
    layout: Arc<RepLayout>,
    role: NetRole,
    owner: Option<ClientId>,
}

impl CNetData {
    pub fn new(entity_type: EntityType, layout: Arc<RepLayout>, role: NetRole) -> Self {
        Self {
            entity_type,
            layout,
            role,
            owner: None,
        }
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn layout(&self) -> &Arc<RepLayout> {
        &self.layout
    }

    pub fn role(&self) -> NetRole {
        self.role
    }

    pub(crate) fn set_role(&mut self, role: NetRole) {
        self.role = role;
    }

    /// On the server, the client that owns the entity. On a client, this
    /// client's id if it owns the entity.
    pub fn owner(&self) -> Option<ClientId> {
        self.owner
    }

    pub(crate) fn set_owner(&mut self, owner: Option<ClientId>) {
        self.owner = owner;
    }

    pub fn has_authority(&self) -> bool {
        self.role >= NetRole::Authority
    }
}
