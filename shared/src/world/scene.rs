use std::{collections::BTreeMap, mem};

use log::trace;

use crate::{
    world::{entity::Entity, error::RegistryError},
    EntityId, EntityType,
};

/// Per-tick logic run by `SceneManager::update`
pub trait System {
    fn update(&mut self, scene: &mut SceneManager, dt: f32);
}

/// Which half of the id space a registry allocates from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdSpace {
    /// Server or standalone registries, top bit clear
    Authoritative,
    /// Client registries, top bit set
    Local,
}

/// Owns every entity of a session and hands out their ids
pub struct SceneManager {
    entities: BTreeMap<EntityId, Entity>,
    next_index: u64,
    id_space: IdSpace,
    systems: Vec<Box<dyn System>>,
    last_dt: f32,
}

impl SceneManager {
    pub fn new() -> Self {
        Self::with_id_space(IdSpace::Authoritative)
    }

    pub fn with_id_space(id_space: IdSpace) -> Self {
        Self {
            entities: BTreeMap::new(),
            next_index: 1,
            id_space,
            systems: Vec::new(),
            last_dt: 0.0,
        }
    }

    pub fn id_space(&self) -> IdSpace {
        self.id_space
    }

    fn allocate_id(&mut self) -> EntityId {
        loop {
            let index = self.next_index & !EntityId::LOCAL_BIT;
            self.next_index = self.next_index.wrapping_add(1);
            let raw = match self.id_space {
                IdSpace::Authoritative => index,
                IdSpace::Local => index | EntityId::LOCAL_BIT,
            };
            let id = EntityId::from_raw(raw);
            if !self.entities.contains_key(&id) {
                return id;
            }
        }
    }

    pub fn create_entity(&mut self, entity_type: EntityType) -> EntityId {
        let id = self.allocate_id();
        self.entities.insert(id, Entity::new(id, entity_type));
        trace!("created entity {} of type {}", id, entity_type);
        id
    }

    /// Creates an entity under an id chosen elsewhere (the server's id for a
    /// replicated entity)
    pub fn create_entity_with_id(
        &mut self,
        id: EntityId,
        entity_type: EntityType,
    ) -> Result<EntityId, RegistryError> {
        if id.is_local() {
            return Err(RegistryError::LocalIdReserved { entity: id });
        }
        if self.entities.contains_key(&id) {
            return Err(RegistryError::IdInUse { entity: id });
        }
        self.entities.insert(id, Entity::new(id, entity_type));
        trace!("created entity {} of type {} with reserved id", id, entity_type);
        Ok(id)
    }

    /// Removes an entity. Children of the removed entity lose their parent.
    pub fn destroy_entity(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(&id)?;
        for child in self.entities.values_mut() {
            if child.parent() == Some(id) {
                child.set_parent(None);
            }
        }
        trace!("destroyed entity {}", id);
        Some(entity)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    pub fn component<C: 'static>(&self, id: EntityId) -> Option<&C> {
        self.entity(id)?.component::<C>()
    }

    pub fn component_mut<C: 'static>(&mut self, id: EntityId) -> Option<&mut C> {
        self.entity_mut(id)?.component_mut::<C>()
    }

    pub fn insert_component<C: 'static>(
        &mut self,
        id: EntityId,
        component: C,
    ) -> Result<Option<C>, RegistryError> {
        let entity = self
            .entity_mut(id)
            .ok_or(RegistryError::UnknownEntity { entity: id })?;
        Ok(entity.insert_component(component))
    }

    pub fn remove_component<C: 'static>(&mut self, id: EntityId) -> Option<C> {
        self.entity_mut(id)?.remove_component::<C>()
    }

    pub fn set_parent(
        &mut self,
        child: EntityId,
        parent: Option<EntityId>,
    ) -> Result<(), RegistryError> {
        if !self.contains(child) {
            return Err(RegistryError::UnknownEntity { entity: child });
        }
        if let Some(parent) = parent {
            if !self.contains(parent) {
                return Err(RegistryError::UnknownEntity { entity: parent });
            }
            let mut ancestor = Some(parent);
            while let Some(current) = ancestor {
                if current == child {
                    return Err(RegistryError::ParentCycle { child, parent });
                }
                ancestor = self.entity(current).and_then(|entity| entity.parent());
            }
        }
        if let Some(entity) = self.entity_mut(child) {
            entity.set_parent(parent);
        }
        Ok(())
    }

    pub fn children(&self, parent: EntityId) -> Vec<EntityId> {
        self.entities
            .values()
            .filter(|entity| entity.parent() == Some(parent))
            .map(|entity| entity.id())
            .collect()
    }

    pub fn add_system<S: System + 'static>(&mut self, system: S) {
        self.systems.push(Box::new(system));
    }

    /// Runs every system once, in the order they were added
    pub fn update(&mut self, dt: f32) {
        self.last_dt = dt;
        let mut systems = mem::take(&mut self.systems);
        for system in systems.iter_mut() {
            system.update(self, dt);
        }
        // keep systems that were added while running
        systems.append(&mut self.systems);
        self.systems = systems;
    }

    pub fn last_dt(&self) -> f32 {
        self.last_dt
    }
}

impl Default for SceneManager {
    fn default() -> Self {
        Self::new()
    }
}
