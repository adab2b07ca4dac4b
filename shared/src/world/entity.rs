use std::{
    any::{Any, TypeId},
    collections::HashMap,
};

use crate::{EntityId, EntityType};

/// An entity and the components attached to it, at most one per type
pub struct Entity {
    id: EntityId,
    entity_type: EntityType,
    parent: Option<EntityId>,
    components: HashMap<TypeId, Box<dyn Any>>,
}

impl Entity {
    pub(crate) fn new(id: EntityId, entity_type: EntityType) -> Self {
        Self {
            id,
            entity_type,
            parent: None,
            components: HashMap::new(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<EntityId>) {
        self.parent = parent;
    }

    /// Attaches a component, returning the one it replaced
    pub fn insert_component<C: 'static>(&mut self, component: C) -> Option<C> {
        self.components
            .insert(TypeId::of::<C>(), Box::new(component))
            .and_then(|old| old.downcast::<C>().ok())
            .map(|old| *old)
    }

    pub fn remove_component<C: 'static>(&mut self) -> Option<C> {
        self.components
            .remove(&TypeId::of::<C>())
            .and_then(|old| old.downcast::<C>().ok())
            .map(|old| *old)
    }

    pub fn has_component<C: 'static>(&self) -> bool {
        self.components.contains_key(&TypeId::of::<C>())
    }

    pub fn component<C: 'static>(&self) -> Option<&C> {
        self.components
            .get(&TypeId::of::<C>())
            .and_then(|component| component.downcast_ref::<C>())
    }

    pub fn component_mut<C: 'static>(&mut self) -> Option<&mut C> {
        self.components
            .get_mut(&TypeId::of::<C>())
            .and_then(|component| component.downcast_mut::<C>())
    }

    /// Type-erased access, used by replication layouts
    pub fn component_any(&self, type_id: TypeId) -> Option<&dyn Any> {
        self.components.get(&type_id).map(|component| component.as_ref())
    }

    pub fn component_any_mut(&mut self, type_id: TypeId) -> Option<&mut dyn Any> {
        self.components
            .get_mut(&type_id)
            .map(|component| component.as_mut())
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }
}
