use log::debug;

use dawn_shared::{EntityId, EntityType, NetRole, SceneManager};

use crate::{error::PipelineError, net::CNetData};

/// Builds the local representation of a networked entity type.
///
/// Both the server (when spawning) and clients (when a spawn arrives) go
/// through the same pipeline, so an implementation decides per `role` which
/// components an entity gets on each side.
pub trait NetEntityPipeline {
    fn create_entity_from_type(
        &self,
        spawner: &mut EntitySpawner<'_>,
        entity_type: EntityType,
        role: NetRole,
    ) -> Result<EntityId, PipelineError>;
}

/// Registry access handed to a pipeline. Entities created through a spawner
/// are removed again if the pipeline call fails.
pub struct EntitySpawner<'s> {
    scene: &'s mut SceneManager,
    reserved: Option<EntityId>,
    created: Vec<EntityId>,
}

impl<'s> EntitySpawner<'s> {
    pub(crate) fn new(scene: &'s mut SceneManager, reserved: Option<EntityId>) -> Self {
        Self {
            scene,
            reserved,
            created: Vec::new(),
        }
    }

    /// Creates an entity. The first entity created takes the reserved id,
    /// if there is one.
    pub fn create_entity(&mut self, entity_type: EntityType) -> Result<EntityId, PipelineError> {
        let id = match self.reserved.take() {
            Some(id) => self.scene.create_entity_with_id(id, entity_type)?,
            None => self.scene.create_entity(entity_type),
        };
        self.created.push(id);
        Ok(id)
    }

    pub fn insert_component<C: 'static>(
        &mut self,
        id: EntityId,
        component: C,
    ) -> Result<(), PipelineError> {
        self.scene.insert_component(id, component)?;
        Ok(())
    }

    pub fn scene(&mut self) -> &mut SceneManager {
        self.scene
    }

    fn rollback(self) {
        for id in self.created {
            self.scene.destroy_entity(id);
        }
    }
}

/// Runs a pipeline and checks the result is a networked entity. Nothing the
/// pipeline created survives a failure.
pub(crate) fn build_entity(
    pipeline: Option<&dyn NetEntityPipeline>,
    scene: &mut SceneManager,
    reserved: Option<EntityId>,
    entity_type: EntityType,
    role: NetRole,
) -> Result<EntityId, PipelineError> {
    let Some(pipeline) = pipeline else {
        return Err(PipelineError::NoPipeline { entity_type });
    };

    let mut spawner = EntitySpawner::new(scene, reserved);
    let result = pipeline
        .create_entity_from_type(&mut spawner, entity_type, role)
        .and_then(|id| {
            if spawner.scene.component::<CNetData>(id).is_some() {
                Ok(id)
            } else {
                Err(PipelineError::MissingNetData { entity_type })
            }
        });

    match result {
        Ok(id) => Ok(id),
        Err(error) => {
            debug!("pipeline failed for type {}: {}", entity_type, error);
            spawner.rollback();
            Err(error)
        }
    }
}
