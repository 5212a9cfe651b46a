//! Routes operations to the backends of an entity's kind and mixins.
//!
//! Every operation holds the per-identifier lock for its whole duration
//! and works on a copy of the stored entity, so a failing handler leaves
//! the registry as it was.

use std::sync::Arc;

use tracing::{debug, error, info, instrument};

use crate::backend::{Backend, Extras};
use crate::category::{Action, Category, Mixin};
use crate::error::{OcciError, Result};
use crate::model::{Attributes, Entity};
use crate::registry::Registry;

/// Dispatches the six operations of the protocol layer.
pub struct Dispatcher {
    registry: Arc<Registry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Mixin backends in insertion order, then the kind backend.
    fn handlers(&self, entity: &Entity) -> Result<Vec<Arc<dyn Backend>>> {
        let mut handlers = Vec::with_capacity(entity.mixins().len() + 1);
        for mixin in entity.mixins() {
            handlers.push(self.registry.get_backend(&mixin.id)?);
        }
        handlers.push(self.registry.get_backend(&entity.kind().id)?);
        Ok(handlers)
    }

    /// Create an entity and register it. Returns the stored entity.
    #[instrument(skip(self, entity, extras), fields(entity_id = %entity.identifier, kind = %entity.kind().id))]
    pub async fn create(&self, mut entity: Entity, extras: &Extras) -> Result<Entity> {
        info!("Creating entity");
        let _guard = self.registry.lock_entity(&entity.identifier).await?;

        for handler in self.handlers(&entity)? {
            handler.create(&mut entity, extras).await?;
        }

        let requested = entity.identifier.clone();
        let key = self.registry.add_resource(&requested, entity)?;
        info!(key = %key, "Entity created");
        self.registry.get_resource(&key)
    }

    /// Refresh an entity from its kind backend.
    #[instrument(skip(self, extras), fields(entity_id = %id))]
    pub async fn retrieve(&self, id: &str, extras: &Extras) -> Result<Entity> {
        debug!("Retrieving entity");
        let _guard = self.registry.lock_entity(id).await?;
        let mut entity = self.registry.get_resource(id)?;

        let handler = self.registry.get_backend(&entity.kind().id)?;
        handler.retrieve(&mut entity, extras).await?;

        self.registry.update_resource(id, entity.clone())?;
        Ok(entity)
    }

    /// Apply a partial change. `new` carries the changed attributes and
    /// the mixins the entity should gain.
    #[instrument(skip(self, new, extras), fields(entity_id = %id))]
    pub async fn update(&self, id: &str, new: &Entity, extras: &Extras) -> Result<Entity> {
        info!("Updating entity");
        let _guard = self.registry.lock_entity(id).await?;
        let mut entity = self.registry.get_resource(id)?;
        let changes = self.single_mixin_delta(&entity, new)?;

        let handler = self.registry.get_backend(&entity.kind().id)?;
        handler.update(&mut entity, &changes, extras).await?;

        self.registry.update_resource(id, entity.clone())?;
        Ok(entity)
    }

    /// Apply a full replacement.
    #[instrument(skip(self, new, extras), fields(entity_id = %id))]
    pub async fn replace(&self, id: &str, new: &Entity, extras: &Extras) -> Result<Entity> {
        info!("Replacing entity");
        let _guard = self.registry.lock_entity(id).await?;
        let mut entity = self.registry.get_resource(id)?;
        let changes = self.single_mixin_delta(&entity, new)?;

        let handler = self.registry.get_backend(&entity.kind().id)?;
        handler.replace(&mut entity, &changes, extras).await?;

        self.registry.update_resource(id, entity.clone())?;
        Ok(entity)
    }

    /// Delete an entity. Mixin backends run first, then the kind backend.
    #[instrument(skip(self, extras), fields(entity_id = %id))]
    pub async fn delete(&self, id: &str, extras: &Extras) -> Result<()> {
        info!("Deleting entity");
        let _guard = self.registry.lock_entity(id).await?;
        let mut entity = self.registry.get_resource(id)?;

        for handler in self.handlers(&entity)? {
            handler.delete(&mut entity, extras).await?;
        }

        self.registry.remove_resource(id)?;
        info!("Entity deleted");
        Ok(())
    }

    /// Run an action on an entity.
    #[instrument(skip(self, action, params, extras), fields(entity_id = %id, action = %action.id))]
    pub async fn action(&self, id: &str, action: &Action, params: &Attributes, extras: &Extras) -> Result<Entity> {
        info!("Triggering action");
        let _guard = self.registry.lock_entity(id).await?;
        let mut entity = self.registry.get_resource(id)?;

        if !entity.declares(&action.id) {
            error!("Action is not declared by the entity's kind or mixins");
            return Err(OcciError::not_applicable(&action.id, id));
        }

        let handler = match self.registry.get_backend(&action.id) {
            Ok(handler) => handler,
            Err(OcciError::NotRegistered(_)) => self.registry.get_backend(&entity.kind().id)?,
            Err(e) => return Err(e),
        };
        handler.action(&mut entity, action, params, extras).await?;

        self.registry.update_resource(id, entity.clone())?;
        Ok(entity)
    }

    /// Strip mixins the entity already carries from `new`; at most one
    /// may remain.
    fn single_mixin_delta(&self, old: &Entity, new: &Entity) -> Result<Entity> {
        if new.kind() != old.kind() {
            error!(requested = %new.kind().id, "Kind cannot change");
            return Err(OcciError::BadRequest(format!(
                "kind of {} cannot change to {}",
                old.identifier,
                new.kind().id
            )));
        }

        let requested: Vec<&Mixin> = new.mixins().iter().filter(|m| !old.has_mixin(&m.id)).collect();
        if requested.len() > 1 {
            error!(count = requested.len(), "Several mixin changes in one request");
            return Err(OcciError::BadRequest(
                "only one mixin can be changed per request".to_string(),
            ));
        }

        // Backends only ever see the registered definition.
        let mut delta = Vec::with_capacity(requested.len());
        for mixin in requested {
            match self.registry.get_category(&mixin.id)? {
                Category::Mixin(registered) => delta.push(registered),
                other => {
                    error!(category = %other.id(), "Category is not a mixin");
                    return Err(OcciError::BadRequest(format!("{} is not a mixin", other.id())));
                }
            }
        }

        let mut changes = Entity::resource(old.identifier.clone(), old.kind().clone(), delta);
        changes.attributes = new.attributes.clone();
        Ok(changes)
    }
}
