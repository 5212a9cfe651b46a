//! Backend trait and the per-request context handed to it.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::error;

use occi_nova::{ComputeApi, ImageService, NetworkApi, NovaContext};

use crate::category::Action;
use crate::error::{OcciError, Result};
use crate::infrastructure::CORE_ID;
use crate::model::{Attributes, Entity};
use crate::registry::Registry;

/// Collaborators passed through to every backend call.
///
/// The dispatcher never looks inside.
#[derive(Clone)]
pub struct Extras {
    pub nova_ctx: NovaContext,
    pub compute: Arc<dyn ComputeApi>,
    pub network: Arc<dyn NetworkApi>,
    pub image: Arc<dyn ImageService>,
    pub registry: Arc<Registry>,
}

impl Extras {
    pub fn new(
        nova_ctx: NovaContext,
        registry: Arc<Registry>,
        compute: Arc<dyn ComputeApi>,
        network: Arc<dyn NetworkApi>,
        image: Arc<dyn ImageService>,
    ) -> Self {
        Self {
            nova_ctx,
            compute,
            network,
            image,
            registry,
        }
    }

    /// Use one object for all three services.
    pub fn from_cloud<C>(nova_ctx: NovaContext, registry: Arc<Registry>, cloud: Arc<C>) -> Self
    where
        C: ComputeApi + NetworkApi + ImageService + 'static,
    {
        let compute: Arc<dyn ComputeApi> = cloud.clone();
        let network: Arc<dyn NetworkApi> = cloud.clone();
        let image: Arc<dyn ImageService> = cloud;
        Self::new(nova_ctx, registry, compute, network, image)
    }
}

/// Handler for one kind, mixin or action.
///
/// Every operation defaults to a no-op except `action`, which rejects
/// anything it is not taught to run.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Set defaults and initial state on a new entity.
    async fn create(&self, _entity: &mut Entity, _extras: &Extras) -> Result<()> {
        Ok(())
    }

    /// Refresh state and legal actions.
    async fn retrieve(&self, _entity: &mut Entity, _extras: &Extras) -> Result<()> {
        Ok(())
    }

    /// Apply a partial change. Kinds without their own update accept no
    /// mixin changes.
    async fn update(&self, old: &mut Entity, new: &Entity, _extras: &Extras) -> Result<()> {
        reject_mixin_change(old, new)?;
        merge_attributes(old, new)
    }

    /// Apply a full replacement.
    async fn replace(&self, old: &mut Entity, new: &Entity, _extras: &Extras) -> Result<()> {
        reject_mixin_change(old, new)?;
        reject_read_only(new)?;
        let keep: Attributes = old
            .attributes
            .iter()
            .filter(|(k, _)| is_read_only(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        old.attributes = new.attributes.clone();
        old.attributes.extend(keep);
        Ok(())
    }

    /// Tear down an entity and anything linking to it.
    async fn delete(&self, _entity: &mut Entity, _extras: &Extras) -> Result<()> {
        Ok(())
    }

    /// Run an action.
    async fn action(
        &self,
        entity: &mut Entity,
        action: &Action,
        _params: &Attributes,
        _extras: &Extras,
    ) -> Result<()> {
        Err(OcciError::not_applicable(&action.id, &entity.identifier))
    }
}

/// Identifier and state attributes are owned by the backends.
pub(crate) fn is_read_only(key: &str) -> bool {
    key == CORE_ID || key.ends_with(".state")
}

pub(crate) fn reject_read_only(new: &Entity) -> Result<()> {
    match new.attributes.keys().find(|k| is_read_only(k)) {
        Some(key) => Err(OcciError::BadRequest(format!("attribute {} is read-only", key))),
        None => Ok(()),
    }
}

pub(crate) fn reject_mixin_change(old: &Entity, new: &Entity) -> Result<()> {
    match new.mixins().first() {
        Some(mixin) => {
            error!(mixin = %mixin.id, kind = %old.kind().id, "Mixin cannot be changed on update");
            Err(OcciError::BadRequest(format!(
                "mixin {} cannot be applied to a {} on update",
                mixin.id,
                old.kind().id
            )))
        }
        None => Ok(()),
    }
}

/// Copy changed attributes onto the stored entity.
pub(crate) fn merge_attributes(old: &mut Entity, new: &Entity) -> Result<()> {
    reject_read_only(new)?;
    for (key, value) in &new.attributes {
        old.set_attr(key, value.clone());
    }
    Ok(())
}
