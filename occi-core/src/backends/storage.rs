//! Storage kind backend.

use async_trait::async_trait;
use tracing::{error, info};

use crate::backend::{Backend, Extras};
use crate::category::Action;
use crate::error::{OcciError, Result};
use crate::infrastructure::{BACKUP, RESIZE, SNAPSHOT, STORAGE_SIZE, STORAGE_STATE};
use crate::model::{Attributes, Entity};
use crate::state::{Lifecycle, Observed, StorageState};

use super::remove_links_targeting;

pub struct StorageBackend;

/// Parse the `size` parameter of a resize, in GiB.
fn requested_size(params: &Attributes) -> Result<f64> {
    let raw = params
        .get("size")
        .ok_or_else(|| OcciError::BadRequest("resize requires a size parameter".to_string()))?;
    match raw.parse::<f64>() {
        Ok(size) if size.is_finite() && size > 0.0 => Ok(size),
        _ => Err(OcciError::BadRequest(format!("invalid storage size: {}", raw))),
    }
}

#[async_trait]
impl Backend for StorageBackend {
    async fn create(&self, entity: &mut Entity, _extras: &Extras) -> Result<()> {
        info!(entity_id = %entity.identifier, "Creating storage");
        entity.set_default_attr(STORAGE_SIZE, "1.0");
        Observed::settled(StorageState::Offline).apply(entity, STORAGE_STATE);
        Ok(())
    }

    async fn retrieve(&self, entity: &mut Entity, _extras: &Extras) -> Result<()> {
        Observed::read(entity, STORAGE_STATE, StorageState::Offline).apply(entity, STORAGE_STATE);
        Ok(())
    }

    async fn delete(&self, entity: &mut Entity, extras: &Extras) -> Result<()> {
        info!(entity_id = %entity.identifier, "Deleting storage");
        remove_links_targeting(&extras.registry, &entity.identifier, &entity.identifier).await?;
        Ok(())
    }

    async fn action(&self, entity: &mut Entity, action: &Action, params: &Attributes, extras: &Extras) -> Result<()> {
        self.retrieve(entity, extras).await?;
        if !entity.can(&action.id) {
            error!(action = %action.id, "Action not applicable in current storage state");
            return Err(OcciError::not_applicable(&action.id, &entity.identifier));
        }

        let current = Observed::read(entity, STORAGE_STATE, StorageState::Offline).state;
        let next = current
            .transition(&action.id)
            .ok_or_else(|| OcciError::not_applicable(&action.id, &entity.identifier))?;

        if action.id == RESIZE.id {
            let size = requested_size(params)?;
            info!(size, "Resizing storage");
            entity.set_attr(STORAGE_SIZE, format!("{:?}", size));
        } else if action.id == BACKUP.id {
            info!("Backing up storage");
        } else if action.id == SNAPSHOT.id {
            info!("Snapshotting storage");
        }

        Observed::settled(next).apply(entity, STORAGE_STATE);
        Ok(())
    }
}
