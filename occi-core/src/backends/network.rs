//! Network kind backend.
//!
//! Networks have no collaborator behind them; their state lives in the
//! `occi.network.state` attribute.

use async_trait::async_trait;
use tracing::{error, info};

use crate::backend::{Backend, Extras};
use crate::category::Action;
use crate::error::{OcciError, Result};
use crate::infrastructure::{NETWORK_LABEL, NETWORK_STATE, NETWORK_VLAN};
use crate::model::{Attributes, Entity};
use crate::state::{Lifecycle, NetworkState, Observed};

use super::remove_links_targeting;

pub struct NetworkBackend;

#[async_trait]
impl Backend for NetworkBackend {
    async fn create(&self, entity: &mut Entity, _extras: &Extras) -> Result<()> {
        info!(entity_id = %entity.identifier, "Creating network");
        entity.set_default_attr(NETWORK_VLAN, "1");
        entity.set_default_attr(NETWORK_LABEL, "default");

        let initial = entity
            .attr(NETWORK_STATE)
            .and_then(NetworkState::parse)
            .unwrap_or(NetworkState::Inactive);
        Observed::settled(initial).apply(entity, NETWORK_STATE);
        Ok(())
    }

    async fn retrieve(&self, entity: &mut Entity, _extras: &Extras) -> Result<()> {
        Observed::read(entity, NETWORK_STATE, NetworkState::Inactive).apply(entity, NETWORK_STATE);
        Ok(())
    }

    async fn delete(&self, entity: &mut Entity, extras: &Extras) -> Result<()> {
        info!(entity_id = %entity.identifier, "Deleting network");
        let removed = remove_links_targeting(&extras.registry, &entity.identifier, &entity.identifier).await?;
        if removed > 0 {
            info!(links = removed, "Removed links to the network");
        }
        Ok(())
    }

    async fn action(&self, entity: &mut Entity, action: &Action, _params: &Attributes, extras: &Extras) -> Result<()> {
        self.retrieve(entity, extras).await?;
        if !entity.can(&action.id) {
            error!(action = %action.id, "Action not applicable in current network state");
            return Err(OcciError::not_applicable(&action.id, &entity.identifier));
        }

        let current = Observed::read(entity, NETWORK_STATE, NetworkState::Inactive).state;
        let next = current
            .transition(&action.id)
            .ok_or_else(|| OcciError::not_applicable(&action.id, &entity.identifier))?;

        info!(from = current.as_str(), to = next.as_str(), "Network state changed");
        Observed::settled(next).apply(entity, NETWORK_STATE);
        Ok(())
    }
}
