//! Mixin backends that check the kind they are applied to and manage
//! mixin-scoped attributes.

use async_trait::async_trait;
use tracing::{debug, error};

use crate::backend::{Backend, Extras};
use crate::category::{CategoryId, Kind, Mixin};
use crate::error::{OcciError, Result};
use crate::extensions::{TCP, TCP_ATTRIBUTE};
use crate::infrastructure::{
    COMPUTE, IPNETWORK, IPNETWORKINTERFACE, NETWORK, NETWORKINTERFACE, NETWORK_ADDRESS,
    NETWORK_ALLOCATION, NETWORK_GATEWAY, NETWORKINTERFACE_ADDRESS, NETWORKINTERFACE_ALLOCATION,
    NETWORKINTERFACE_GATEWAY,
};
use crate::model::Entity;

/// Backend for a mixin that only applies to one kind.
///
/// On create it sets its attributes unless already supplied; on delete it
/// strips them again.
pub struct ScopedMixinBackend {
    mixin: CategoryId,
    applies_to: CategoryId,
    defaults: Vec<(&'static str, &'static str)>,
}

impl ScopedMixinBackend {
    pub fn new(mixin: &Mixin, applies_to: &Kind) -> Self {
        Self {
            mixin: mixin.id.clone(),
            applies_to: applies_to.id.clone(),
            defaults: Vec::new(),
        }
    }

    pub fn with_default(mut self, key: &'static str, value: &'static str) -> Self {
        self.defaults.push((key, value));
        self
    }

    /// Templates, credentials and security groups.
    pub fn compute_only(mixin: &Mixin) -> Self {
        Self::new(mixin, &COMPUTE)
    }

    pub fn ip_network() -> Self {
        Self::new(&IPNETWORK, &NETWORK)
            .with_default(NETWORK_ADDRESS, "10.0.0.1/24")
            .with_default(NETWORK_GATEWAY, "10.0.0.1")
            .with_default(NETWORK_ALLOCATION, "dynamic")
    }

    pub fn ip_network_interface() -> Self {
        Self::new(&IPNETWORKINTERFACE, &NETWORKINTERFACE)
            .with_default(NETWORKINTERFACE_ADDRESS, "10.0.0.65")
            .with_default(NETWORKINTERFACE_GATEWAY, "10.0.0.1")
            .with_default(NETWORKINTERFACE_ALLOCATION, "dynamic")
    }

    /// Trusted compute pool.
    pub fn tcp() -> Self {
        Self::new(&TCP, &COMPUTE).with_default(TCP_ATTRIBUTE, "true")
    }

    fn check_kind(&self, entity: &Entity) -> Result<()> {
        if entity.kind().id == self.applies_to {
            return Ok(());
        }
        error!(mixin = %self.mixin, kind = %entity.kind().id, "Mixin applied to the wrong kind");
        Err(OcciError::BadRequest(format!(
            "mixin {} can only be applied to {}",
            self.mixin, self.applies_to
        )))
    }
}

#[async_trait]
impl Backend for ScopedMixinBackend {
    async fn create(&self, entity: &mut Entity, _extras: &Extras) -> Result<()> {
        self.check_kind(entity)?;
        for (key, value) in &self.defaults {
            entity.set_default_attr(key, *value);
        }
        debug!(mixin = %self.mixin, entity_id = %entity.identifier, "Mixin applied");
        Ok(())
    }

    async fn delete(&self, entity: &mut Entity, _extras: &Extras) -> Result<()> {
        for (key, _) in &self.defaults {
            entity.attributes.remove(*key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use occi_nova::{MockCloud, NovaContext};
    use std::sync::Arc;

    fn extras() -> Extras {
        Extras::from_cloud(NovaContext::new("fake", "fake"), Arc::new(Registry::new()), Arc::new(MockCloud::new()))
    }

    #[tokio::test]
    async fn test_tcp_only_on_compute() {
        let backend = ScopedMixinBackend::tcp();

        let mut vm = Entity::resource("vm", COMPUTE.clone(), vec![TCP.clone()]);
        backend.create(&mut vm, &extras()).await.unwrap();
        assert_eq!(vm.attr(TCP_ATTRIBUTE), Some("true"));

        let mut net = Entity::resource("net", NETWORK.clone(), vec![TCP.clone()]);
        let err = backend.create(&mut net, &extras()).await.unwrap_err();
        assert!(matches!(err, OcciError::BadRequest(_)));
        assert_eq!(net.attr(TCP_ATTRIBUTE), None);
    }

    #[tokio::test]
    async fn test_ip_network_defaults_and_strip() {
        let backend = ScopedMixinBackend::ip_network();
        let mut net = Entity::resource("net", NETWORK.clone(), vec![IPNETWORK.clone()])
            .with_attribute(NETWORK_ADDRESS, "192.168.0.0/24");

        backend.create(&mut net, &extras()).await.unwrap();
        assert_eq!(net.attr(NETWORK_ADDRESS), Some("192.168.0.0/24"));
        assert_eq!(net.attr(NETWORK_ALLOCATION), Some("dynamic"));

        backend.delete(&mut net, &extras()).await.unwrap();
        assert_eq!(net.attr(NETWORK_ADDRESS), None);
        assert_eq!(net.attr(NETWORK_GATEWAY), None);
    }
}
