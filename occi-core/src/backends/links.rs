//! Link kind backends and the console resources.

use async_trait::async_trait;
use tracing::{error, info};

use crate::backend::{Backend, Extras};
use crate::category::{CategoryId, Kind};
use crate::error::{OcciError, Result};
use crate::extensions::{CONSOLE_LINK, SSH_CONSOLE, VNC_CONSOLE};
use crate::infrastructure::{
    NETWORK, NETWORKINTERFACE, NETWORKINTERFACE_INTERFACE, NETWORKINTERFACE_MAC,
    NETWORKINTERFACE_STATE, NETWORK_STATE, STORAGE, STORAGELINK, STORAGELINK_DEVICEID,
    STORAGELINK_MOUNTPOINT, STORAGELINK_STATE, STORAGE_STATE,
};
use crate::model::Entity;
use crate::state::{LinkState, Observed};

use super::{attach_to_source, detach_from_source, ignore_not_found, remove_links_targeting};

/// State attribute of a link and the target attribute it follows.
#[derive(Debug, Clone, Copy)]
struct DerivedState {
    attribute: &'static str,
    target_attribute: &'static str,
}

/// Backend for a link kind.
///
/// Checks the endpoints on create, registers the link with its source,
/// and derives the link state from the target on every retrieve.
pub struct LinkBackend {
    kind: CategoryId,
    targets: Vec<CategoryId>,
    state: Option<DerivedState>,
    defaults: Vec<(&'static str, &'static str)>,
}

impl LinkBackend {
    fn new(kind: &Kind, targets: &[&Kind]) -> Self {
        Self {
            kind: kind.id.clone(),
            targets: targets.iter().map(|k| k.id.clone()).collect(),
            state: None,
            defaults: Vec::new(),
        }
    }

    fn with_state(mut self, attribute: &'static str, target_attribute: &'static str) -> Self {
        self.state = Some(DerivedState { attribute, target_attribute });
        self
    }

    fn with_default(mut self, key: &'static str, value: &'static str) -> Self {
        self.defaults.push((key, value));
        self
    }

    pub fn network_interface() -> Self {
        Self::new(&NETWORKINTERFACE, &[&*NETWORK])
            .with_state(NETWORKINTERFACE_STATE, NETWORK_STATE)
            .with_default(NETWORKINTERFACE_INTERFACE, "eth0")
            .with_default(NETWORKINTERFACE_MAC, "00:00:00:00:00:00")
    }

    pub fn storage_link() -> Self {
        Self::new(&STORAGELINK, &[&*STORAGE])
            .with_state(STORAGELINK_STATE, STORAGE_STATE)
            .with_default(STORAGELINK_DEVICEID, "/dev/vdb")
            .with_default(STORAGELINK_MOUNTPOINT, "/mnt")
    }

    pub fn console() -> Self {
        Self::new(&CONSOLE_LINK, &[&*SSH_CONSOLE, &*VNC_CONSOLE])
    }

    fn endpoints(entity: &Entity) -> Result<(String, String)> {
        match (entity.source(), entity.target()) {
            (Some(source), Some(target)) => Ok((source.to_string(), target.to_string())),
            _ => Err(OcciError::BadRequest(format!("{} is not a link", entity.identifier))),
        }
    }

    fn refresh_state(&self, entity: &mut Entity, target: Option<&Entity>) {
        if let Some(derived) = self.state {
            let target_state = target.and_then(|t| t.attr(derived.target_attribute));
            Observed::settled(LinkState::from_target(target_state)).apply(entity, derived.attribute);
        } else {
            entity.set_actions(Vec::new());
        }
    }
}

#[async_trait]
impl Backend for LinkBackend {
    async fn create(&self, entity: &mut Entity, extras: &Extras) -> Result<()> {
        let registry = &extras.registry;
        let (source, target) = Self::endpoints(entity)?;

        let source_entity = registry.get_resource(&source)?;
        if source_entity.is_link() {
            error!(source = %source, "Link source is itself a link");
            return Err(OcciError::BadRequest(format!("link source {} must be a resource", source)));
        }

        let target_entity = registry.get_resource(&target)?;
        if !self.targets.contains(&target_entity.kind().id) {
            error!(target = %target, kind = %target_entity.kind().id, "Link target has the wrong kind");
            return Err(OcciError::BadRequest(format!(
                "{} cannot point at a {}",
                self.kind,
                target_entity.kind().id
            )));
        }

        for (key, value) in &self.defaults {
            entity.set_default_attr(key, *value);
        }
        self.refresh_state(entity, Some(&target_entity));

        attach_to_source(registry, entity).await?;
        info!(link = %entity.identifier, source = %source, target = %target, "Link created");
        Ok(())
    }

    async fn retrieve(&self, entity: &mut Entity, extras: &Extras) -> Result<()> {
        let (_, target) = Self::endpoints(entity)?;
        let target_entity = ignore_not_found(extras.registry.get_resource(&target))?;
        self.refresh_state(entity, target_entity.as_ref());
        Ok(())
    }

    async fn delete(&self, entity: &mut Entity, extras: &Extras) -> Result<()> {
        let (source, _) = Self::endpoints(entity)?;
        for (key, _) in &self.defaults {
            entity.attributes.remove(*key);
        }
        if let Some(derived) = self.state {
            entity.attributes.remove(derived.attribute);
        }

        detach_from_source(&extras.registry, &source, &entity.identifier, &entity.identifier).await?;
        info!(link = %entity.identifier, "Link deleted");
        Ok(())
    }
}

/// Backend for the SSH and VNC console resources.
///
/// Consoles are created and refreshed by their compute resource; deleting
/// one directly also removes the console link pointing at it.
pub struct ConsoleBackend;

#[async_trait]
impl Backend for ConsoleBackend {
    async fn create(&self, entity: &mut Entity, _extras: &Extras) -> Result<()> {
        error!(entity_id = %entity.identifier, "Console resources cannot be created directly");
        Err(OcciError::BadRequest(
            "console resources are managed by their compute resource".to_string(),
        ))
    }

    async fn delete(&self, entity: &mut Entity, extras: &Extras) -> Result<()> {
        remove_links_targeting(&extras.registry, &entity.identifier, &entity.identifier).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::COMPUTE;
    use crate::registry::Registry;
    use occi_nova::{MockCloud, NovaContext};
    use std::sync::Arc;

    fn setup() -> Extras {
        let registry = Arc::new(Registry::new());
        registry.add_resource("vm", Entity::resource("vm", COMPUTE.clone(), vec![])).unwrap();
        registry
            .add_resource("net", Entity::resource("net", NETWORK.clone(), vec![]).with_attribute(NETWORK_STATE, "active"))
            .unwrap();
        registry.add_resource("disk", Entity::resource("disk", STORAGE.clone(), vec![])).unwrap();
        Extras::from_cloud(NovaContext::new("fake", "fake"), registry, Arc::new(MockCloud::new()))
    }

    #[tokio::test]
    async fn test_network_interface_lifecycle() {
        let extras = setup();
        let backend = LinkBackend::network_interface();
        let mut nic = Entity::link("nic", NETWORKINTERFACE.clone(), vec![], "vm", "net");

        backend.create(&mut nic, &extras).await.unwrap();
        assert_eq!(nic.attr(NETWORKINTERFACE_STATE), Some("active"));
        assert_eq!(nic.attr(NETWORKINTERFACE_INTERFACE), Some("eth0"));
        assert!(nic.actions().is_empty());
        assert_eq!(extras.registry.get_resource("vm").unwrap().links(), ["nic".to_string()]);

        backend.delete(&mut nic, &extras).await.unwrap();
        assert_eq!(nic.attr(NETWORKINTERFACE_INTERFACE), None);
        assert!(extras.registry.get_resource("vm").unwrap().links().is_empty());
    }

    #[tokio::test]
    async fn test_storage_link_follows_target_state() {
        let extras = setup();
        let backend = LinkBackend::storage_link();
        let mut attachment = Entity::link("att", STORAGELINK.clone(), vec![], "vm", "disk");

        backend.create(&mut attachment, &extras).await.unwrap();
        assert_eq!(attachment.attr(STORAGELINK_STATE), Some("inactive"));

        extras.registry.modify("disk", |d| d.set_attr(STORAGE_STATE, "online")).unwrap();
        backend.retrieve(&mut attachment, &extras).await.unwrap();
        assert_eq!(attachment.attr(STORAGELINK_STATE), Some("active"));
    }

    #[tokio::test]
    async fn test_wrong_target_kind_rejected() {
        let extras = setup();
        let mut nic = Entity::link("nic", NETWORKINTERFACE.clone(), vec![], "vm", "disk");

        let err = LinkBackend::network_interface().create(&mut nic, &extras).await.unwrap_err();
        assert!(matches!(err, OcciError::BadRequest(_)));
        assert!(!extras.registry.contains("nic").unwrap());
    }
}
