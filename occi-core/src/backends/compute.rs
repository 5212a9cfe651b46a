//! Compute kind backend.
//!
//! Maps OCCI operations onto the compute service and mirrors the
//! instance's lifecycle back into the compute resource:
//!
//! | OCCI         | compute service                         |
//! |--------------|-----------------------------------------|
//! | START        | unpause (suspended) or resume (inactive) |
//! | STOP         | suspend                                 |
//! | SUSPEND      | pause                                   |
//! | RESTART      | reboot, soft or hard by `method`        |
//! | resource_tpl | resize                                  |
//! | os_tpl       | rebuild                                 |

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{error, info, instrument, warn};

use occi_nova::{AdapterInfo, CreateRequest, Instance, NovaError, RebootType};

use crate::backend::{Backend, Extras};
use crate::category::{Action, MixinChange, MixinRole};
use crate::error::{quota_message, OcciError, Result};
use crate::extensions::{
    ADMIN_PASSWORD, CONSOLE_LINK, CONSOLE_SSH, CONSOLE_VNC, DEFAULT_SECURITY_GROUP, OS_ADMIN_PWD_EXT,
    OS_KEY_PAIR_EXT, PUBLIC_KEY_DATA, PUBLIC_KEY_NAME, SSH_CONSOLE, VNC_CONSOLE,
};
use crate::infrastructure::{
    COMPUTE_ARCHITECTURE, COMPUTE_CORES, COMPUTE_HOSTNAME, COMPUTE_MEMORY, COMPUTE_SPEED,
    COMPUTE_STATE, CORE_ID, CORE_SUMMARY, CORE_TITLE, IPNETWORKINTERFACE, NETWORKINTERFACE,
    NETWORKINTERFACE_ADDRESS, NETWORKINTERFACE_ALLOCATION, NETWORKINTERFACE_GATEWAY,
    NETWORKINTERFACE_INTERFACE, NETWORKINTERFACE_MAC, NETWORKINTERFACE_STATE, NETWORK_STATE,
    RESTART, START, STOP, SUSPEND,
};
use crate::model::{Attributes, Entity};
use crate::state::{ComputeState, LinkState, Lifecycle, Observed};

use super::{ignore_not_found, remove_links_targeting};

/// Attributes only a resource template may define.
const TEMPLATE_ONLY_ATTRIBUTES: [&str; 4] = [COMPUTE_CORES, COMPUTE_SPEED, COMPUTE_MEMORY, COMPUTE_ARCHITECTURE];

/// Tunables of the compute backend.
#[derive(Debug, Clone)]
pub struct ComputeSettings {
    /// Registry key of the network every instance is linked to
    pub default_network: String,
    /// Length of generated admin passwords
    pub password_length: usize,
    /// Non-zero means delete is a soft delete
    pub reclaim_instance_interval: Duration,
    /// Flavor used when no resource template is attached
    pub default_flavor: Option<String>,
    /// Retry hint for quota errors that carry none
    pub quota_retry_after: Duration,
}

impl Default for ComputeSettings {
    fn default() -> Self {
        Self {
            default_network: "/network/DEFAULT_NETWORK".to_string(),
            password_length: 12,
            reclaim_instance_interval: Duration::ZERO,
            default_flavor: Some("m1.small".to_string()),
            quota_retry_after: Duration::ZERO,
        }
    }
}

pub struct ComputeBackend {
    settings: ComputeSettings,
}

/// A validated create request plus what the backend still needs to
/// describe the instance afterwards.
struct LaunchPlan {
    request: CreateRequest,
    os_template_term: String,
    os_template_title: String,
}

impl ComputeBackend {
    pub fn new(settings: ComputeSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ComputeSettings {
        &self.settings
    }

    fn generate_password(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.settings.password_length)
            .map(char::from)
            .collect()
    }

    /// Translate a collaborator error, filling in the quota retry hint.
    fn translate(&self, err: NovaError) -> OcciError {
        match err {
            NovaError::QuotaExceeded { code, message, retry_after_secs } => OcciError::QuotaExceeded {
                message: quota_message(&code, &message),
                retry_after: retry_after_secs
                    .map(Duration::from_secs)
                    .unwrap_or(self.settings.quota_retry_after),
            },
            other => other.into(),
        }
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Validate the entity and turn it into a create request. Touches no
    /// collaborator.
    fn plan(&self, entity: &Entity) -> Result<LaunchPlan> {
        if let Some(key) = TEMPLATE_ONLY_ATTRIBUTES.iter().find(|k| entity.attributes.contains_key(**k)) {
            error!(attribute = *key, "Attribute must come from a resource template");
            return Err(OcciError::BadRequest(format!(
                "{} cannot be set directly; attach a resource template instead",
                key
            )));
        }

        let resource_templates: Vec<_> = entity
            .mixins()
            .iter()
            .filter(|m| m.role == MixinRole::ResourceTemplate)
            .collect();
        let os_templates: Vec<_> = entity
            .mixins()
            .iter()
            .filter_map(|m| match &m.role {
                MixinRole::OsTemplate { image_id } => Some((m, image_id.as_str())),
                _ => None,
            })
            .collect();

        if resource_templates.is_empty() && os_templates.is_empty() {
            error!("No resource or OS template attached");
            return Err(OcciError::BadRequest("No resource or OS template was provided".to_string()));
        }
        if resource_templates.len() > 1 {
            error!(count = resource_templates.len(), "Several resource templates attached");
            return Err(OcciError::BadRequest("Only one resource template may be attached".to_string()));
        }
        let (os_template, image_id) = match os_templates.as_slice() {
            [single] => *single,
            [] => {
                error!("No OS template attached");
                return Err(OcciError::BadRequest("An OS template is required".to_string()));
            }
            _ => {
                error!(count = os_templates.len(), "Several OS templates attached");
                return Err(OcciError::BadRequest("Only one OS template may be attached".to_string()));
            }
        };

        let flavor = match resource_templates.first() {
            Some(tpl) => tpl.id.term.clone(),
            None => self.settings.default_flavor.clone().ok_or_else(|| {
                OcciError::BadRequest("No resource template was provided".to_string())
            })?,
        };

        let mut request = CreateRequest::new(flavor, image_id);
        request.display_name = entity.attr(COMPUTE_HOSTNAME).map(str::to_string);

        if entity.has_mixin(&OS_KEY_PAIR_EXT.id) {
            let name = entity.attr(PUBLIC_KEY_NAME).ok_or_else(|| {
                OcciError::BadRequest(format!("{} is required with the public key mixin", PUBLIC_KEY_NAME))
            })?;
            request.key_name = Some(name.to_string());
            request.key_data = entity.attr(PUBLIC_KEY_DATA).map(str::to_string);
        }

        request.admin_password = Some(match entity.attr(ADMIN_PASSWORD) {
            Some(pwd) if entity.has_mixin(&OS_ADMIN_PWD_EXT.id) && !pwd.is_empty() => pwd.to_string(),
            _ => self.generate_password(),
        });

        let mut seen = BTreeSet::new();
        request.security_groups = entity
            .mixins()
            .iter()
            .filter(|m| m.role == MixinRole::SecurityGroup)
            .map(|m| m.id.term.clone())
            .filter(|name| seen.insert(name.clone()))
            .collect();
        if request.security_groups.is_empty() {
            request.security_groups.push(DEFAULT_SECURITY_GROUP.to_string());
        }

        Ok(LaunchPlan {
            request,
            os_template_term: os_template.id.term.clone(),
            os_template_title: os_template.title.clone(),
        })
    }

    /// Guess the architecture from the template name, else from the image.
    async fn architecture(&self, plan: &LaunchPlan, extras: &Extras) -> Result<String> {
        let hint = |needle: &str| plan.os_template_term.contains(needle) || plan.os_template_title.contains(needle);
        if hint("x86_64") {
            return Ok("x64".to_string());
        }
        if hint("x86_32") {
            return Ok("x86".to_string());
        }

        let image = extras
            .image
            .show(&extras.nova_ctx, &plan.request.image_id)
            .await
            .map_err(|e| self.translate(e))?;
        Ok(image.architecture().unwrap_or("x86").to_string())
    }

    fn create_error(&self, err: NovaError) -> OcciError {
        let message = match &err {
            NovaError::ImageNotFound(_) => Some("Can not find requested image"),
            NovaError::FlavorNotFound(_) => Some("Invalid flavor provided"),
            NovaError::KeypairNotFound(_) => Some("Invalid key_name provided"),
            _ => None,
        };
        match message {
            Some(message) => {
                error!(error = %err, "Instance creation rejected");
                OcciError::BadRequest(message.to_string())
            }
            None => self.translate(err),
        }
    }

    // =========================================================================
    // Refresh
    // =========================================================================

    fn instance_id(entity: &Entity) -> Result<String> {
        entity
            .core_id()
            .map(str::to_string)
            .ok_or_else(|| OcciError::NotFound(format!("{} has no backing instance", entity.identifier)))
    }

    fn describe(entity: &mut Entity, instance: &Instance) {
        entity.set_attr(CORE_ID, instance.uuid.clone());
        entity.set_attr(COMPUTE_HOSTNAME, instance.hostname.clone());
        entity.set_attr(COMPUTE_CORES, instance.vcpus.to_string());
        entity.set_attr(COMPUTE_MEMORY, format!("{:?}", instance.memory_mb as f64 / 1024.0));
        entity.set_attr(COMPUTE_SPEED, "0.0");
        ComputeState::observe(instance.vm_state, instance.task_state).apply(entity, COMPUTE_STATE);
    }

    /// Re-read the instance and bring state, actions, links and consoles
    /// up to date.
    async fn refresh(&self, entity: &mut Entity, extras: &Extras) -> Result<Instance> {
        let instance_id = Self::instance_id(entity)?;
        let instance = extras
            .compute
            .get(&extras.nova_ctx, &instance_id)
            .await
            .map_err(|e| self.translate(e))?;

        Self::describe(entity, &instance);

        let adapter = instance.network_info.first().cloned().unwrap_or_else(|| {
            warn!(instance_id = %instance_id, "Instance has no cached network information");
            AdapterInfo::default()
        });
        self.attach_to_default_network(entity, &adapter, extras)?;
        self.refresh_consoles(entity, extras)?;
        Ok(instance)
    }

    // =========================================================================
    // Auxiliary links
    // =========================================================================

    /// Link the resource to the default network, or update the existing
    /// link in place.
    fn attach_to_default_network(&self, entity: &mut Entity, adapter: &AdapterInfo, extras: &Extras) -> Result<()> {
        let registry = &extras.registry;
        let network_id = self.settings.default_network.as_str();

        for link_id in entity.links() {
            let Some(link) = ignore_not_found(registry.get_resource(link_id))? else {
                continue;
            };
            if link.kind() == &*NETWORKINTERFACE && link.target() == Some(network_id) {
                let network_state = ignore_not_found(registry.get_resource(network_id))?
                    .and_then(|n| n.attr(NETWORK_STATE).map(str::to_string));
                registry.modify(link_id, |l| {
                    write_adapter(l, adapter);
                    Observed::settled(LinkState::from_target(network_state.as_deref()))
                        .apply(l, NETWORKINTERFACE_STATE);
                })?;
                return Ok(());
            }
        }

        let Some(network) = ignore_not_found(registry.get_resource(network_id))? else {
            warn!(network = %network_id, "Default network is not registered; no interface link created");
            return Ok(());
        };

        let uuid = uuid::Uuid::new_v4().to_string();
        let mut link = Entity::link(
            format!("{}{}", NETWORKINTERFACE.location, uuid),
            NETWORKINTERFACE.clone(),
            vec![IPNETWORKINTERFACE.clone()],
            entity.identifier.clone(),
            network.identifier.clone(),
        )
        .with_attribute(CORE_ID, uuid);
        write_adapter(&mut link, adapter);
        link.set_attr(NETWORKINTERFACE_ALLOCATION, "dhcp");
        Observed::settled(LinkState::from_target(network.attr(NETWORK_STATE))).apply(&mut link, NETWORKINTERFACE_STATE);

        let requested = link.identifier.clone();
        let key = registry.add_resource(&requested, link)?;
        if let Some(links) = entity.links_mut() {
            links.push(key);
        }
        info!(network = %network_id, "Linked instance to the default network");
        Ok(())
    }

    /// Create the SSH and VNC consoles once, then keep their addresses
    /// current.
    fn refresh_consoles(&self, entity: &mut Entity, extras: &Extras) -> Result<()> {
        let registry = &extras.registry;

        let mut address = None;
        let mut existing = Vec::new();
        for link_id in entity.links() {
            let Some(link) = ignore_not_found(registry.get_resource(link_id))? else {
                continue;
            };
            if link.kind() == &*NETWORKINTERFACE && address.is_none() {
                address = Some(link.attr(NETWORKINTERFACE_ADDRESS).unwrap_or_default().to_string());
            } else if link.kind() == &*CONSOLE_LINK {
                if let Some(target) = link.target() {
                    if let Some(console) = ignore_not_found(registry.get_resource(target))? {
                        existing.push(console);
                    }
                }
            }
        }

        let Some(address) = address else {
            return Ok(());
        };

        let consoles = [
            (&*SSH_CONSOLE, CONSOLE_SSH, format!("ssh://{}:22", address)),
            (&*VNC_CONSOLE, CONSOLE_VNC, format!("http://{}:80", address)),
        ];
        for (kind, attribute, value) in consoles {
            if let Some(console) = existing.iter().find(|c| c.kind() == kind) {
                registry.modify(&console.identifier, |c| c.set_attr(attribute, value))?;
                continue;
            }

            let console_uuid = uuid::Uuid::new_v4().to_string();
            let console = Entity::resource(format!("{}{}", kind.location, console_uuid), kind.clone(), vec![])
                .with_attribute(CORE_ID, console_uuid)
                .with_attribute(attribute, value);
            let console_key = registry.add_resource(&console.identifier.clone(), console)?;

            let link_uuid = uuid::Uuid::new_v4().to_string();
            let link = Entity::link(
                format!("{}{}", CONSOLE_LINK.location, link_uuid),
                CONSOLE_LINK.clone(),
                vec![],
                entity.identifier.clone(),
                console_key,
            )
            .with_attribute(CORE_ID, link_uuid);
            let link_key = registry.add_resource(&link.identifier.clone(), link)?;
            if let Some(links) = entity.links_mut() {
                links.push(link_key);
            }
        }
        Ok(())
    }

    // =========================================================================
    // Update
    // =========================================================================

    async fn apply_mixin_change(
        &self,
        entity: &mut Entity,
        change: MixinChange<'_>,
        instance_id: &str,
        extras: &Extras,
    ) -> Result<()> {
        let ctx = &extras.nova_ctx;
        match change {
            MixinChange::ResourceTemplate(mixin) => {
                info!(flavor = %mixin.id.term, "Resizing instance");
                extras
                    .compute
                    .resize(ctx, instance_id, &mixin.id.term)
                    .await
                    .map_err(|e| match e {
                        NovaError::FlavorNotFound(_) => OcciError::BadRequest("Unable to locate requested flavor".to_string()),
                        NovaError::CannotResizeToSameSize(_) => {
                            OcciError::BadRequest("Resize requires a change in size".to_string())
                        }
                        other => self.translate(other),
                    })?;
                entity.swap_mixin(mixin.clone());
                Observed::transient(ComputeState::Inactive).apply(entity, COMPUTE_STATE);
            }
            MixinChange::OsTemplate { mixin, image_id } => {
                info!(image = %image_id, "Rebuilding instance");
                let password = self.generate_password();
                extras
                    .compute
                    .rebuild(ctx, instance_id, image_id, &password)
                    .await
                    .map_err(|e| match e {
                        NovaError::ImageNotFound(_) => OcciError::BadRequest("Cannot find image for rebuild".to_string()),
                        other => self.translate(other),
                    })?;
                entity.swap_mixin(mixin.clone());
                Observed::transient(ComputeState::Inactive).apply(entity, COMPUTE_STATE);
            }
            MixinChange::SecurityGroup(mixin) => {
                info!(group = %mixin.id.term, "Updating security rule group");
                entity.attach_mixin(mixin.clone());
            }
            MixinChange::Unknown(mixin) => {
                error!(mixin = %mixin.id, "Unsupported mixin change");
                return Err(OcciError::BadRequest(format!("mixin {} cannot be applied on update", mixin.id)));
            }
        }
        Ok(())
    }
}

fn write_adapter(link: &mut Entity, adapter: &AdapterInfo) {
    link.set_attr(NETWORKINTERFACE_INTERFACE, adapter.interface.clone());
    link.set_attr(NETWORKINTERFACE_MAC, adapter.mac.clone());
    link.set_attr(NETWORKINTERFACE_ADDRESS, adapter.address.clone());
    link.set_attr(NETWORKINTERFACE_GATEWAY, adapter.gateway.clone());
}

fn reboot_type(params: &Attributes) -> Result<RebootType> {
    match params.get("method").map(String::as_str) {
        Some("graceful") | Some("warm") => Ok(RebootType::Soft),
        Some("cold") => Ok(RebootType::Hard),
        other => {
            error!(method = ?other, "Unknown restart method");
            Err(OcciError::BadRequest(format!(
                "unknown restart method {:?}; expected graceful, warm or cold",
                other.unwrap_or_default()
            )))
        }
    }
}

#[async_trait]
impl Backend for ComputeBackend {
    #[instrument(skip(self, entity, extras), fields(entity_id = %entity.identifier))]
    async fn create(&self, entity: &mut Entity, extras: &Extras) -> Result<()> {
        info!("Creating the virtual machine");
        let plan = self.plan(entity)?;

        let instance = extras
            .compute
            .create(&extras.nova_ctx, plan.request.clone())
            .await
            .map_err(|e| self.create_error(e))?;
        let architecture = self.architecture(&plan, extras).await?;
        let adapters = extras
            .network
            .get_instance_network_info(&extras.nova_ctx, &instance)
            .await
            .map_err(|e| self.translate(e))?;

        Self::describe(entity, &instance);
        entity.set_attr(COMPUTE_ARCHITECTURE, architecture);

        // Links need their source registered first.
        let requested = entity.identifier.clone();
        entity.identifier = extras.registry.add_resource(&requested, entity.clone())?;

        let adapter = adapters.into_iter().next().unwrap_or_else(|| {
            warn!(instance_id = %instance.uuid, "No network information returned for new instance");
            AdapterInfo::default()
        });
        self.attach_to_default_network(entity, &adapter, extras)?;
        self.refresh_consoles(entity, extras)?;

        info!(instance_id = %instance.uuid, "Virtual machine created");
        Ok(())
    }

    async fn retrieve(&self, entity: &mut Entity, extras: &Extras) -> Result<()> {
        self.refresh(entity, extras).await?;
        Ok(())
    }

    #[instrument(skip(self, old, new, extras), fields(entity_id = %old.identifier))]
    async fn update(&self, old: &mut Entity, new: &Entity, extras: &Extras) -> Result<()> {
        if let Some(key) = new.attributes.keys().find(|k| *k != CORE_TITLE && *k != CORE_SUMMARY) {
            error!(attribute = %key, "Attribute cannot be updated");
            return Err(OcciError::BadRequest(format!("attribute {} cannot be updated", key)));
        }
        if new.mixins().len() > 1 {
            error!(count = new.mixins().len(), "Several mixin changes in one request");
            return Err(OcciError::BadRequest("only one mixin can be changed per request".to_string()));
        }

        let instance = self.refresh(old, extras).await?;
        if let Some(mixin) = new.mixins().first() {
            self.apply_mixin_change(old, MixinChange::from(mixin), &instance.uuid, extras).await?;
        }

        for (key, value) in &new.attributes {
            if !value.is_empty() {
                old.set_attr(key, value.clone());
            }
        }
        Ok(())
    }

    async fn replace(&self, old: &mut Entity, new: &Entity, extras: &Extras) -> Result<()> {
        self.update(old, new, extras).await
    }

    #[instrument(skip(self, entity, extras), fields(entity_id = %entity.identifier))]
    async fn delete(&self, entity: &mut Entity, extras: &Extras) -> Result<()> {
        let instance_id = Self::instance_id(entity)?;
        let ctx = &extras.nova_ctx;
        if self.settings.reclaim_instance_interval > Duration::ZERO {
            info!(instance_id = %instance_id, "Soft deleting the virtual machine");
            extras.compute.soft_delete(ctx, &instance_id).await.map_err(|e| self.translate(e))?;
        } else {
            info!(instance_id = %instance_id, "Deleting the virtual machine");
            extras.compute.delete(ctx, &instance_id).await.map_err(|e| self.translate(e))?;
        }

        let registry = &extras.registry;
        for link_id in entity.links().to_vec() {
            let Some(link) = ignore_not_found(registry.remove_resource(&link_id))? else {
                continue;
            };
            if link.kind() == &*CONSOLE_LINK {
                if let Some(console) = link.target() {
                    ignore_not_found(registry.remove_resource(console))?;
                }
            }
        }
        if let Some(links) = entity.links_mut() {
            links.clear();
        }
        remove_links_targeting(registry, &entity.identifier, &entity.identifier).await?;
        Ok(())
    }

    #[instrument(skip(self, entity, action, params, extras), fields(entity_id = %entity.identifier, action = %action.id.term))]
    async fn action(&self, entity: &mut Entity, action: &Action, params: &Attributes, extras: &Extras) -> Result<()> {
        let instance = self.refresh(entity, extras).await?;
        if !entity.can(&action.id) {
            error!("Action not applicable in current instance state");
            return Err(OcciError::not_applicable(&action.id, &entity.identifier));
        }

        let current = ComputeState::observe(instance.vm_state, instance.task_state).state;
        let next = current
            .transition(&action.id)
            .ok_or_else(|| OcciError::not_applicable(&action.id, &entity.identifier))?;

        let ctx = &extras.nova_ctx;
        let uuid = instance.uuid.as_str();
        let outcome = if action.id == START.id {
            if current == ComputeState::Suspended {
                info!("Starting (unpausing) virtual machine");
                extras.compute.unpause(ctx, uuid).await
            } else {
                info!("Starting (resuming) virtual machine");
                extras.compute.resume(ctx, uuid).await
            }
        } else if action.id == STOP.id {
            info!("Stopping virtual machine");
            extras.compute.suspend(ctx, uuid).await
        } else if action.id == RESTART.id {
            let reboot = reboot_type(params)?;
            info!(reboot_type = ?reboot, "Restarting virtual machine");
            extras.compute.reboot(ctx, uuid, reboot).await
        } else if action.id == SUSPEND.id {
            info!("Suspending (pausing) virtual machine");
            extras.compute.pause(ctx, uuid).await
        } else {
            return Err(OcciError::not_applicable(&action.id, &entity.identifier));
        };
        outcome.map_err(|e| self.translate(e))?;

        info!(from = current.as_str(), to = next.as_str(), "Compute state changed");
        Observed::settled(next).apply(entity, COMPUTE_STATE);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extensions::{os_template, resource_template, security_group};
    use crate::infrastructure::COMPUTE;
    use crate::registry::Registry;
    use occi_nova::{Flavor, ImageMeta, MockCloud, NovaContext};
    use std::sync::Arc;

    fn extras(cloud: Arc<MockCloud>) -> Extras {
        Extras::from_cloud(NovaContext::new("fake", "fake"), Arc::new(Registry::new()), cloud)
    }

    fn small() -> crate::category::Mixin {
        resource_template(&Flavor::new("m1.small", 1, 2048, 20))
    }

    fn cirros() -> crate::category::Mixin {
        os_template(&ImageMeta::new("img-cirros", "cirros-0.3.0-x86_64-uec"))
    }

    #[test]
    fn test_plan_rejects_template_only_attributes() {
        let backend = ComputeBackend::new(ComputeSettings::default());
        let vm = Entity::resource("vm", COMPUTE.clone(), vec![small(), cirros()]).with_attribute(COMPUTE_CORES, "4");
        assert!(matches!(backend.plan(&vm), Err(OcciError::BadRequest(_))));
    }

    #[test]
    fn test_plan_template_counts() {
        let backend = ComputeBackend::new(ComputeSettings::default());

        let none = Entity::resource("vm", COMPUTE.clone(), vec![]);
        assert!(matches!(backend.plan(&none), Err(OcciError::BadRequest(_))));

        let no_os = Entity::resource("vm", COMPUTE.clone(), vec![small()]);
        assert!(matches!(backend.plan(&no_os), Err(OcciError::BadRequest(_))));

        let ubuntu = os_template(&ImageMeta::new("img-ubuntu", "ubuntu"));
        let two_os = Entity::resource("vm", COMPUTE.clone(), vec![cirros(), ubuntu]);
        assert!(matches!(backend.plan(&two_os), Err(OcciError::BadRequest(_))));

        let default_flavor = Entity::resource("vm", COMPUTE.clone(), vec![cirros()]);
        assert_eq!(backend.plan(&default_flavor).unwrap().request.flavor_name, "m1.small");

        let strict = ComputeBackend::new(ComputeSettings { default_flavor: None, ..Default::default() });
        assert!(matches!(strict.plan(&default_flavor), Err(OcciError::BadRequest(_))));
    }

    #[test]
    fn test_plan_credentials_and_groups() {
        let backend = ComputeBackend::new(ComputeSettings::default());
        let vm = Entity::resource(
            "vm",
            COMPUTE.clone(),
            vec![
                cirros(),
                OS_KEY_PAIR_EXT.clone(),
                OS_ADMIN_PWD_EXT.clone(),
                security_group("web"),
                security_group("db"),
            ],
        )
        .with_attribute(PUBLIC_KEY_NAME, "mykey")
        .with_attribute(PUBLIC_KEY_DATA, "ssh-rsa AAAA")
        .with_attribute(ADMIN_PASSWORD, "s3cret");

        let request = backend.plan(&vm).unwrap().request;
        assert_eq!(request.key_name.as_deref(), Some("mykey"));
        assert_eq!(request.key_data.as_deref(), Some("ssh-rsa AAAA"));
        assert_eq!(request.admin_password.as_deref(), Some("s3cret"));
        assert_eq!(request.security_groups, vec!["web", "db"]);

        let plain = Entity::resource("vm", COMPUTE.clone(), vec![cirros()]);
        let request = backend.plan(&plain).unwrap().request;
        assert_eq!(request.security_groups, vec![DEFAULT_SECURITY_GROUP]);
        assert_eq!(request.admin_password.map(|p| p.len()), Some(12));
    }

    #[test]
    fn test_key_pair_mixin_requires_name() {
        let backend = ComputeBackend::new(ComputeSettings::default());
        let vm = Entity::resource("vm", COMPUTE.clone(), vec![cirros(), OS_KEY_PAIR_EXT.clone()]);
        assert!(matches!(backend.plan(&vm), Err(OcciError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_architecture_heuristic() {
        let cloud = Arc::new(MockCloud::new());
        let extras = extras(cloud.clone());
        let backend = ComputeBackend::new(ComputeSettings::default());

        let vm = Entity::resource("vm", COMPUTE.clone(), vec![cirros()]);
        let plan = backend.plan(&vm).unwrap();
        assert_eq!(backend.architecture(&plan, &extras).await.unwrap(), "x64");
        assert!(cloud.calls().is_empty());

        let ubuntu = os_template(&ImageMeta::new("img-ubuntu", "ubuntu-12.04-server"));
        let vm = Entity::resource("vm", COMPUTE.clone(), vec![ubuntu]);
        let plan = backend.plan(&vm).unwrap();
        assert_eq!(backend.architecture(&plan, &extras).await.unwrap(), "x64");
        assert_eq!(cloud.calls(), vec!["show"]);
    }

    #[test]
    fn test_restart_methods() {
        let mut params = Attributes::new();
        assert!(matches!(reboot_type(&params), Err(OcciError::BadRequest(_))));

        params.insert("method".to_string(), "warm".to_string());
        assert_eq!(reboot_type(&params).unwrap(), RebootType::Soft);
        params.insert("method".to_string(), "cold".to_string());
        assert_eq!(reboot_type(&params).unwrap(), RebootType::Hard);
        params.insert("method".to_string(), "acpioff".to_string());
        assert!(reboot_type(&params).is_err());
    }

    #[test]
    fn test_quota_retry_hint_falls_back_to_settings() {
        let backend = ComputeBackend::new(ComputeSettings {
            quota_retry_after: Duration::from_secs(60),
            ..Default::default()
        });
        let err = backend.translate(NovaError::QuotaExceeded {
            code: "InstanceLimitExceeded".to_string(),
            message: "limit reached".to_string(),
            retry_after_secs: None,
        });
        assert_eq!(err.retry_after(), Some(Duration::from_secs(60)));
        assert!(err.to_string().contains("limit reached"));
    }
}
