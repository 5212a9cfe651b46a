//! Registration of the standard categories, templates and the default
//! network.

use std::sync::Arc;

use tracing::{debug, info};

use crate::backend::{Backend, Extras};
use crate::backends::{
    ComputeBackend, ComputeSettings, ConsoleBackend, LinkBackend, NetworkBackend, ScopedMixinBackend,
    StorageBackend,
};
use crate::category::Mixin;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::extensions::{
    os_template, resource_template, security_group, CONSOLE_LINK, DEFAULT_SECURITY_GROUP,
    OS_ADMIN_PWD_EXT, OS_CHG_PWD, OS_CONFIRM_RESIZE, OS_KEY_PAIR_EXT, OS_REBUILD, OS_REVERT_RESIZE,
    SSH_CONSOLE, TCP, VNC_CONSOLE,
};
use crate::infrastructure::{
    BACKUP, COMPUTE, CORE_ID, DOWN, IPNETWORK, IPNETWORKINTERFACE, NETWORK, NETWORKINTERFACE,
    NETWORK_LABEL, NETWORK_STATE, OFFLINE, ONLINE, OS_TPL, RESIZE, RESOURCE_TPL, RESTART, SNAPSHOT,
    START, STOP, STORAGE, STORAGELINK, SUSPEND, UP,
};
use crate::model::Entity;
use crate::registry::Registry;

/// Register the infrastructure kinds, their actions and the extension
/// mixins.
pub fn register_infrastructure(registry: &Registry, settings: ComputeSettings) -> Result<()> {
    let compute: Arc<dyn Backend> = Arc::new(ComputeBackend::new(settings));
    let network: Arc<dyn Backend> = Arc::new(NetworkBackend);
    let storage: Arc<dyn Backend> = Arc::new(StorageBackend);

    registry.register_backend(COMPUTE.clone(), compute.clone())?;
    for action in [&START, &STOP, &RESTART, &SUSPEND] {
        registry.register_backend((**action).clone(), compute.clone())?;
    }
    for action in [&OS_CHG_PWD, &OS_REBUILD, &OS_REVERT_RESIZE, &OS_CONFIRM_RESIZE] {
        registry.register_backend((**action).clone(), compute.clone())?;
    }

    registry.register_backend(NETWORK.clone(), network.clone())?;
    for action in [&UP, &DOWN] {
        registry.register_backend((**action).clone(), network.clone())?;
    }

    registry.register_backend(STORAGE.clone(), storage.clone())?;
    for action in [&ONLINE, &OFFLINE, &BACKUP, &SNAPSHOT, &RESIZE] {
        registry.register_backend((**action).clone(), storage.clone())?;
    }

    registry.register_backend(NETWORKINTERFACE.clone(), Arc::new(LinkBackend::network_interface()))?;
    registry.register_backend(STORAGELINK.clone(), Arc::new(LinkBackend::storage_link()))?;
    registry.register_backend(CONSOLE_LINK.clone(), Arc::new(LinkBackend::console()))?;
    registry.register_backend(SSH_CONSOLE.clone(), Arc::new(ConsoleBackend))?;
    registry.register_backend(VNC_CONSOLE.clone(), Arc::new(ConsoleBackend))?;

    registry.register_backend(IPNETWORK.clone(), Arc::new(ScopedMixinBackend::ip_network()))?;
    registry.register_backend(IPNETWORKINTERFACE.clone(), Arc::new(ScopedMixinBackend::ip_network_interface()))?;
    registry.register_backend(TCP.clone(), Arc::new(ScopedMixinBackend::tcp()))?;

    let compute_only: [&Mixin; 4] = [&OS_TPL, &RESOURCE_TPL, &OS_KEY_PAIR_EXT, &OS_ADMIN_PWD_EXT];
    for mixin in compute_only {
        registry.register_backend(mixin.clone(), Arc::new(ScopedMixinBackend::compute_only(mixin)))?;
    }
    register_mixin(registry, security_group(DEFAULT_SECURITY_GROUP))?;

    info!("Registered infrastructure categories");
    Ok(())
}

fn register_mixin(registry: &Registry, mixin: Mixin) -> Result<()> {
    let backend = Arc::new(ScopedMixinBackend::compute_only(&mixin));
    registry.register_backend(mixin, backend)
}

/// Register one resource template per flavor and one OS template per
/// bootable image. Kernel and ramdisk images are skipped.
pub async fn register_templates(registry: &Registry, extras: &Extras) -> Result<(usize, usize)> {
    let flavors = extras.compute.list_flavors(&extras.nova_ctx).await?;
    for flavor in &flavors {
        debug!(flavor = %flavor.name, "Registering resource template");
        register_mixin(registry, resource_template(flavor))?;
    }

    let images = extras.image.detail(&extras.nova_ctx).await?;
    let mut os_templates = 0;
    for image in images.iter().filter(|i| !i.is_kernel_or_ramdisk()) {
        debug!(image = %image.name, "Registering OS template");
        register_mixin(registry, os_template(image))?;
        os_templates += 1;
    }

    info!(resource_templates = flavors.len(), os_templates, "Registered templates");
    Ok((flavors.len(), os_templates))
}

/// Register a security group so compute resources can carry it.
pub fn register_security_group(registry: &Registry, name: &str) -> Result<()> {
    register_mixin(registry, security_group(name))
}

/// Create the network every compute resource gets linked to. It starts
/// active.
pub async fn create_default_network(dispatcher: &Dispatcher, extras: &Extras, key: &str) -> Result<Entity> {
    let core_id = key.rsplit('/').find(|s| !s.is_empty()).unwrap_or(key);
    let network = Entity::resource(key, NETWORK.clone(), vec![IPNETWORK.clone()])
        .with_attribute(CORE_ID, core_id)
        .with_attribute(NETWORK_LABEL, "default")
        .with_attribute(NETWORK_STATE, "active");
    dispatcher.create(network, extras).await
}
