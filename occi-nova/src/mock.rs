//! In-memory compute, network and image services for testing and development.

use async_trait::async_trait;
use rand::Rng;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::error::{NovaError, Result};
use crate::traits::{ComputeApi, ImageService, NetworkApi};
use crate::types::*;

/// Default number of instances a project may own.
const DEFAULT_INSTANCE_LIMIT: usize = 10;

/// Mock cloud implementing all three service contracts.
///
/// Instances live in memory. Power operations complete immediately;
/// reboot, resize and rebuild leave a task state on the instance until
/// [`MockCloud::complete_task`] is called, like the real compute service
/// does while the operation is in flight. Useful for:
/// - Unit and integration testing
/// - Development without a Nova deployment
pub struct MockCloud {
    instances: RwLock<HashMap<String, MockInstance>>,
    flavors: RwLock<Vec<Flavor>>,
    images: RwLock<HashMap<String, ImageMeta>>,
    failures: RwLock<HashMap<&'static str, NovaError>>,
    calls: RwLock<Vec<String>>,
    instance_limit: usize,
    next_host: RwLock<u8>,
}

struct MockInstance {
    instance: Instance,
    /// Flavor to apply when a pending resize completes
    pending_flavor: Option<Flavor>,
}

impl MockCloud {
    /// Create a mock cloud with the stock flavors and a small image catalog.
    pub fn new() -> Self {
        info!("Creating mock cloud services");
        let images = Self::default_images()
            .into_iter()
            .map(|img| (img.id.clone(), img))
            .collect();
        Self {
            instances: RwLock::new(HashMap::new()),
            flavors: RwLock::new(Flavor::defaults()),
            images: RwLock::new(images),
            failures: RwLock::new(HashMap::new()),
            calls: RwLock::new(Vec::new()),
            instance_limit: DEFAULT_INSTANCE_LIMIT,
            next_host: RwLock::new(2),
        }
    }

    /// Replace the flavor catalog.
    pub fn with_flavors(self, flavors: Vec<Flavor>) -> Self {
        if let Ok(mut f) = self.flavors.write() {
            *f = flavors;
        }
        self
    }

    /// Replace the image catalog.
    pub fn with_images(self, images: Vec<ImageMeta>) -> Self {
        if let Ok(mut i) = self.images.write() {
            *i = images.into_iter().map(|img| (img.id.clone(), img)).collect();
        }
        self
    }

    /// Set the per-project instance quota.
    pub fn with_instance_limit(mut self, limit: usize) -> Self {
        self.instance_limit = limit;
        self
    }

    fn default_images() -> Vec<ImageMeta> {
        vec![
            ImageMeta::new("img-cirros", "cirros-0.3.0-x86_64-uec"),
            ImageMeta::new("img-cirros-kernel", "cirros-0.3.0-x86_64-uec-kernel").with_format("aki"),
            ImageMeta::new("img-cirros-ramdisk", "cirros-0.3.0-x86_64-uec-ramdisk").with_format("ari"),
            ImageMeta::new("img-ubuntu", "ubuntu-12.04-server")
                .with_format("qcow2")
                .with_property("architecture", "x64"),
        ]
    }

    /// Make the next call to `operation` fail with `error`.
    pub fn fail_next(&self, operation: &'static str, error: NovaError) {
        if let Ok(mut failures) = self.failures.write() {
            failures.insert(operation, error);
        }
    }

    /// Operations called so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().map(|c| c.clone()).unwrap_or_default()
    }

    /// Force an instance into a state, e.g. to simulate an in-flight task.
    pub fn set_state(&self, instance_id: &str, vm_state: VmState, task_state: Option<TaskState>) -> Result<()> {
        self.with_instance(instance_id, |vm| {
            vm.instance.vm_state = vm_state;
            vm.instance.task_state = task_state;
            Ok(())
        })
    }

    /// Finish whatever task the instance has in flight.
    pub fn complete_task(&self, instance_id: &str) -> Result<()> {
        self.with_instance(instance_id, |vm| {
            if let Some(flavor) = vm.pending_flavor.take() {
                vm.instance.flavor_name = flavor.name;
                vm.instance.vcpus = flavor.vcpus;
                vm.instance.memory_mb = flavor.memory_mb;
            }
            if vm.instance.task_state.take().is_some() {
                vm.instance.vm_state = VmState::Active;
            }
            Ok(())
        })
    }

    fn record(&self, operation: &'static str) -> Result<()> {
        let mut calls = self.calls.write().map_err(|_| {
            NovaError::Internal("Lock poisoned".to_string())
        })?;
        calls.push(operation.to_string());
        drop(calls);

        let mut failures = self.failures.write().map_err(|_| {
            NovaError::Internal("Lock poisoned".to_string())
        })?;
        match failures.remove(operation) {
            Some(error) => {
                debug!(operation, error = %error, "Injected failure");
                Err(error)
            }
            None => Ok(()),
        }
    }

    fn with_instance<T>(
        &self,
        instance_id: &str,
        f: impl FnOnce(&mut MockInstance) -> Result<T>,
    ) -> Result<T> {
        let mut instances = self.instances.write().map_err(|_| {
            NovaError::Internal("Lock poisoned".to_string())
        })?;

        let vm = instances.get_mut(instance_id)
            .ok_or_else(|| NovaError::InstanceNotFound(instance_id.to_string()))?;

        f(vm)
    }

    fn find_flavor(&self, name: &str) -> Result<Flavor> {
        let flavors = self.flavors.read().map_err(|_| {
            NovaError::Internal("Lock poisoned".to_string())
        })?;
        flavors.iter()
            .find(|f| f.name == name)
            .cloned()
            .ok_or_else(|| NovaError::FlavorNotFound(name.to_string()))
    }

    fn find_image(&self, image_id: &str) -> Result<ImageMeta> {
        let images = self.images.read().map_err(|_| {
            NovaError::Internal("Lock poisoned".to_string())
        })?;
        images.get(image_id)
            .cloned()
            .ok_or_else(|| NovaError::ImageNotFound(image_id.to_string()))
    }

    fn allocate_adapter(&self) -> Result<AdapterInfo> {
        let mut next = self.next_host.write().map_err(|_| {
            NovaError::Internal("Lock poisoned".to_string())
        })?;
        let host = *next;
        *next = next.wrapping_add(1).max(2);

        Ok(AdapterInfo {
            interface: "br100".to_string(),
            address: format!("10.0.0.{}", host),
            gateway: "10.0.0.1".to_string(),
            mac: generate_mac(),
        })
    }
}

impl Default for MockCloud {
    fn default() -> Self {
        Self::new()
    }
}

fn generate_mac() -> String {
    let mut rng = rand::thread_rng();
    format!(
        "fa:16:3e:{:02x}:{:02x}:{:02x}",
        rng.gen::<u8>(),
        rng.gen::<u8>(),
        rng.gen::<u8>()
    )
}

/// No operation may start while another one is in flight, except that
/// a password update never blocks.
fn ensure_idle(vm: &MockInstance) -> Result<()> {
    match vm.instance.task_state {
        None | Some(TaskState::UpdatingPassword) => Ok(()),
        Some(task) => Err(NovaError::InstanceInvalidState(
            format!("instance {} is busy with {:?}", vm.instance.uuid, task)
        )),
    }
}

fn ensure_state(vm: &MockInstance, allowed: &[VmState], operation: &str) -> Result<()> {
    ensure_idle(vm)?;
    if allowed.contains(&vm.instance.vm_state) {
        Ok(())
    } else {
        Err(NovaError::InstanceInvalidState(format!(
            "cannot {} instance {} while {:?}",
            operation, vm.instance.uuid, vm.instance.vm_state
        )))
    }
}

#[async_trait]
impl ComputeApi for MockCloud {
    #[instrument(skip(self, ctx, request), fields(flavor = %request.flavor_name, image = %request.image_id))]
    async fn create(&self, ctx: &NovaContext, request: CreateRequest) -> Result<Instance> {
        info!(project_id = %ctx.project_id, "Creating mock instance");
        self.record("create")?;

        let flavor = self.find_flavor(&request.flavor_name)?;
        self.find_image(&request.image_id)?;

        let owned = self.instances.read().map_err(|_| {
            NovaError::Internal("Lock poisoned".to_string())
        })?.len();
        if owned >= self.instance_limit {
            return Err(NovaError::QuotaExceeded {
                code: "InstanceLimitExceeded".to_string(),
                message: format!("Quota exceeded for instances: limit of {} reached", self.instance_limit),
                retry_after_secs: None,
            });
        }

        let uuid = uuid::Uuid::new_v4().to_string();
        let display_name = request.display_name.clone()
            .unwrap_or_else(|| format!("server-{}", &uuid[..8]));
        let adapter = self.allocate_adapter()?;

        let instance = Instance {
            uuid: uuid.clone(),
            hostname: display_name.to_lowercase().replace(' ', "-"),
            display_name,
            flavor_name: flavor.name.clone(),
            image_id: request.image_id,
            vcpus: flavor.vcpus,
            memory_mb: flavor.memory_mb,
            vm_state: VmState::Active,
            task_state: None,
            security_groups: request.security_groups,
            key_name: request.key_name,
            network_info: vec![adapter],
            created_at: chrono::Utc::now(),
        };

        let mut instances = self.instances.write().map_err(|_| {
            NovaError::Internal("Lock poisoned".to_string())
        })?;
        instances.insert(uuid.clone(), MockInstance {
            instance: instance.clone(),
            pending_flavor: None,
        });

        info!(instance_id = %uuid, "Mock instance created");
        Ok(instance)
    }

    async fn get(&self, _ctx: &NovaContext, instance_id: &str) -> Result<Instance> {
        self.record("get")?;
        let instances = self.instances.read().map_err(|_| {
            NovaError::Internal("Lock poisoned".to_string())
        })?;

        instances.get(instance_id)
            .map(|vm| vm.instance.clone())
            .ok_or_else(|| NovaError::InstanceNotFound(instance_id.to_string()))
    }

    #[instrument(skip(self, _ctx), fields(instance_id = %instance_id))]
    async fn delete(&self, _ctx: &NovaContext, instance_id: &str) -> Result<()> {
        info!("Deleting mock instance");
        self.record("delete")?;

        let mut instances = self.instances.write().map_err(|_| {
            NovaError::Internal("Lock poisoned".to_string())
        })?;
        instances.remove(instance_id)
            .ok_or_else(|| NovaError::InstanceNotFound(instance_id.to_string()))?;

        info!("Mock instance deleted");
        Ok(())
    }

    #[instrument(skip(self, _ctx), fields(instance_id = %instance_id))]
    async fn soft_delete(&self, _ctx: &NovaContext, instance_id: &str) -> Result<()> {
        info!("Soft deleting mock instance");
        self.record("soft_delete")?;
        self.with_instance(instance_id, |vm| {
            vm.instance.vm_state = VmState::SoftDeleted;
            vm.instance.task_state = None;
            Ok(())
        })
    }

    #[instrument(skip(self, _ctx), fields(instance_id = %instance_id, reboot_type = ?reboot_type))]
    async fn reboot(&self, _ctx: &NovaContext, instance_id: &str, reboot_type: RebootType) -> Result<()> {
        info!("Rebooting mock instance");
        self.record("reboot")?;
        self.with_instance(instance_id, |vm| {
            ensure_state(vm, &[VmState::Active, VmState::Stopped], "reboot")?;
            vm.instance.task_state = Some(match reboot_type {
                RebootType::Soft => TaskState::Rebooting,
                RebootType::Hard => TaskState::RebootingHard,
            });
            Ok(())
        })
    }

    #[instrument(skip(self, _ctx), fields(instance_id = %instance_id))]
    async fn pause(&self, _ctx: &NovaContext, instance_id: &str) -> Result<()> {
        info!("Pausing mock instance");
        self.record("pause")?;
        self.with_instance(instance_id, |vm| {
            ensure_state(vm, &[VmState::Active], "pause")?;
            vm.instance.vm_state = VmState::Paused;
            Ok(())
        })
    }

    #[instrument(skip(self, _ctx), fields(instance_id = %instance_id))]
    async fn unpause(&self, _ctx: &NovaContext, instance_id: &str) -> Result<()> {
        info!("Unpausing mock instance");
        self.record("unpause")?;
        self.with_instance(instance_id, |vm| {
            ensure_state(vm, &[VmState::Paused], "unpause")?;
            vm.instance.vm_state = VmState::Active;
            Ok(())
        })
    }

    #[instrument(skip(self, _ctx), fields(instance_id = %instance_id))]
    async fn suspend(&self, _ctx: &NovaContext, instance_id: &str) -> Result<()> {
        info!("Suspending mock instance");
        self.record("suspend")?;
        self.with_instance(instance_id, |vm| {
            ensure_state(vm, &[VmState::Active], "suspend")?;
            vm.instance.vm_state = VmState::Suspended;
            Ok(())
        })
    }

    #[instrument(skip(self, _ctx), fields(instance_id = %instance_id))]
    async fn resume(&self, _ctx: &NovaContext, instance_id: &str) -> Result<()> {
        info!("Resuming mock instance");
        self.record("resume")?;
        self.with_instance(instance_id, |vm| {
            ensure_state(vm, &[VmState::Suspended], "resume")?;
            vm.instance.vm_state = VmState::Active;
            Ok(())
        })
    }

    #[instrument(skip(self, _ctx), fields(instance_id = %instance_id, flavor = %flavor_name))]
    async fn resize(&self, _ctx: &NovaContext, instance_id: &str, flavor_name: &str) -> Result<()> {
        info!("Resizing mock instance");
        self.record("resize")?;
        let flavor = self.find_flavor(flavor_name)?;
        self.with_instance(instance_id, |vm| {
            ensure_state(vm, &[VmState::Active, VmState::Stopped], "resize")?;
            if vm.instance.flavor_name == flavor.name {
                return Err(NovaError::CannotResizeToSameSize(flavor.name.clone()));
            }
            vm.instance.task_state = Some(TaskState::ResizePrep);
            vm.pending_flavor = Some(flavor);
            Ok(())
        })
    }

    #[instrument(skip(self, _ctx, _admin_password), fields(instance_id = %instance_id, image = %image_id))]
    async fn rebuild(
        &self,
        _ctx: &NovaContext,
        instance_id: &str,
        image_id: &str,
        _admin_password: &str,
    ) -> Result<()> {
        info!("Rebuilding mock instance");
        self.record("rebuild")?;
        self.find_image(image_id)?;
        self.with_instance(instance_id, |vm| {
            ensure_state(vm, &[VmState::Active, VmState::Stopped], "rebuild")?;
            vm.instance.image_id = image_id.to_string();
            vm.instance.vm_state = VmState::Rebuilding;
            vm.instance.task_state = Some(TaskState::Rebuilding);
            Ok(())
        })
    }

    async fn list_flavors(&self, _ctx: &NovaContext) -> Result<Vec<Flavor>> {
        self.record("list_flavors")?;
        let flavors = self.flavors.read().map_err(|_| {
            NovaError::Internal("Lock poisoned".to_string())
        })?;
        Ok(flavors.clone())
    }
}

#[async_trait]
impl NetworkApi for MockCloud {
    async fn get_instance_network_info(
        &self,
        _ctx: &NovaContext,
        instance: &Instance,
    ) -> Result<Vec<AdapterInfo>> {
        self.record("get_instance_network_info")?;
        let instances = self.instances.read().map_err(|_| {
            NovaError::Internal("Lock poisoned".to_string())
        })?;

        let vm = instances.get(&instance.uuid)
            .ok_or_else(|| NovaError::InstanceNotFound(instance.uuid.clone()))?;

        debug!(instance_id = %instance.uuid, adapters = vm.instance.network_info.len(), "Network info queried");
        Ok(vm.instance.network_info.clone())
    }
}

#[async_trait]
impl ImageService for MockCloud {
    async fn show(&self, _ctx: &NovaContext, image_id: &str) -> Result<ImageMeta> {
        self.record("show")?;
        self.find_image(image_id)
    }

    async fn detail(&self, _ctx: &NovaContext) -> Result<Vec<ImageMeta>> {
        self.record("detail")?;
        let images = self.images.read().map_err(|_| {
            NovaError::Internal("Lock poisoned".to_string())
        })?;

        let mut result: Vec<ImageMeta> = images.values().cloned().collect();
        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }
}
