//! Type definitions for instances, flavors, images and network adapters.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// =============================================================================
// REQUEST CONTEXT
// =============================================================================

/// Caller identity forwarded to every service call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NovaContext {
    /// User issuing the request
    pub user_id: String,
    /// Project (tenant) the request is scoped to
    pub project_id: String,
    /// Whether the caller holds the admin role
    pub is_admin: bool,
}

impl NovaContext {
    /// Create a context for a regular user.
    pub fn new(user_id: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            project_id: project_id.into(),
            is_admin: false,
        }
    }

    /// Create an admin context.
    pub fn admin(user_id: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            is_admin: true,
            ..Self::new(user_id, project_id)
        }
    }
}

// =============================================================================
// FLAVORS
// =============================================================================

/// An instance type (flavor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flavor {
    /// Flavor ID
    pub id: String,
    /// Flavor name, e.g. `m1.small`
    pub name: String,
    /// Number of virtual CPUs
    pub vcpus: u32,
    /// Memory in MiB
    pub memory_mb: u64,
    /// Root disk in GiB
    pub root_gb: u64,
}

impl Flavor {
    /// Create a flavor whose ID equals its name.
    pub fn new(name: impl Into<String>, vcpus: u32, memory_mb: u64, root_gb: u64) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            name,
            vcpus,
            memory_mb,
            root_gb,
        }
    }

    /// The stock m1.* flavors.
    pub fn defaults() -> Vec<Flavor> {
        vec![
            Flavor::new("m1.tiny", 1, 512, 0),
            Flavor::new("m1.small", 1, 2048, 20),
            Flavor::new("m1.medium", 2, 4096, 40),
            Flavor::new("m1.large", 4, 8192, 80),
            Flavor::new("m1.xlarge", 8, 16384, 160),
        ]
    }
}

// =============================================================================
// IMAGES
// =============================================================================

/// Image metadata as returned by the image service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMeta {
    /// Image ID
    pub id: String,
    /// Image name
    pub name: String,
    /// Container format (ami, aki, ari, bare, ...)
    pub container_format: String,
    /// Disk format (ami, aki, ari, qcow2, raw, ...)
    pub disk_format: String,
    /// Free-form image properties (`arch`, `architecture`, ...)
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl ImageMeta {
    /// Create a machine image in `ami` format.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            container_format: "ami".to_string(),
            disk_format: "ami".to_string(),
            properties: HashMap::new(),
        }
    }

    /// Set both container and disk format.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        let format = format.into();
        self.container_format = format.clone();
        self.disk_format = format;
        self
    }

    /// Add an image property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Kernel (`aki`) and ramdisk (`ari`) images cannot be booted directly.
    pub fn is_kernel_or_ramdisk(&self) -> bool {
        ["aki", "ari"].contains(&self.container_format.as_str())
            || ["aki", "ari"].contains(&self.disk_format.as_str())
    }

    /// Architecture hint from the image properties, if any.
    pub fn architecture(&self) -> Option<&str> {
        self.properties
            .get("arch")
            .or_else(|| self.properties.get("architecture"))
            .map(String::as_str)
    }
}

// =============================================================================
// NETWORK
// =============================================================================

/// Network adapter information for one instance interface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterInfo {
    /// Bridge interface on the host, e.g. `br100`
    pub interface: String,
    /// Fixed IP address (empty while the instance holds no lease)
    pub address: String,
    /// Gateway address
    pub gateway: String,
    /// MAC address
    pub mac: String,
}

// =============================================================================
// INSTANCES
// =============================================================================

/// Instance creation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRequest {
    /// Flavor name
    pub flavor_name: String,
    /// Image to boot from
    pub image_id: String,
    /// Display name (also used as hostname)
    pub display_name: Option<String>,
    /// Key pair name
    pub key_name: Option<String>,
    /// Public key material
    pub key_data: Option<String>,
    /// Security groups to apply
    pub security_groups: Vec<String>,
    /// Admin password injected into the guest
    pub admin_password: Option<String>,
}

impl CreateRequest {
    /// Create a request for a flavor and image.
    pub fn new(flavor_name: impl Into<String>, image_id: impl Into<String>) -> Self {
        Self {
            flavor_name: flavor_name.into(),
            image_id: image_id.into(),
            display_name: None,
            key_name: None,
            key_data: None,
            security_groups: Vec::new(),
            admin_password: None,
        }
    }
}

/// Reboot type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RebootType {
    /// Graceful, guest-cooperative reboot
    Soft,
    /// Power cycle
    Hard,
}

/// Instance VM state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VmState {
    Active,
    Building,
    Rebuilding,
    Paused,
    Suspended,
    Stopped,
    Resized,
    SoftDeleted,
    Deleted,
    Error,
    #[default]
    Unknown,
}

/// Instance task state; set while an operation is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Scheduling,
    Spawning,
    UpdatingPassword,
    Rebooting,
    RebootingHard,
    Starting,
    PoweringOn,
    Stopping,
    PoweringOff,
    Pausing,
    Unpausing,
    Suspending,
    Resuming,
    Rebuilding,
    ResizePrep,
    ResizeMigrating,
    ResizeMigrated,
    ResizeFinish,
    ResizeReverting,
    ResizeConfirming,
    Deleting,
}

/// An instance as reported by the compute service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    /// Instance UUID
    pub uuid: String,
    /// Guest hostname
    pub hostname: String,
    /// Display name
    pub display_name: String,
    /// Flavor name
    pub flavor_name: String,
    /// Image the instance was booted or rebuilt from
    pub image_id: String,
    /// Number of virtual CPUs
    pub vcpus: u32,
    /// Memory in MiB
    pub memory_mb: u64,
    /// Current VM state
    pub vm_state: VmState,
    /// In-flight task, if any
    pub task_state: Option<TaskState>,
    /// Security groups applied
    pub security_groups: Vec<String>,
    /// Key pair name
    pub key_name: Option<String>,
    /// Cached network information
    pub network_info: Vec<AdapterInfo>,
    /// Creation time
    pub created_at: chrono::DateTime<chrono::Utc>,
}
