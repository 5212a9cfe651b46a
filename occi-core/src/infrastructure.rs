//! OCCI core and infrastructure categories.

use once_cell::sync::Lazy;

use crate::category::{Action, Kind, Mixin};

pub const CORE_SCHEME: &str = "http://schemas.ogf.org/occi/core#";
pub const INFRASTRUCTURE_SCHEME: &str = "http://schemas.ogf.org/occi/infrastructure#";

const COMPUTE_ACTION_SCHEME: &str = "http://schemas.ogf.org/occi/infrastructure/compute/action#";
const NETWORK_ACTION_SCHEME: &str = "http://schemas.ogf.org/occi/infrastructure/network/action#";
const STORAGE_ACTION_SCHEME: &str = "http://schemas.ogf.org/occi/infrastructure/storage/action#";

// Attribute names used by the backends.
pub const CORE_ID: &str = "occi.core.id";
pub const CORE_TITLE: &str = "occi.core.title";
pub const CORE_SUMMARY: &str = "occi.core.summary";

pub const COMPUTE_ARCHITECTURE: &str = "occi.compute.architecture";
pub const COMPUTE_CORES: &str = "occi.compute.cores";
pub const COMPUTE_HOSTNAME: &str = "occi.compute.hostname";
pub const COMPUTE_SPEED: &str = "occi.compute.speed";
pub const COMPUTE_MEMORY: &str = "occi.compute.memory";
pub const COMPUTE_STATE: &str = "occi.compute.state";

pub const NETWORK_VLAN: &str = "occi.network.vlan";
pub const NETWORK_LABEL: &str = "occi.network.label";
pub const NETWORK_STATE: &str = "occi.network.state";
pub const NETWORK_ADDRESS: &str = "occi.network.address";
pub const NETWORK_GATEWAY: &str = "occi.network.gateway";
pub const NETWORK_ALLOCATION: &str = "occi.network.allocation";

pub const STORAGE_SIZE: &str = "occi.storage.size";
pub const STORAGE_STATE: &str = "occi.storage.state";

pub const NETWORKINTERFACE_INTERFACE: &str = "occi.networkinterface.interface";
pub const NETWORKINTERFACE_MAC: &str = "occi.networkinterface.mac";
pub const NETWORKINTERFACE_STATE: &str = "occi.networkinterface.state";
pub const NETWORKINTERFACE_ADDRESS: &str = "occi.networkinterface.address";
pub const NETWORKINTERFACE_GATEWAY: &str = "occi.networkinterface.gateway";
pub const NETWORKINTERFACE_ALLOCATION: &str = "occi.networkinterface.allocation";

pub const STORAGELINK_DEVICEID: &str = "occi.storagelink.deviceid";
pub const STORAGELINK_MOUNTPOINT: &str = "occi.storagelink.mountpoint";
pub const STORAGELINK_STATE: &str = "occi.storagelink.state";

// =============================================================================
// ACTIONS
// =============================================================================

pub static START: Lazy<Action> = Lazy::new(|| {
    Action::new(COMPUTE_ACTION_SCHEME, "start", "Start compute resource")
});

pub static STOP: Lazy<Action> = Lazy::new(|| {
    Action::new(COMPUTE_ACTION_SCHEME, "stop", "Stop compute resource").with_attributes(&["method"])
});

pub static RESTART: Lazy<Action> = Lazy::new(|| {
    Action::new(COMPUTE_ACTION_SCHEME, "restart", "Restart compute resource").with_attributes(&["method"])
});

pub static SUSPEND: Lazy<Action> = Lazy::new(|| {
    Action::new(COMPUTE_ACTION_SCHEME, "suspend", "Suspend compute resource").with_attributes(&["method"])
});

pub static UP: Lazy<Action> = Lazy::new(|| Action::new(NETWORK_ACTION_SCHEME, "up", "Activate network"));

pub static DOWN: Lazy<Action> = Lazy::new(|| Action::new(NETWORK_ACTION_SCHEME, "down", "Deactivate network"));

pub static ONLINE: Lazy<Action> = Lazy::new(|| Action::new(STORAGE_ACTION_SCHEME, "online", "Bring storage online"));

pub static OFFLINE: Lazy<Action> = Lazy::new(|| Action::new(STORAGE_ACTION_SCHEME, "offline", "Take storage offline"));

pub static BACKUP: Lazy<Action> = Lazy::new(|| Action::new(STORAGE_ACTION_SCHEME, "backup", "Backup storage"));

pub static SNAPSHOT: Lazy<Action> = Lazy::new(|| Action::new(STORAGE_ACTION_SCHEME, "snapshot", "Snapshot storage"));

pub static RESIZE: Lazy<Action> = Lazy::new(|| {
    Action::new(STORAGE_ACTION_SCHEME, "resize", "Resize storage").with_attributes(&["size"])
});

// =============================================================================
// KINDS
// =============================================================================

pub static ENTITY: Lazy<Kind> = Lazy::new(|| {
    Kind::new(CORE_SCHEME, "entity", "Entity").with_attributes(&[CORE_ID, CORE_TITLE])
});

pub static RESOURCE: Lazy<Kind> = Lazy::new(|| {
    Kind::new(CORE_SCHEME, "resource", "Resource")
        .with_related(&ENTITY)
        .with_attributes(&[CORE_SUMMARY])
});

pub static LINK: Lazy<Kind> = Lazy::new(|| {
    Kind::new(CORE_SCHEME, "link", "Link")
        .with_related(&ENTITY)
        .with_attributes(&["occi.core.source", "occi.core.target"])
});

pub static COMPUTE: Lazy<Kind> = Lazy::new(|| {
    Kind::new(INFRASTRUCTURE_SCHEME, "compute", "Compute Resource")
        .with_related(&RESOURCE)
        .with_attributes(&[
            COMPUTE_ARCHITECTURE,
            COMPUTE_CORES,
            COMPUTE_HOSTNAME,
            COMPUTE_SPEED,
            COMPUTE_MEMORY,
            COMPUTE_STATE,
        ])
        .with_actions(vec![START.clone(), STOP.clone(), RESTART.clone(), SUSPEND.clone()])
        .with_location("/compute/")
});

pub static NETWORK: Lazy<Kind> = Lazy::new(|| {
    Kind::new(INFRASTRUCTURE_SCHEME, "network", "Network Resource")
        .with_related(&RESOURCE)
        .with_attributes(&[NETWORK_VLAN, NETWORK_LABEL, NETWORK_STATE])
        .with_actions(vec![UP.clone(), DOWN.clone()])
        .with_location("/network/")
});

pub static STORAGE: Lazy<Kind> = Lazy::new(|| {
    Kind::new(INFRASTRUCTURE_SCHEME, "storage", "Storage Resource")
        .with_related(&RESOURCE)
        .with_attributes(&[STORAGE_SIZE, STORAGE_STATE])
        .with_actions(vec![
            ONLINE.clone(),
            OFFLINE.clone(),
            BACKUP.clone(),
            SNAPSHOT.clone(),
            RESIZE.clone(),
        ])
        .with_location("/storage/")
});

pub static NETWORKINTERFACE: Lazy<Kind> = Lazy::new(|| {
    Kind::new(INFRASTRUCTURE_SCHEME, "networkinterface", "Network Interface Link")
        .with_related(&LINK)
        .with_attributes(&[NETWORKINTERFACE_INTERFACE, NETWORKINTERFACE_MAC, NETWORKINTERFACE_STATE])
        .with_location("/network/interface/")
});

pub static STORAGELINK: Lazy<Kind> = Lazy::new(|| {
    Kind::new(INFRASTRUCTURE_SCHEME, "storagelink", "Storage Link")
        .with_related(&LINK)
        .with_attributes(&[STORAGELINK_DEVICEID, STORAGELINK_MOUNTPOINT, STORAGELINK_STATE])
        .with_location("/storage/link/")
});

// =============================================================================
// MIXINS
// =============================================================================

pub static IPNETWORK: Lazy<Mixin> = Lazy::new(|| {
    Mixin::new("http://schemas.ogf.org/occi/infrastructure/network#", "ipnetwork", "IP Network Mixin")
        .with_attributes(&[NETWORK_ADDRESS, NETWORK_GATEWAY, NETWORK_ALLOCATION])
        .with_location("/mixin/ipnetwork/")
});

pub static IPNETWORKINTERFACE: Lazy<Mixin> = Lazy::new(|| {
    Mixin::new(
        "http://schemas.ogf.org/occi/infrastructure/networkinterface#",
        "ipnetworkinterface",
        "IP Network Interface Mixin",
    )
    .with_attributes(&[NETWORKINTERFACE_ADDRESS, NETWORKINTERFACE_GATEWAY, NETWORKINTERFACE_ALLOCATION])
    .with_location("/mixin/ipnetworkinterface/")
});

pub static OS_TPL: Lazy<Mixin> = Lazy::new(|| {
    Mixin::new(INFRASTRUCTURE_SCHEME, "os_tpl", "OS Template").with_location("/os_tpl/")
});

pub static RESOURCE_TPL: Lazy<Mixin> = Lazy::new(|| {
    Mixin::new(INFRASTRUCTURE_SCHEME, "resource_tpl", "Resource Template").with_location("/resource_tpl/")
});
