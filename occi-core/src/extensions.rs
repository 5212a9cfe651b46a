//! OpenStack-specific categories: templates, credentials, security groups,
//! consoles and the trusted compute pool mixin.

use once_cell::sync::Lazy;

use occi_nova::{Flavor, ImageMeta};

use crate::category::{Action, Kind, Mixin, MixinRole};
use crate::infrastructure::{LINK, OS_TPL, RESOURCE, RESOURCE_TPL};

pub const OS_TEMPLATE_SCHEME: &str = "http://schemas.openstack.org/template/os#";
pub const RESOURCE_TEMPLATE_SCHEME: &str = "http://schemas.openstack.org/template/resource#";
pub const SECURITY_GROUP_SCHEME: &str = "http://schemas.ogf.org/occi/infrastructure/security/group#";
pub const DEFAULT_SECURITY_GROUP: &str = "default";
pub const INSTANCE_ACTION_SCHEME: &str = "http://schemas.openstack.org/instance/action#";

const CREDENTIALS_SCHEME: &str = "http://schemas.openstack.org/instance/credentials#";
const CONSOLE_SCHEME: &str = "http://schemas.openstack.org/occi/infrastructure/compute#";

pub const PUBLIC_KEY_NAME: &str = "org.openstack.credentials.publickey.name";
pub const PUBLIC_KEY_DATA: &str = "org.openstack.credentials.publickey.data";
pub const ADMIN_PASSWORD: &str = "org.openstack.credentials.admin_pwd";
pub const TCP_ATTRIBUTE: &str = "eu.fi-ware.compute.tcp";
pub const CONSOLE_SSH: &str = "org.openstack.compute.console.ssh";
pub const CONSOLE_VNC: &str = "org.openstack.compute.console.vnc";

pub static OS_KEY_PAIR_EXT: Lazy<Mixin> = Lazy::new(|| {
    Mixin::new(CREDENTIALS_SCHEME, "public_key", "OS contextualization mixin")
        .with_attributes(&[PUBLIC_KEY_NAME, PUBLIC_KEY_DATA])
        .with_location("/mixin/public_key/")
});

pub static OS_ADMIN_PWD_EXT: Lazy<Mixin> = Lazy::new(|| {
    Mixin::new(CREDENTIALS_SCHEME, "admin_pwd", "OS admin password mixin")
        .with_attributes(&[ADMIN_PASSWORD])
        .with_location("/mixin/admin_pwd/")
});

pub static TCP: Lazy<Mixin> = Lazy::new(|| {
    Mixin::new(
        "http://schemas.fi-ware.eu/occi/infrastructure/compute#",
        "tcp",
        "Trusted Compute Pool",
    )
    .with_attributes(&[TCP_ATTRIBUTE])
    .with_location("/mixin/tcp/")
});

// Nova instance actions. Advertised for discovery; no compute state
// declares them, so triggering one is rejected as not applicable.
pub static OS_CHG_PWD: Lazy<Action> = Lazy::new(|| {
    Action::new(INSTANCE_ACTION_SCHEME, "chg_pwd", "Change the admin password").with_attributes(&["method"])
});

pub static OS_REBUILD: Lazy<Action> = Lazy::new(|| {
    Action::new(INSTANCE_ACTION_SCHEME, "rebuild", "Rebuild the virtual machine").with_attributes(&["method"])
});

pub static OS_REVERT_RESIZE: Lazy<Action> = Lazy::new(|| {
    Action::new(INSTANCE_ACTION_SCHEME, "revert_resize", "Revert the last resize").with_attributes(&["method"])
});

pub static OS_CONFIRM_RESIZE: Lazy<Action> = Lazy::new(|| {
    Action::new(INSTANCE_ACTION_SCHEME, "confirm_resize", "Confirm the last resize").with_attributes(&["method"])
});

pub static SSH_CONSOLE: Lazy<Kind> = Lazy::new(|| {
    Kind::new(CONSOLE_SCHEME, "ssh_console", "SSH console")
        .with_related(&RESOURCE)
        .with_attributes(&[CONSOLE_SSH])
        .with_location("/console/ssh/")
});

pub static VNC_CONSOLE: Lazy<Kind> = Lazy::new(|| {
    Kind::new(CONSOLE_SCHEME, "vnc_console", "VNC console")
        .with_related(&RESOURCE)
        .with_attributes(&[CONSOLE_VNC])
        .with_location("/console/vnc/")
});

pub static CONSOLE_LINK: Lazy<Kind> = Lazy::new(|| {
    Kind::new(CONSOLE_SCHEME, "console", "Console link")
        .with_related(&LINK)
        .with_location("/console/link/")
});

/// Resource template for a flavor; the term is the flavor name.
pub fn resource_template(flavor: &Flavor) -> Mixin {
    Mixin::new(
        RESOURCE_TEMPLATE_SCHEME,
        &flavor.name,
        &format!("Flavor: {}", flavor.name),
    )
    .with_related(&RESOURCE_TPL)
    .with_location(&format!("/{}/", flavor.name))
    .with_role(MixinRole::ResourceTemplate)
}

/// OS template for a bootable image; the term is the image name with
/// spaces replaced.
pub fn os_template(image: &ImageMeta) -> Mixin {
    let term = image.name.replace(' ', "_");
    Mixin::new(OS_TEMPLATE_SCHEME, &term, &format!("Image: {}", image.name))
        .with_related(&OS_TPL)
        .with_location(&format!("/{}/", term))
        .with_role(MixinRole::OsTemplate {
            image_id: image.id.clone(),
        })
}

/// Mixin for a named security group.
pub fn security_group(name: &str) -> Mixin {
    Mixin::new(SECURITY_GROUP_SCHEME, name, &format!("Security group: {}", name))
        .with_location(&format!("/security/group/{}/", name))
        .with_role(MixinRole::SecurityGroup)
}
