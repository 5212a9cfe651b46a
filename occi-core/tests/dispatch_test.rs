//! End-to-end tests driving the dispatcher against the mock cloud.

use std::sync::Arc;
use std::time::Duration;

use occi_core::backends::ComputeSettings;
use occi_core::catalog;
use occi_core::extensions::{
    security_group, CONSOLE_LINK, OS_CHG_PWD, OS_REBUILD, OS_TEMPLATE_SCHEME, RESOURCE_TEMPLATE_SCHEME,
    SECURITY_GROUP_SCHEME, SSH_CONSOLE, TCP, TCP_ATTRIBUTE,
};
use occi_core::infrastructure::{
    COMPUTE, IPNETWORK, NETWORK, NETWORKINTERFACE, RESTART, START, STOP, STORAGE, STORAGELINK, SUSPEND,
};
use occi_core::{Action, Attributes, Category, CategoryId, Dispatcher, Entity, Extras, Mixin, OcciError};
use occi_nova::{ComputeApi, MockCloud, NovaContext, NovaError};

const DEFAULT_NETWORK: &str = "/network/DEFAULT_NETWORK";

struct Harness {
    cloud: Arc<MockCloud>,
    extras: Extras,
    dispatcher: Dispatcher,
}

async fn harness() -> Harness {
    harness_with(ComputeSettings::default()).await
}

async fn harness_with(settings: ComputeSettings) -> Harness {
    let registry = Arc::new(occi_core::Registry::new());
    catalog::register_infrastructure(&registry, settings.clone()).unwrap();

    let cloud = Arc::new(MockCloud::new());
    let extras = Extras::from_cloud(NovaContext::new("fake", "fake"), registry.clone(), cloud.clone());
    catalog::register_templates(&registry, &extras).await.unwrap();

    let dispatcher = Dispatcher::new(registry);
    catalog::create_default_network(&dispatcher, &extras, &settings.default_network)
        .await
        .unwrap();

    Harness { cloud, extras, dispatcher }
}

impl Harness {
    fn mixin(&self, scheme: &str, term: &str) -> Mixin {
        match self.dispatcher.registry().get_category(&CategoryId::new(scheme, term)).unwrap() {
            Category::Mixin(m) => m,
            other => panic!("not a mixin: {:?}", other),
        }
    }

    fn flavor(&self, name: &str) -> Mixin {
        self.mixin(RESOURCE_TEMPLATE_SCHEME, name)
    }

    fn image(&self, name: &str) -> Mixin {
        self.mixin(OS_TEMPLATE_SCHEME, name)
    }

    async fn create_vm(&self) -> Entity {
        let vm = Entity::resource(
            "vm-1",
            COMPUTE.clone(),
            vec![self.flavor("m1.small"), self.image("cirros-0.3.0-x86_64-uec")],
        );
        self.dispatcher.create(vm, &self.extras).await.unwrap()
    }

    async fn act(&self, id: &str, action: &Action, method: Option<&str>) -> Result<Entity, OcciError> {
        let mut params = Attributes::new();
        if let Some(method) = method {
            params.insert("method".to_string(), method.to_string());
        }
        self.dispatcher.action(id, action, &params, &self.extras).await
    }

    fn links_of_kind(&self, entity: &Entity, kind: &CategoryId) -> Vec<Entity> {
        entity
            .links()
            .iter()
            .map(|id| self.dispatcher.registry().get_resource(id).unwrap())
            .filter(|l| &l.kind().id == kind)
            .collect()
    }
}

fn action_ids(entity: &Entity) -> Vec<CategoryId> {
    entity.actions().iter().map(|a| a.id.clone()).collect()
}

fn ids(actions: &[&Action]) -> Vec<CategoryId> {
    actions.iter().map(|a| a.id.clone()).collect()
}

// =============================================================================
// Create
// =============================================================================

#[tokio::test]
async fn test_create_compute_describes_instance() {
    let h = harness().await;
    let vm = h.create_vm().await;

    assert_eq!(vm.attr("occi.compute.state"), Some("active"));
    assert_eq!(action_ids(&vm), ids(&[&*STOP, &*SUSPEND, &*RESTART]));
    assert_eq!(vm.attr("occi.compute.cores"), Some("1"));
    assert_eq!(vm.attr("occi.compute.memory"), Some("2.0"));
    assert_eq!(vm.attr("occi.compute.speed"), Some("0.0"));
    assert_eq!(vm.attr("occi.compute.architecture"), Some("x64"));
    assert!(vm.core_id().is_some());

    let nics = h.links_of_kind(&vm, &NETWORKINTERFACE.id);
    assert_eq!(nics.len(), 1);
    assert_eq!(nics[0].target(), Some(DEFAULT_NETWORK));
    assert_eq!(nics[0].attr("occi.networkinterface.address"), Some("10.0.0.2"));
    assert_eq!(nics[0].attr("occi.networkinterface.allocation"), Some("dhcp"));
    assert_eq!(nics[0].attr("occi.networkinterface.state"), Some("active"));
    assert!(nics[0].attr("occi.networkinterface.mac").unwrap().starts_with("fa:16:3e:"));

    let consoles = h.links_of_kind(&vm, &CONSOLE_LINK.id);
    assert_eq!(consoles.len(), 2);
    let ssh = consoles
        .iter()
        .map(|l| h.dispatcher.registry().get_resource(l.target().unwrap()).unwrap())
        .find(|c| c.kind() == &*SSH_CONSOLE)
        .unwrap();
    assert_eq!(ssh.attr("org.openstack.compute.console.ssh"), Some("ssh://10.0.0.2:22"));
}

#[tokio::test]
async fn test_create_without_templates_calls_nothing() {
    let h = harness().await;
    let before = h.cloud.calls();

    let vm = Entity::resource("vm-1", COMPUTE.clone(), vec![]);
    let err = h.dispatcher.create(vm, &h.extras).await.unwrap_err();

    assert!(matches!(err, OcciError::BadRequest(_)));
    assert_eq!(h.cloud.calls(), before);
    assert!(!h.dispatcher.registry().contains("vm-1").unwrap());
}

#[tokio::test]
async fn test_create_quota_carries_retry_hint() {
    let h = harness().await;
    h.cloud.fail_next(
        "create",
        NovaError::QuotaExceeded {
            code: "OnsetFileLimitExceeded".to_string(),
            message: "too many files".to_string(),
            retry_after_secs: Some(30),
        },
    );

    let vm = Entity::resource("vm-1", COMPUTE.clone(), vec![h.image("cirros-0.3.0-x86_64-uec")]);
    let err = h.dispatcher.create(vm, &h.extras).await.unwrap_err();

    assert_eq!(err.status_code(), 413);
    assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));
    assert!(err.to_string().contains("Personality file limit exceeded"));
    assert!(!h.dispatcher.registry().contains("vm-1").unwrap());
}

#[tokio::test]
async fn test_create_unknown_flavor_is_bad_request() {
    let h = harness().await;
    h.cloud.fail_next("create", NovaError::FlavorNotFound("m1.small".to_string()));

    let vm = Entity::resource("vm-1", COMPUTE.clone(), vec![h.image("cirros-0.3.0-x86_64-uec")]);
    let err = h.dispatcher.create(vm, &h.extras).await.unwrap_err();

    assert!(matches!(err, OcciError::BadRequest(msg) if msg == "Invalid flavor provided"));
}

#[tokio::test]
async fn test_tcp_mixin_scoped_to_compute() {
    let h = harness().await;

    let vm = Entity::resource(
        "vm-1",
        COMPUTE.clone(),
        vec![TCP.clone(), h.image("cirros-0.3.0-x86_64-uec")],
    );
    let vm = h.dispatcher.create(vm, &h.extras).await.unwrap();
    assert_eq!(vm.attr(TCP_ATTRIBUTE), Some("true"));

    let before = h.cloud.calls();
    let net = Entity::resource("net-2", NETWORK.clone(), vec![TCP.clone()]);
    let err = h.dispatcher.create(net, &h.extras).await.unwrap_err();
    assert!(matches!(err, OcciError::BadRequest(_)));
    assert!(!h.dispatcher.registry().contains("net-2").unwrap());
    assert_eq!(h.cloud.calls(), before);
}

// =============================================================================
// Retrieve
// =============================================================================

#[tokio::test]
async fn test_retrieve_is_idempotent() {
    let h = harness().await;
    h.create_vm().await;

    let first = h.dispatcher.retrieve("vm-1", &h.extras).await.unwrap();
    let second = h.dispatcher.retrieve("vm-1", &h.extras).await.unwrap();

    assert_eq!(first.attributes, second.attributes);
    assert_eq!(action_ids(&first), action_ids(&second));
    assert_eq!(first.links(), second.links());
}

#[tokio::test]
async fn test_default_network_link_is_not_duplicated() {
    let h = harness().await;
    h.create_vm().await;

    h.dispatcher.retrieve("vm-1", &h.extras).await.unwrap();
    let vm = h.dispatcher.retrieve("vm-1", &h.extras).await.unwrap();

    assert_eq!(h.links_of_kind(&vm, &NETWORKINTERFACE.id).len(), 1);
    assert_eq!(h.dispatcher.registry().links_referencing(DEFAULT_NETWORK).unwrap().len(), 1);
    assert_eq!(vm.links().len(), 3);
}

#[tokio::test]
async fn test_retrieve_reflects_external_changes() {
    let h = harness().await;
    let vm = h.create_vm().await;
    let uuid = vm.core_id().unwrap().to_string();

    h.cloud.pause(&h.extras.nova_ctx, &uuid).await.unwrap();
    let vm = h.dispatcher.retrieve("vm-1", &h.extras).await.unwrap();

    assert_eq!(vm.attr("occi.compute.state"), Some("suspended"));
    assert_eq!(action_ids(&vm), ids(&[&*START]));
}

// =============================================================================
// Actions
// =============================================================================

#[tokio::test]
async fn test_stop_then_start() {
    let h = harness().await;
    h.create_vm().await;

    let vm = h.act("vm-1", &STOP, None).await.unwrap();
    assert_eq!(vm.attr("occi.compute.state"), Some("inactive"));
    assert_eq!(action_ids(&vm), ids(&[&*START]));

    let vm = h.act("vm-1", &START, None).await.unwrap();
    assert_eq!(vm.attr("occi.compute.state"), Some("active"));
    assert_eq!(action_ids(&vm), ids(&[&*STOP, &*SUSPEND, &*RESTART]));

    let calls = h.cloud.calls();
    assert!(calls.contains(&"suspend".to_string()));
    assert!(calls.contains(&"resume".to_string()));
}

#[tokio::test]
async fn test_start_while_active_is_not_applicable() {
    let h = harness().await;
    h.create_vm().await;
    let stored = h.dispatcher.registry().get_resource("vm-1").unwrap();

    let err = h.act("vm-1", &START, None).await.unwrap_err();

    assert!(matches!(err, OcciError::ActionNotApplicable { .. }));
    let after = h.dispatcher.registry().get_resource("vm-1").unwrap();
    assert_eq!(after.attributes, stored.attributes);
    let calls = h.cloud.calls();
    assert!(!calls.contains(&"resume".to_string()));
    assert!(!calls.contains(&"unpause".to_string()));
}

#[tokio::test]
async fn test_suspend_then_start_unpauses() {
    let h = harness().await;
    h.create_vm().await;

    let vm = h.act("vm-1", &SUSPEND, None).await.unwrap();
    assert_eq!(vm.attr("occi.compute.state"), Some("suspended"));

    h.act("vm-1", &START, None).await.unwrap();
    assert!(h.cloud.calls().contains(&"unpause".to_string()));
}

#[tokio::test]
async fn test_stale_actions_never_authorize() {
    let h = harness().await;
    let vm = h.create_vm().await;
    assert!(vm.can(&STOP.id));

    // Stopped behind the registry's back.
    h.cloud.suspend(&h.extras.nova_ctx, vm.core_id().unwrap()).await.unwrap();

    let err = h.act("vm-1", &STOP, None).await.unwrap_err();
    assert!(matches!(err, OcciError::ActionNotApplicable { .. }));
}

#[tokio::test]
async fn test_instance_actions_not_applicable() {
    let h = harness().await;
    h.create_vm().await;

    for action in [&*OS_CHG_PWD, &*OS_REBUILD] {
        let err = h.act("vm-1", action, None).await.unwrap_err();
        assert!(matches!(err, OcciError::ActionNotApplicable { .. }));
    }
    let vm = h.dispatcher.retrieve("vm-1", &h.extras).await.unwrap();
    assert_eq!(vm.attr("occi.compute.state"), Some("active"));
}

#[tokio::test]
async fn test_restart_is_transient_until_complete() {
    let h = harness().await;
    let vm = h.create_vm().await;
    let uuid = vm.core_id().unwrap().to_string();

    let err = h.act("vm-1", &RESTART, None).await.unwrap_err();
    assert!(matches!(err, OcciError::BadRequest(_)));

    let vm = h.act("vm-1", &RESTART, Some("graceful")).await.unwrap();
    assert_eq!(vm.attr("occi.compute.state"), Some("active"));

    let vm = h.dispatcher.retrieve("vm-1", &h.extras).await.unwrap();
    assert_eq!(vm.attr("occi.compute.state"), Some("inactive"));
    assert!(vm.actions().is_empty());

    h.cloud.complete_task(&uuid).unwrap();
    let vm = h.dispatcher.retrieve("vm-1", &h.extras).await.unwrap();
    assert_eq!(vm.attr("occi.compute.state"), Some("active"));
}

#[tokio::test]
async fn test_collaborator_conflict_leaves_state() {
    let h = harness().await;
    h.create_vm().await;
    h.cloud.fail_next("suspend", NovaError::InstanceInvalidState("task in progress".to_string()));

    let err = h.act("vm-1", &STOP, None).await.unwrap_err();

    assert!(matches!(err, OcciError::Conflict(_)));
    assert_eq!(err.status_code(), 409);
    let stored = h.dispatcher.registry().get_resource("vm-1").unwrap();
    assert_eq!(stored.attr("occi.compute.state"), Some("active"));
}

#[tokio::test]
async fn test_concurrent_starts_are_serialised() {
    let h = harness().await;
    h.create_vm().await;
    h.act("vm-1", &STOP, None).await.unwrap();

    let (a, b) = tokio::join!(h.act("vm-1", &START, None), h.act("vm-1", &START, None));

    let outcomes = [a, b];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(OcciError::ActionNotApplicable { .. }))));
}

// =============================================================================
// Update
// =============================================================================

#[tokio::test]
async fn test_resize_and_rebuild_together_rejected() {
    let h = harness().await;
    h.create_vm().await;

    let change = Entity::resource(
        "vm-1",
        COMPUTE.clone(),
        vec![h.flavor("m1.large"), h.image("ubuntu-12.04-server")],
    );
    let err = h.dispatcher.update("vm-1", &change, &h.extras).await.unwrap_err();

    assert!(matches!(err, OcciError::BadRequest(_)));
    let calls = h.cloud.calls();
    assert!(!calls.contains(&"resize".to_string()));
    assert!(!calls.contains(&"rebuild".to_string()));
}

#[tokio::test]
async fn test_resize_swaps_resource_template() {
    let h = harness().await;
    let vm = h.create_vm().await;
    let uuid = vm.core_id().unwrap().to_string();

    let change = Entity::resource("vm-1", COMPUTE.clone(), vec![h.flavor("m1.large")]);
    let vm = h.dispatcher.update("vm-1", &change, &h.extras).await.unwrap();

    assert!(vm.has_mixin(&h.flavor("m1.large").id));
    assert!(!vm.has_mixin(&h.flavor("m1.small").id));
    assert_eq!(vm.attr("occi.compute.state"), Some("inactive"));
    assert!(vm.actions().is_empty());

    h.cloud.complete_task(&uuid).unwrap();
    let vm = h.dispatcher.retrieve("vm-1", &h.extras).await.unwrap();
    assert_eq!(vm.attr("occi.compute.cores"), Some("4"));
    assert_eq!(vm.attr("occi.compute.state"), Some("active"));
}

#[tokio::test]
async fn test_resize_to_same_flavor_is_bad_request() {
    let h = harness().await;
    h.create_vm().await;
    h.cloud.fail_next("resize", NovaError::CannotResizeToSameSize("m1.large".to_string()));

    let change = Entity::resource("vm-1", COMPUTE.clone(), vec![h.flavor("m1.large")]);
    let err = h.dispatcher.update("vm-1", &change, &h.extras).await.unwrap_err();

    assert!(matches!(err, OcciError::BadRequest(msg) if msg == "Resize requires a change in size"));
    let stored = h.dispatcher.registry().get_resource("vm-1").unwrap();
    assert!(stored.has_mixin(&h.flavor("m1.small").id));
}

#[tokio::test]
async fn test_rebuild_swaps_os_template() {
    let h = harness().await;
    h.create_vm().await;

    let change = Entity::resource("vm-1", COMPUTE.clone(), vec![h.image("ubuntu-12.04-server")]);
    let vm = h.dispatcher.update("vm-1", &change, &h.extras).await.unwrap();

    assert!(vm.has_mixin(&h.image("ubuntu-12.04-server").id));
    assert!(!vm.has_mixin(&h.image("cirros-0.3.0-x86_64-uec").id));
    assert!(h.cloud.calls().contains(&"rebuild".to_string()));
    assert!(vm.actions().is_empty());
}

#[tokio::test]
async fn test_update_attributes() {
    let h = harness().await;
    h.create_vm().await;

    let titled = Entity::resource("vm-1", COMPUTE.clone(), vec![]).with_attribute("occi.core.title", "web server");
    let vm = h.dispatcher.update("vm-1", &titled, &h.extras).await.unwrap();
    assert_eq!(vm.attr("occi.core.title"), Some("web server"));

    let cores = Entity::resource("vm-1", COMPUTE.clone(), vec![]).with_attribute("occi.compute.cores", "8");
    let err = h.dispatcher.update("vm-1", &cores, &h.extras).await.unwrap_err();
    assert!(matches!(err, OcciError::BadRequest(_)));
}

#[tokio::test]
async fn test_security_group_change_is_recorded() {
    let h = harness().await;
    h.create_vm().await;
    catalog::register_security_group(h.dispatcher.registry(), "web").unwrap();

    let group = h.mixin(SECURITY_GROUP_SCHEME, "web");
    let change = Entity::resource("vm-1", COMPUTE.clone(), vec![group.clone()]);
    let vm = h.dispatcher.update("vm-1", &change, &h.extras).await.unwrap();

    assert!(vm.has_mixin(&group.id));
}

#[tokio::test]
async fn test_unregistered_mixin_is_rejected() {
    let h = harness().await;
    h.create_vm().await;

    let change = Entity::resource("vm-1", COMPUTE.clone(), vec![security_group("never-registered")]);
    let err = h.dispatcher.update("vm-1", &change, &h.extras).await.unwrap_err();
    assert!(matches!(err, OcciError::NotRegistered(_)));

    let stored = h.dispatcher.registry().get_resource("vm-1").unwrap();
    assert!(!stored.has_mixin(&security_group("never-registered").id));
    h.dispatcher.delete("vm-1", &h.extras).await.unwrap();
}

#[tokio::test]
async fn test_client_built_template_uses_registered_flavor() {
    let h = harness().await;
    let vm = h.create_vm().await;
    let uuid = vm.core_id().unwrap().to_string();

    // Same identifier as the registered flavor, none of its definition.
    let bare = Mixin::new(RESOURCE_TEMPLATE_SCHEME, "m1.large", "x");
    let change = Entity::resource("vm-1", COMPUTE.clone(), vec![bare]);
    let vm = h.dispatcher.update("vm-1", &change, &h.extras).await.unwrap();

    assert!(h.cloud.calls().contains(&"resize".to_string()));
    assert!(vm.has_mixin(&h.flavor("m1.large").id));
    h.cloud.complete_task(&uuid).unwrap();
    let vm = h.dispatcher.retrieve("vm-1", &h.extras).await.unwrap();
    assert_eq!(vm.attr("occi.compute.cores"), Some("4"));
}

// =============================================================================
// Replace
// =============================================================================

#[tokio::test]
async fn test_replace_compute_title() {
    let h = harness().await;
    h.create_vm().await;

    let titled = Entity::resource("vm-1", COMPUTE.clone(), vec![]).with_attribute("occi.core.title", "db");
    let vm = h.dispatcher.replace("vm-1", &titled, &h.extras).await.unwrap();

    assert_eq!(vm.attr("occi.core.title"), Some("db"));
    assert_eq!(vm.attr("occi.compute.state"), Some("active"));
    assert!(vm.has_mixin(&h.flavor("m1.small").id));
}

#[tokio::test]
async fn test_replace_swaps_resource_template() {
    let h = harness().await;
    h.create_vm().await;

    let change = Entity::resource("vm-1", COMPUTE.clone(), vec![h.flavor("m1.large")]);
    let vm = h.dispatcher.replace("vm-1", &change, &h.extras).await.unwrap();

    assert!(h.cloud.calls().contains(&"resize".to_string()));
    assert!(vm.has_mixin(&h.flavor("m1.large").id));
    assert!(!vm.has_mixin(&h.flavor("m1.small").id));
    assert_eq!(vm.attr("occi.compute.state"), Some("inactive"));
}

#[tokio::test]
async fn test_replace_network_keeps_read_only_attributes() {
    let h = harness().await;
    let net = Entity::resource("/network/net-2", NETWORK.clone(), vec![]).with_attribute("occi.core.id", "net-2");
    h.dispatcher.create(net, &h.extras).await.unwrap();

    let change =
        Entity::resource("/network/net-2", NETWORK.clone(), vec![]).with_attribute("occi.network.label", "public");
    let net = h.dispatcher.replace("/network/net-2", &change, &h.extras).await.unwrap();

    assert_eq!(net.attr("occi.network.label"), Some("public"));
    assert_eq!(net.attr("occi.network.state"), Some("inactive"));
    assert_eq!(net.attr("occi.core.id"), Some("net-2"));
    assert_eq!(net.attr("occi.network.vlan"), None);

    let state =
        Entity::resource("/network/net-2", NETWORK.clone(), vec![]).with_attribute("occi.network.state", "active");
    let err = h.dispatcher.replace("/network/net-2", &state, &h.extras).await.unwrap_err();
    assert!(matches!(err, OcciError::BadRequest(_)));
    let stored = h.dispatcher.registry().get_resource("/network/net-2").unwrap();
    assert_eq!(stored.attr("occi.network.state"), Some("inactive"));
}

#[tokio::test]
async fn test_network_mixin_change_is_bad_request() {
    let h = harness().await;
    let net = Entity::resource("/network/net-2", NETWORK.clone(), vec![]);
    h.dispatcher.create(net, &h.extras).await.unwrap();

    let change = Entity::resource("/network/net-2", NETWORK.clone(), vec![IPNETWORK.clone()]);
    let err = h.dispatcher.update("/network/net-2", &change, &h.extras).await.unwrap_err();
    assert!(matches!(err, OcciError::BadRequest(_)));
    let err = h.dispatcher.replace("/network/net-2", &change, &h.extras).await.unwrap_err();
    assert!(matches!(err, OcciError::BadRequest(_)));

    let stored = h.dispatcher.registry().get_resource("/network/net-2").unwrap();
    assert!(stored.mixins().is_empty());
}

// =============================================================================
// Delete
// =============================================================================

#[tokio::test]
async fn test_delete_removes_links_and_consoles() {
    let h = harness().await;
    let vm = h.create_vm().await;
    let uuid = vm.core_id().unwrap().to_string();

    h.dispatcher.delete("vm-1", &h.extras).await.unwrap();

    assert_eq!(h.dispatcher.registry().resource_keys().unwrap(), vec![DEFAULT_NETWORK.to_string()]);
    assert!(h.cloud.calls().contains(&"delete".to_string()));
    assert!(matches!(
        h.cloud.get(&h.extras.nova_ctx, &uuid).await,
        Err(NovaError::InstanceNotFound(_))
    ));
}

#[tokio::test]
async fn test_soft_delete_when_reclaiming() {
    let h = harness_with(ComputeSettings {
        reclaim_instance_interval: Duration::from_secs(3600),
        ..Default::default()
    })
    .await;
    h.create_vm().await;

    h.dispatcher.delete("vm-1", &h.extras).await.unwrap();

    let calls = h.cloud.calls();
    assert!(calls.contains(&"soft_delete".to_string()));
    assert!(!calls.contains(&"delete".to_string()));
    assert!(!h.dispatcher.registry().contains("vm-1").unwrap());
}

#[tokio::test]
async fn test_deleting_storage_detaches_links() {
    let h = harness().await;
    h.create_vm().await;

    let disk = Entity::resource("disk-1", STORAGE.clone(), vec![]);
    h.dispatcher.create(disk, &h.extras).await.unwrap();
    let attachment = Entity::link("att-1", STORAGELINK.clone(), vec![], "vm-1", "disk-1");
    h.dispatcher.create(attachment, &h.extras).await.unwrap();
    assert!(h
        .dispatcher
        .registry()
        .get_resource("vm-1")
        .unwrap()
        .links()
        .contains(&"att-1".to_string()));

    h.dispatcher.delete("disk-1", &h.extras).await.unwrap();

    let vm = h.dispatcher.registry().get_resource("vm-1").unwrap();
    assert!(!vm.links().contains(&"att-1".to_string()));
    assert!(!h.dispatcher.registry().contains("att-1").unwrap());
}

#[tokio::test]
async fn test_instance_gone_upstream_is_not_found() {
    let h = harness().await;
    let vm = h.create_vm().await;
    h.cloud.delete(&h.extras.nova_ctx, vm.core_id().unwrap()).await.unwrap();

    let err = h.dispatcher.retrieve("vm-1", &h.extras).await.unwrap_err();
    assert_eq!(err.status_code(), 404);
}
