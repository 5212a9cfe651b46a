//! Entities: resources and links.

use std::collections::BTreeMap;

use crate::category::{Action, CategoryId, Kind, Mixin};
use crate::infrastructure::CORE_ID;

/// String-typed attribute map, keyed by dotted names such as
/// `occi.compute.state`.
pub type Attributes = BTreeMap<String, String>;

/// Resource or link specific data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityBody {
    /// Identifiers of the outbound links
    Resource { links: Vec<String> },
    /// Identifiers of both endpoints
    Link { source: String, target: String },
}

/// A resource or a link.
///
/// The kind is fixed at construction. Actions are derived by the owning
/// backend and cannot be set from outside the crate.
#[derive(Debug, Clone)]
pub struct Entity {
    pub identifier: String,
    pub attributes: Attributes,
    kind: Kind,
    mixins: Vec<Mixin>,
    actions: Vec<Action>,
    body: EntityBody,
}

impl Entity {
    /// Create a resource with no links.
    pub fn resource(identifier: impl Into<String>, kind: Kind, mixins: Vec<Mixin>) -> Self {
        Self::with_body(identifier.into(), kind, mixins, EntityBody::Resource { links: Vec::new() })
    }

    /// Create a link between two resources.
    pub fn link(
        identifier: impl Into<String>,
        kind: Kind,
        mixins: Vec<Mixin>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self::with_body(
            identifier.into(),
            kind,
            mixins,
            EntityBody::Link {
                source: source.into(),
                target: target.into(),
            },
        )
    }

    fn with_body(identifier: String, kind: Kind, mixins: Vec<Mixin>, body: EntityBody) -> Self {
        let mut unique: Vec<Mixin> = Vec::with_capacity(mixins.len());
        for mixin in mixins {
            if !unique.contains(&mixin) {
                unique.push(mixin);
            }
        }
        Self {
            identifier,
            attributes: Attributes::new(),
            kind,
            mixins: unique,
            actions: Vec::new(),
            body,
        }
    }

    /// Set an attribute, builder style.
    pub fn with_attribute(mut self, key: &str, value: impl Into<String>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    /// Attached mixins in insertion order.
    pub fn mixins(&self) -> &[Mixin] {
        &self.mixins
    }

    /// Currently legal actions.
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub(crate) fn set_actions(&mut self, actions: Vec<Action>) {
        self.actions = actions;
    }

    pub fn body(&self) -> &EntityBody {
        &self.body
    }

    pub fn is_link(&self) -> bool {
        matches!(self.body, EntityBody::Link { .. })
    }

    /// Outbound link identifiers; empty for links.
    pub fn links(&self) -> &[String] {
        match &self.body {
            EntityBody::Resource { links } => links.as_slice(),
            EntityBody::Link { .. } => &[],
        }
    }

    pub(crate) fn links_mut(&mut self) -> Option<&mut Vec<String>> {
        match &mut self.body {
            EntityBody::Resource { links } => Some(links),
            EntityBody::Link { .. } => None,
        }
    }

    pub fn source(&self) -> Option<&str> {
        match &self.body {
            EntityBody::Link { source, .. } => Some(source),
            EntityBody::Resource { .. } => None,
        }
    }

    pub fn target(&self) -> Option<&str> {
        match &self.body {
            EntityBody::Link { target, .. } => Some(target),
            EntityBody::Resource { .. } => None,
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn set_attr(&mut self, key: &str, value: impl Into<String>) {
        self.attributes.insert(key.to_string(), value.into());
    }

    /// Set an attribute unless the caller already supplied one.
    pub fn set_default_attr(&mut self, key: &str, value: impl Into<String>) {
        self.attributes.entry(key.to_string()).or_insert_with(|| value.into());
    }

    /// The `occi.core.id` attribute, if set.
    pub fn core_id(&self) -> Option<&str> {
        self.attr(CORE_ID)
    }

    pub fn has_mixin(&self, id: &CategoryId) -> bool {
        self.mixins.iter().any(|m| &m.id == id)
    }

    /// Attach a mixin; a no-op if it is already attached.
    pub fn attach_mixin(&mut self, mixin: Mixin) {
        if !self.mixins.contains(&mixin) {
            self.mixins.push(mixin);
        }
    }

    /// Detach a mixin, returning it if it was attached.
    pub fn detach_mixin(&mut self, id: &CategoryId) -> Option<Mixin> {
        let pos = self.mixins.iter().position(|m| &m.id == id)?;
        Some(self.mixins.remove(pos))
    }

    /// Replace every mixin with the same role as `mixin` by `mixin`.
    pub fn swap_mixin(&mut self, mixin: Mixin) {
        self.mixins.retain(|m| !m.has_role_of(&mixin.role));
        self.attach_mixin(mixin);
    }

    /// Whether the action is among the currently legal ones.
    pub fn can(&self, action: &CategoryId) -> bool {
        self.actions.iter().any(|a| &a.id == action)
    }

    /// Whether the kind or any attached mixin declares the action.
    pub fn declares(&self, action: &CategoryId) -> bool {
        self.kind.declares(action) || self.mixins.iter().any(|m| m.declares(action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extensions::{os_template, resource_template};
    use crate::infrastructure::{COMPUTE, NETWORKINTERFACE, START, UP};
    use occi_nova::{Flavor, ImageMeta};

    #[test]
    fn test_resource_and_link_bodies() {
        let vm = Entity::resource("/compute/1", COMPUTE.clone(), vec![]);
        assert!(!vm.is_link());
        assert!(vm.links().is_empty());
        assert_eq!(vm.source(), None);

        let nic = Entity::link("/network/interface/1", NETWORKINTERFACE.clone(), vec![], "/compute/1", "/network/1");
        assert!(nic.is_link());
        assert_eq!(nic.source(), Some("/compute/1"));
        assert_eq!(nic.target(), Some("/network/1"));
    }

    #[test]
    fn test_mixins_keep_insertion_order_without_duplicates() {
        let small = resource_template(&Flavor::new("m1.small", 1, 2048, 20));
        let os = os_template(&ImageMeta::new("img", "cirros"));
        let vm = Entity::resource("vm", COMPUTE.clone(), vec![small.clone(), os.clone(), small.clone()]);

        let terms: Vec<&str> = vm.mixins().iter().map(|m| m.id.term.as_str()).collect();
        assert_eq!(terms, vec!["m1.small", "cirros"]);
    }

    #[test]
    fn test_swap_mixin_replaces_same_role() {
        let small = resource_template(&Flavor::new("m1.small", 1, 2048, 20));
        let large = resource_template(&Flavor::new("m1.large", 4, 8192, 80));
        let os = os_template(&ImageMeta::new("img", "cirros"));
        let mut vm = Entity::resource("vm", COMPUTE.clone(), vec![small.clone(), os.clone()]);

        vm.swap_mixin(large.clone());

        assert!(!vm.has_mixin(&small.id));
        assert!(vm.has_mixin(&large.id));
        assert!(vm.has_mixin(&os.id));
    }

    #[test]
    fn test_declared_versus_legal_actions() {
        let mut vm = Entity::resource("vm", COMPUTE.clone(), vec![]);
        assert!(vm.declares(&START.id));
        assert!(!vm.declares(&UP.id));
        assert!(!vm.can(&START.id));

        vm.set_actions(vec![START.clone()]);
        assert!(vm.can(&START.id));
    }

    #[test]
    fn test_default_attr_keeps_supplied_value() {
        let mut vm = Entity::resource("vm", COMPUTE.clone(), vec![]).with_attribute("a", "given");
        vm.set_default_attr("a", "default");
        vm.set_default_attr("b", "default");
        assert_eq!(vm.attr("a"), Some("given"));
        assert_eq!(vm.attr("b"), Some("default"));
    }
}
