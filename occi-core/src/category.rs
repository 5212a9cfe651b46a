//! Kind, mixin and action definitions.
//!
//! All three share the `(scheme, term)` identity and compare by value.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// The `(scheme, term)` identity shared by every category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CategoryId {
    /// Namespace URI, ending in `#`
    pub scheme: String,
    /// Short name within the scheme
    pub term: String,
}

impl CategoryId {
    pub fn new(scheme: impl Into<String>, term: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            term: term.into(),
        }
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.scheme, self.term)
    }
}

// =============================================================================
// ACTION
// =============================================================================

/// An invocable operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub id: CategoryId,
    pub title: String,
    /// Expected parameter names, e.g. `method`
    pub attributes: BTreeSet<String>,
}

impl Action {
    pub fn new(scheme: &str, term: &str, title: &str) -> Self {
        Self {
            id: CategoryId::new(scheme, term),
            title: title.to_string(),
            attributes: BTreeSet::new(),
        }
    }

    pub fn with_attributes(mut self, names: &[&str]) -> Self {
        self.attributes.extend(names.iter().map(|n| n.to_string()));
        self
    }
}

impl PartialEq for Action {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Action {}

// =============================================================================
// KIND
// =============================================================================

/// The primary type of an entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Kind {
    pub id: CategoryId,
    pub title: String,
    /// Parent kind
    pub related: Option<CategoryId>,
    pub attributes: BTreeSet<String>,
    pub actions: Vec<Action>,
    /// Path prefix entities of this kind live under, e.g. `/compute/`
    pub location: String,
}

impl Kind {
    pub fn new(scheme: &str, term: &str, title: &str) -> Self {
        Self {
            id: CategoryId::new(scheme, term),
            title: title.to_string(),
            related: None,
            attributes: BTreeSet::new(),
            actions: Vec::new(),
            location: String::new(),
        }
    }

    pub fn with_related(mut self, parent: &Kind) -> Self {
        self.related = Some(parent.id.clone());
        self
    }

    pub fn with_attributes(mut self, names: &[&str]) -> Self {
        self.attributes.extend(names.iter().map(|n| n.to_string()));
        self
    }

    pub fn with_actions(mut self, actions: Vec<Action>) -> Self {
        self.actions = actions;
        self
    }

    pub fn with_location(mut self, location: &str) -> Self {
        self.location = location.to_string();
        self
    }

    /// Whether this kind declares the action.
    pub fn declares(&self, action: &CategoryId) -> bool {
        self.actions.iter().any(|a| &a.id == action)
    }
}

impl PartialEq for Kind {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Kind {}

// =============================================================================
// MIXIN
// =============================================================================

/// What a mixin means to the compute backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MixinRole {
    /// No special meaning
    #[default]
    Plain,
    /// A flavor; the term is the flavor name
    ResourceTemplate,
    /// A bootable image
    OsTemplate { image_id: String },
    /// A security group; the term is the group name
    SecurityGroup,
}

/// An attachable capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mixin {
    pub id: CategoryId,
    pub title: String,
    pub related: Vec<CategoryId>,
    pub attributes: BTreeSet<String>,
    pub actions: Vec<Action>,
    pub location: String,
    pub role: MixinRole,
}

impl Mixin {
    pub fn new(scheme: &str, term: &str, title: &str) -> Self {
        Self {
            id: CategoryId::new(scheme, term),
            title: title.to_string(),
            related: Vec::new(),
            attributes: BTreeSet::new(),
            actions: Vec::new(),
            location: String::new(),
            role: MixinRole::Plain,
        }
    }

    pub fn with_related(mut self, parent: &Mixin) -> Self {
        self.related.push(parent.id.clone());
        self
    }

    pub fn with_attributes(mut self, names: &[&str]) -> Self {
        self.attributes.extend(names.iter().map(|n| n.to_string()));
        self
    }

    pub fn with_location(mut self, location: &str) -> Self {
        self.location = location.to_string();
        self
    }

    pub fn with_role(mut self, role: MixinRole) -> Self {
        self.role = role;
        self
    }

    pub fn declares(&self, action: &CategoryId) -> bool {
        self.actions.iter().any(|a| &a.id == action)
    }

    /// Whether the mixin's role is the same variant as `role`.
    pub fn has_role_of(&self, role: &MixinRole) -> bool {
        std::mem::discriminant(&self.role) == std::mem::discriminant(role)
    }
}

impl PartialEq for Mixin {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Mixin {}

/// A mixin change requested by an update, classified by role.
#[derive(Debug, Clone)]
pub enum MixinChange<'a> {
    /// Resize to the flavor named by the mixin term
    ResourceTemplate(&'a Mixin),
    /// Rebuild from the image behind the mixin
    OsTemplate { mixin: &'a Mixin, image_id: &'a str },
    SecurityGroup(&'a Mixin),
    Unknown(&'a Mixin),
}

impl<'a> From<&'a Mixin> for MixinChange<'a> {
    fn from(mixin: &'a Mixin) -> Self {
        match &mixin.role {
            MixinRole::ResourceTemplate => MixinChange::ResourceTemplate(mixin),
            MixinRole::OsTemplate { image_id } => MixinChange::OsTemplate { mixin, image_id },
            MixinRole::SecurityGroup => MixinChange::SecurityGroup(mixin),
            MixinRole::Plain => MixinChange::Unknown(mixin),
        }
    }
}

// =============================================================================
// CATEGORY
// =============================================================================

/// Any registrable definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum Category {
    Kind(Kind),
    Mixin(Mixin),
    Action(Action),
}

impl Category {
    pub fn id(&self) -> &CategoryId {
        match self {
            Category::Kind(k) => &k.id,
            Category::Mixin(m) => &m.id,
            Category::Action(a) => &a.id,
        }
    }

    pub fn location(&self) -> Option<&str> {
        match self {
            Category::Kind(k) => Some(&k.location),
            Category::Mixin(m) => Some(&m.location),
            Category::Action(_) => None,
        }
    }
}

impl From<Kind> for Category {
    fn from(kind: Kind) -> Self {
        Category::Kind(kind)
    }
}

impl From<Mixin> for Category {
    fn from(mixin: Mixin) -> Self {
        Category::Mixin(mixin)
    }
}

impl From<Action> for Category {
    fn from(action: Action) -> Self {
        Category::Action(action)
    }
}
