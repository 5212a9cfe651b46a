//! Lifecycle state machines, one closed enum per kind.
//!
//! States are converted to their wire strings only when written into the
//! attribute map. The legal actions of a state are recomputed every time
//! and never read back from the entity.

use std::fmt;

use occi_nova::{TaskState, VmState};

use crate::category::{Action, CategoryId};
use crate::infrastructure::{BACKUP, DOWN, OFFLINE, ONLINE, RESIZE, RESTART, SNAPSHOT, START, STOP, SUSPEND, UP};
use crate::model::Entity;

/// A per-kind state machine.
pub trait Lifecycle: Copy + Eq + fmt::Debug + Send + Sync {
    /// Wire string stored in the state attribute.
    fn as_str(&self) -> &'static str;

    /// Parse a wire string.
    fn parse(value: &str) -> Option<Self>;

    /// Actions legal in this state.
    fn legal_actions(&self) -> Vec<Action>;

    /// State reached by running `action` from this state, if legal.
    fn transition(&self, action: &CategoryId) -> Option<Self>;
}

/// A state as observed, and whether it is settled.
///
/// An unsettled (transient or unknown) state allows no actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observed<S> {
    pub state: S,
    pub settled: bool,
}

impl<S: Lifecycle> Observed<S> {
    pub fn settled(state: S) -> Self {
        Self { state, settled: true }
    }

    pub fn transient(state: S) -> Self {
        Self { state, settled: false }
    }

    /// Read the state attribute of an entity, falling back to a transient
    /// `fallback` when it is missing or unrecognised.
    pub fn read(entity: &Entity, attribute: &str, fallback: S) -> Self {
        match entity.attr(attribute).and_then(S::parse) {
            Some(state) => Self::settled(state),
            None => Self::transient(fallback),
        }
    }

    pub fn actions(&self) -> Vec<Action> {
        if self.settled {
            self.state.legal_actions()
        } else {
            Vec::new()
        }
    }

    /// Write the state and its legal actions into the entity.
    pub fn apply(&self, entity: &mut Entity, attribute: &str) {
        entity.set_attr(attribute, self.state.as_str());
        entity.set_actions(self.actions());
    }
}

// =============================================================================
// COMPUTE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeState {
    Inactive,
    Active,
    Suspended,
}

impl ComputeState {
    /// Map the compute service's VM and task state onto the machine.
    pub fn observe(vm_state: VmState, task_state: Option<TaskState>) -> Observed<Self> {
        if let Some(task) = task_state {
            if task != TaskState::UpdatingPassword {
                let state = match task {
                    TaskState::Pausing
                    | TaskState::Unpausing
                    | TaskState::Suspending
                    | TaskState::Resuming => ComputeState::Suspended,
                    _ => ComputeState::Inactive,
                };
                return Observed::transient(state);
            }
        }

        match vm_state {
            VmState::Active | VmState::Resized => Observed::settled(ComputeState::Active),
            VmState::Paused => Observed::settled(ComputeState::Suspended),
            VmState::Suspended | VmState::Stopped => Observed::settled(ComputeState::Inactive),
            _ => Observed::transient(ComputeState::Inactive),
        }
    }
}

impl Lifecycle for ComputeState {
    fn as_str(&self) -> &'static str {
        match self {
            ComputeState::Inactive => "inactive",
            ComputeState::Active => "active",
            ComputeState::Suspended => "suspended",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "inactive" => Some(ComputeState::Inactive),
            "active" => Some(ComputeState::Active),
            "suspended" => Some(ComputeState::Suspended),
            _ => None,
        }
    }

    fn legal_actions(&self) -> Vec<Action> {
        match self {
            ComputeState::Inactive | ComputeState::Suspended => vec![START.clone()],
            ComputeState::Active => vec![STOP.clone(), SUSPEND.clone(), RESTART.clone()],
        }
    }

    fn transition(&self, action: &CategoryId) -> Option<Self> {
        match self {
            ComputeState::Inactive | ComputeState::Suspended if action == &START.id => Some(ComputeState::Active),
            ComputeState::Active if action == &STOP.id => Some(ComputeState::Inactive),
            ComputeState::Active if action == &SUSPEND.id => Some(ComputeState::Suspended),
            ComputeState::Active if action == &RESTART.id => Some(ComputeState::Active),
            _ => None,
        }
    }
}

// =============================================================================
// NETWORK
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkState {
    Inactive,
    Active,
}

impl Lifecycle for NetworkState {
    fn as_str(&self) -> &'static str {
        match self {
            NetworkState::Inactive => "inactive",
            NetworkState::Active => "active",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "inactive" => Some(NetworkState::Inactive),
            "active" => Some(NetworkState::Active),
            _ => None,
        }
    }

    fn legal_actions(&self) -> Vec<Action> {
        match self {
            NetworkState::Inactive => vec![UP.clone()],
            NetworkState::Active => vec![DOWN.clone()],
        }
    }

    fn transition(&self, action: &CategoryId) -> Option<Self> {
        match self {
            NetworkState::Inactive if action == &UP.id => Some(NetworkState::Active),
            NetworkState::Active if action == &DOWN.id => Some(NetworkState::Inactive),
            _ => None,
        }
    }
}

// =============================================================================
// STORAGE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageState {
    Offline,
    Online,
}

impl Lifecycle for StorageState {
    fn as_str(&self) -> &'static str {
        match self {
            StorageState::Offline => "offline",
            StorageState::Online => "online",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "offline" => Some(StorageState::Offline),
            "online" => Some(StorageState::Online),
            _ => None,
        }
    }

    fn legal_actions(&self) -> Vec<Action> {
        match self {
            StorageState::Offline => vec![ONLINE.clone()],
            StorageState::Online => vec![
                OFFLINE.clone(),
                BACKUP.clone(),
                SNAPSHOT.clone(),
                RESIZE.clone(),
            ],
        }
    }

    fn transition(&self, action: &CategoryId) -> Option<Self> {
        match self {
            StorageState::Offline if action == &ONLINE.id => Some(StorageState::Online),
            StorageState::Online if action == &OFFLINE.id => Some(StorageState::Offline),
            StorageState::Online
                if action == &BACKUP.id || action == &SNAPSHOT.id || action == &RESIZE.id =>
            {
                Some(StorageState::Online)
            }
            _ => None,
        }
    }
}

// =============================================================================
// LINKS
// =============================================================================

/// Link state, derived from the state of the link's target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Inactive,
    Active,
}

impl LinkState {
    /// A link is active while its target is active or online.
    pub fn from_target(target_state: Option<&str>) -> Self {
        match target_state {
            Some("active") | Some("online") => LinkState::Active,
            _ => LinkState::Inactive,
        }
    }
}

impl Lifecycle for LinkState {
    fn as_str(&self) -> &'static str {
        match self {
            LinkState::Inactive => "inactive",
            LinkState::Active => "active",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "inactive" => Some(LinkState::Inactive),
            "active" => Some(LinkState::Active),
            _ => None,
        }
    }

    fn legal_actions(&self) -> Vec<Action> {
        Vec::new()
    }

    fn transition(&self, _action: &CategoryId) -> Option<Self> {
        None
    }
}
