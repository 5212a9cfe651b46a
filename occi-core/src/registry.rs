//! In-memory registry of entities, categories and backends.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info};

use crate::backend::Backend;
use crate::category::{Category, CategoryId};
use crate::error::{OcciError, Result};
use crate::model::Entity;

/// Derives the registry key for a newly added entity.
///
/// The core keeps whatever key it is given; the embedding application may
/// install its own policy.
pub trait IdentifierPolicy: Send + Sync {
    fn key_for(&self, requested: &str, entity: &Entity) -> String;
}

/// Keep the requested key unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeepIdentifier;

impl IdentifierPolicy for KeepIdentifier {
    fn key_for(&self, requested: &str, _entity: &Entity) -> String {
        requested.to_string()
    }
}

struct Registration {
    category: Category,
    backend: Arc<dyn Backend>,
}

type LockTable = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// Guard serialising operations on one identifier.
///
/// Dropping the last guard for a key removes its lock entry.
pub struct EntityGuard {
    key: String,
    table: LockTable,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for EntityGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        if let Ok(mut locks) = self.table.lock() {
            let idle = locks.get(&self.key).map_or(false, |lock| Arc::strong_count(lock) == 1);
            if idle {
                locks.remove(&self.key);
            }
        }
    }
}

/// Entity store plus category/backend table.
///
/// Every method takes `&self`; share it behind an `Arc`.
pub struct Registry {
    entities: RwLock<HashMap<String, Entity>>,
    backends: RwLock<HashMap<CategoryId, Registration>>,
    locks: LockTable,
    policy: Box<dyn IdentifierPolicy>,
}

impl Registry {
    pub fn new() -> Self {
        Self::with_policy(KeepIdentifier)
    }

    pub fn with_policy(policy: impl IdentifierPolicy + 'static) -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
            backends: RwLock::new(HashMap::new()),
            locks: Arc::new(Mutex::new(HashMap::new())),
            policy: Box::new(policy),
        }
    }

    // =========================================================================
    // Backends
    // =========================================================================

    /// Associate a category with its backend, replacing any earlier one.
    pub fn register_backend(&self, category: impl Into<Category>, backend: Arc<dyn Backend>) -> Result<()> {
        let category = category.into();
        let id = category.id().clone();
        let mut backends = self.backends.write().map_err(|_| poisoned())?;
        if backends.insert(id.clone(), Registration { category, backend }).is_some() {
            debug!(category = %id, "Replaced backend");
        } else {
            debug!(category = %id, "Registered backend");
        }
        Ok(())
    }

    pub fn get_backend(&self, id: &CategoryId) -> Result<Arc<dyn Backend>> {
        let backends = self.backends.read().map_err(|_| poisoned())?;
        backends
            .get(id)
            .map(|r| r.backend.clone())
            .ok_or_else(|| OcciError::NotRegistered(id.to_string()))
    }

    pub fn get_category(&self, id: &CategoryId) -> Result<Category> {
        let backends = self.backends.read().map_err(|_| poisoned())?;
        backends
            .get(id)
            .map(|r| r.category.clone())
            .ok_or_else(|| OcciError::NotRegistered(id.to_string()))
    }

    /// Every registered category, ordered by identity.
    pub fn categories(&self) -> Result<Vec<Category>> {
        let backends = self.backends.read().map_err(|_| poisoned())?;
        let mut categories: Vec<Category> = backends.values().map(|r| r.category.clone()).collect();
        categories.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(categories)
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Store an entity under the key the identifier policy derives,
    /// overwriting any previous entry. Links require both endpoints to be
    /// registered. Returns the key used.
    pub fn add_resource(&self, key: &str, mut entity: Entity) -> Result<String> {
        let key = self.policy.key_for(key, &entity);
        let mut entities = self.entities.write().map_err(|_| poisoned())?;

        for endpoint in [entity.source(), entity.target()].into_iter().flatten() {
            if endpoint != key && !entities.contains_key(endpoint) {
                return Err(OcciError::NotFound(format!(
                    "link endpoint {} is not registered",
                    endpoint
                )));
            }
        }

        entity.identifier = key.clone();
        if entities.insert(key.clone(), entity).is_some() {
            debug!(key = %key, "Overwrote entity");
        } else {
            debug!(key = %key, "Added entity");
        }
        Ok(key)
    }

    /// Replace an existing entry without re-deriving its key.
    pub fn update_resource(&self, key: &str, mut entity: Entity) -> Result<()> {
        let mut entities = self.entities.write().map_err(|_| poisoned())?;
        let slot = entities
            .get_mut(key)
            .ok_or_else(|| OcciError::NotFound(key.to_string()))?;
        entity.identifier = key.to_string();
        *slot = entity;
        Ok(())
    }

    pub fn get_resource(&self, key: &str) -> Result<Entity> {
        let entities = self.entities.read().map_err(|_| poisoned())?;
        entities
            .get(key)
            .cloned()
            .ok_or_else(|| OcciError::NotFound(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> Result<bool> {
        let entities = self.entities.read().map_err(|_| poisoned())?;
        Ok(entities.contains_key(key))
    }

    pub fn remove_resource(&self, key: &str) -> Result<Entity> {
        let removed = {
            let mut entities = self.entities.write().map_err(|_| poisoned())?;
            entities
                .remove(key)
                .ok_or_else(|| OcciError::NotFound(key.to_string()))?
        };
        debug!(key = %key, "Removed entity");
        Ok(removed)
    }

    /// Apply `f` to a stored entity in place.
    pub fn modify<T>(&self, key: &str, f: impl FnOnce(&mut Entity) -> T) -> Result<T> {
        let mut entities = self.entities.write().map_err(|_| poisoned())?;
        let entity = entities
            .get_mut(key)
            .ok_or_else(|| OcciError::NotFound(key.to_string()))?;
        Ok(f(entity))
    }

    /// All keys, sorted.
    pub fn resource_keys(&self) -> Result<Vec<String>> {
        let entities = self.entities.read().map_err(|_| poisoned())?;
        let mut keys: Vec<String> = entities.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    /// Links whose source or target is `key`.
    pub fn links_referencing(&self, key: &str) -> Result<Vec<Entity>> {
        let entities = self.entities.read().map_err(|_| poisoned())?;
        Ok(entities
            .values()
            .filter(|e| e.source() == Some(key) || e.target() == Some(key))
            .cloned()
            .collect())
    }

    // =========================================================================
    // Per-identifier locking
    // =========================================================================

    /// Wait for exclusive access to one identifier.
    pub async fn lock_entity(&self, key: &str) -> Result<EntityGuard> {
        let lock = {
            let mut locks = self.locks.lock().map_err(|_| poisoned())?;
            locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        Ok(EntityGuard {
            key: key.to_string(),
            table: self.locks.clone(),
            guard: Some(lock.lock_owned().await),
        })
    }

    #[cfg(test)]
    pub(crate) fn lock_entries(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or_default()
    }

    /// Log a summary of the registry contents.
    pub fn log_summary(&self) -> Result<()> {
        let entities = self.entities.read().map_err(|_| poisoned())?.len();
        let categories = self.backends.read().map_err(|_| poisoned())?.len();
        info!(entities, categories, "Registry contents");
        Ok(())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> OcciError {
    OcciError::Internal("Lock poisoned".to_string())
}
