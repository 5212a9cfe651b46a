//! Backends for the infrastructure kinds and mixins.
//!
//! The registry never cascades, so these helpers keep link lists and link
//! entities consistent when a backend creates or tears something down.

pub mod compute;
pub mod links;
pub mod mixins;
pub mod network;
pub mod storage;

pub use compute::{ComputeBackend, ComputeSettings};
pub use links::{ConsoleBackend, LinkBackend};
pub use mixins::ScopedMixinBackend;
pub use network::NetworkBackend;
pub use storage::StorageBackend;

use tracing::debug;

use crate::error::{OcciError, Result};
use crate::model::Entity;
use crate::registry::{EntityGuard, Registry};

/// Turn `NotFound` into `None`.
pub(crate) fn ignore_not_found<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(OcciError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Lock `key` unless the caller already holds it.
async fn lock_unless_held(registry: &Registry, key: &str, held: &str) -> Result<Option<EntityGuard>> {
    if key == held {
        Ok(None)
    } else {
        Ok(Some(registry.lock_entity(key).await?))
    }
}

/// Register a new link and append it to its source's link list.
pub(crate) async fn attach_to_source(registry: &Registry, link: &mut Entity) -> Result<()> {
    let source = link
        .source()
        .ok_or_else(|| OcciError::BadRequest(format!("{} is not a link", link.identifier)))?
        .to_string();

    let key = registry.add_resource(&link.identifier, link.clone())?;
    link.identifier = key.clone();

    let _guard = lock_unless_held(registry, &source, &key).await?;
    registry.modify(&source, |resource| {
        if let Some(links) = resource.links_mut() {
            if !links.contains(&key) {
                links.push(key.clone());
            }
        }
    })?;
    debug!(link = %key, source = %source, "Link attached to source");
    Ok(())
}

/// Drop a link from its source's link list. `held` is the identifier
/// the calling operation already holds the lock for.
pub(crate) async fn detach_from_source(registry: &Registry, source: &str, link_id: &str, held: &str) -> Result<()> {
    let _guard = lock_unless_held(registry, source, held).await?;
    ignore_not_found(registry.modify(source, |resource| {
        if let Some(links) = resource.links_mut() {
            links.retain(|l| l != link_id);
        }
    }))?;
    Ok(())
}

/// Remove a link entity and detach it from its source.
pub(crate) async fn remove_link(registry: &Registry, link_id: &str, held: &str) -> Result<Option<Entity>> {
    let Some(link) = ignore_not_found(registry.get_resource(link_id))? else {
        return Ok(None);
    };
    if let Some(source) = link.source() {
        detach_from_source(registry, source, link_id, held).await?;
    }
    ignore_not_found(registry.remove_resource(link_id))?;
    debug!(link = %link_id, "Link removed");
    Ok(Some(link))
}

/// Remove every link pointing at `target`.
pub(crate) async fn remove_links_targeting(registry: &Registry, target: &str, held: &str) -> Result<usize> {
    let links = registry.links_referencing(target)?;
    let mut removed = 0;
    for link in links.iter().filter(|l| l.target() == Some(target)) {
        if remove_link(registry, &link.identifier, held).await?.is_some() {
            removed += 1;
        }
    }
    Ok(removed)
}
