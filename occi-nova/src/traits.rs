//! Service contracts consumed by the OCCI backends.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::*;

/// Compute service.
///
/// Long-running operations (reboot, resize, rebuild) return once accepted;
/// the instance reports a task state until they finish.
#[async_trait]
pub trait ComputeApi: Send + Sync {
    // =========================================================================
    // Instance Lifecycle
    // =========================================================================

    /// Create and boot an instance.
    async fn create(&self, ctx: &NovaContext, request: CreateRequest) -> Result<Instance>;

    /// Get an instance by UUID.
    async fn get(&self, ctx: &NovaContext, instance_id: &str) -> Result<Instance>;

    /// Delete an instance immediately.
    async fn delete(&self, ctx: &NovaContext, instance_id: &str) -> Result<()>;

    /// Mark an instance deleted; it is reclaimed later.
    async fn soft_delete(&self, ctx: &NovaContext, instance_id: &str) -> Result<()>;

    // =========================================================================
    // Power Operations
    // =========================================================================

    /// Reboot an instance.
    async fn reboot(&self, ctx: &NovaContext, instance_id: &str, reboot_type: RebootType) -> Result<()>;

    /// Pause an instance (freeze execution in memory).
    async fn pause(&self, ctx: &NovaContext, instance_id: &str) -> Result<()>;

    /// Unpause a paused instance.
    async fn unpause(&self, ctx: &NovaContext, instance_id: &str) -> Result<()>;

    /// Suspend an instance (save state to disk).
    async fn suspend(&self, ctx: &NovaContext, instance_id: &str) -> Result<()>;

    /// Resume a suspended instance.
    async fn resume(&self, ctx: &NovaContext, instance_id: &str) -> Result<()>;

    // =========================================================================
    // Structural Changes
    // =========================================================================

    /// Resize an instance to another flavor.
    async fn resize(&self, ctx: &NovaContext, instance_id: &str, flavor_name: &str) -> Result<()>;

    /// Rebuild an instance from an image, wiping its disk.
    async fn rebuild(
        &self,
        ctx: &NovaContext,
        instance_id: &str,
        image_id: &str,
        admin_password: &str,
    ) -> Result<()>;

    // =========================================================================
    // Flavors
    // =========================================================================

    /// List all flavors visible to the caller.
    async fn list_flavors(&self, ctx: &NovaContext) -> Result<Vec<Flavor>>;
}

/// Network service.
#[async_trait]
pub trait NetworkApi: Send + Sync {
    /// Query live adapter information for an instance.
    async fn get_instance_network_info(
        &self,
        ctx: &NovaContext,
        instance: &Instance,
    ) -> Result<Vec<AdapterInfo>>;
}

/// Image service.
#[async_trait]
pub trait ImageService: Send + Sync {
    /// Get metadata for one image.
    async fn show(&self, ctx: &NovaContext, image_id: &str) -> Result<ImageMeta>;

    /// List all images visible to the caller.
    async fn detail(&self, ctx: &NovaContext) -> Result<Vec<ImageMeta>>;
}
