//! Node bootstrap: registry, collaborators, categories and the default
//! network.

use std::sync::Arc;

use anyhow::{Context, Result};
use occi_core::{catalog, Dispatcher, Extras, Registry};
use occi_nova::{MockCloud, NovaContext};
use tracing::info;

use crate::config::Config;
use crate::policy::OpenStackIdentifiers;

/// A fully wired OCCI node.
pub struct Node {
    pub dispatcher: Dispatcher,
    pub extras: Extras,
}

impl Node {
    /// Build the registry, seed the in-memory cloud from the configuration
    /// and register every category.
    pub async fn bootstrap(config: &Config) -> Result<Self> {
        let registry = Arc::new(Registry::with_policy(OpenStackIdentifiers));
        let settings = config.compute_settings();
        let default_network = settings.default_network.clone();

        catalog::register_infrastructure(&registry, settings)
            .context("Failed to register infrastructure categories")?;

        let mut cloud = MockCloud::new().with_flavors(config.flavor_catalog());
        if !config.images.is_empty() {
            cloud = cloud.with_images(config.image_catalog());
        }
        let extras = Extras::from_cloud(NovaContext::new("occi", "occi"), registry.clone(), Arc::new(cloud));

        let (flavors, images) = catalog::register_templates(&registry, &extras)
            .await
            .context("Failed to register templates")?;
        info!(flavors, images, "Templates registered");

        let dispatcher = Dispatcher::new(registry);
        let network = catalog::create_default_network(&dispatcher, &extras, &default_network)
            .await
            .context("Failed to create the default network")?;
        info!(network = %network.identifier, "Default network ready");

        dispatcher.registry().log_summary()?;
        Ok(Self { dispatcher, extras })
    }

    /// Every registered kind, mixin and action as pretty JSON.
    pub fn dump_categories(&self) -> Result<String> {
        let categories = self.dispatcher.registry().categories()?;
        serde_json::to_string_pretty(&categories).context("Failed to serialize categories")
    }
}
