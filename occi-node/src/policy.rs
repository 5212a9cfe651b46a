//! Registry keys derived the way OpenStack clients address resources.

use occi_core::infrastructure::CORE_ID;
use occi_core::{Entity, IdentifierPolicy};

/// Keys entities as `<kind location><occi.core.id>`, e.g.
/// `/compute/5f0d...`. Entities without a core id keep the requested key.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenStackIdentifiers;

impl IdentifierPolicy for OpenStackIdentifiers {
    fn key_for(&self, requested: &str, entity: &Entity) -> String {
        match entity.attr(CORE_ID) {
            Some(id) if !id.is_empty() => format!("{}{}", entity.kind().location, id),
            _ => requested.to_string(),
        }
    }
}
