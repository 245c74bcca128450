//! Resource cache
//!
//! Process-wide cache of complete resource definitions. Keys embed the
//! repository version, so a stale entry is simply never looked up again
//! after the backing row changes; no invalidation protocol is needed.
//! Entries are immutable once inserted.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use syncra_connector::ResourceId;

use crate::types::ResourceDefinition;

/// Versioned cache of complete resource definitions.
#[derive(Debug, Default)]
pub struct ResourceCache {
    entries: RwLock<HashMap<(ResourceId, u64), Arc<ResourceDefinition>>>,
}

impl ResourceCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the cached definition for an exact (id, version) pair.
    #[must_use]
    pub fn get(&self, resource_id: ResourceId, version: u64) -> Option<Arc<ResourceDefinition>> {
        let entries = self.entries.read().ok()?;
        entries.get(&(resource_id, version)).cloned()
    }

    /// Insert a completed definition, dropping entries for older versions
    /// of the same resource.
    pub fn put(&self, resource: Arc<ResourceDefinition>) {
        let Ok(mut entries) = self.entries.write() else {
            return;
        };
        entries.retain(|(id, _), _| *id != resource.id);
        debug!(resource_id = %resource.id, version = resource.version, "caching resource");
        entries.insert((resource.id, resource.version), resource);
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
