//! Resource manager
//!
//! The single front door for obtaining complete resource definitions:
//! repository read, cache probe, completion on miss, conditional cache
//! insert. Everything downstream (provisioning, synchronization, mapping)
//! goes through [`ResourceManager::get_complete_resource`].

use std::sync::Arc;

use tracing::{debug, instrument};

use syncra_connector::{ConnectorGateway, ResourceId};

use crate::cache::ResourceCache;
use crate::completion::{Completion, CompletionStatus, ResourceCompletionService};
use crate::error::ResourceResult;
use crate::repository::{modify_availability_status, ResourceRepository};
use crate::test_protocol::{ConnectionTester, TestConfig};
use crate::types::{AvailabilityStatus, ResourceDefinition};

/// A resource definition ready for consumption, plus how it was obtained.
#[derive(Debug)]
pub struct CompleteResource {
    /// The resource definition. Shared with the cache; never mutated.
    pub resource: Arc<ResourceDefinition>,

    /// How the definition was obtained.
    pub status: CompletionStatus,
}

/// Front door for resource definitions.
pub struct ResourceManager {
    repository: Arc<dyn ResourceRepository>,
    gateway: Arc<dyn ConnectorGateway>,
    completer: Arc<ResourceCompletionService>,
    cache: ResourceCache,
}

impl ResourceManager {
    /// Create a manager over the given gateway and repository.
    pub fn new(
        gateway: Arc<dyn ConnectorGateway>,
        repository: Arc<dyn ResourceRepository>,
    ) -> Self {
        let completer = Arc::new(ResourceCompletionService::new(
            gateway.clone(),
            repository.clone(),
        ));
        Self {
            repository,
            gateway,
            completer,
            cache: ResourceCache::new(),
        }
    }

    /// Get a complete resource definition by id.
    ///
    /// Degraded completions return the stored definition with the failure
    /// attached; such definitions are never cached.
    #[instrument(skip(self), fields(resource_id = %resource_id))]
    pub async fn get_complete_resource(
        &self,
        resource_id: ResourceId,
    ) -> ResourceResult<CompleteResource> {
        let stored = self.repository.get_resource(resource_id).await?;

        if let Some(cached) = self.cache.get(resource_id, stored.version) {
            debug!(version = stored.version, "resource cache hit");
            return Ok(CompleteResource {
                resource: cached,
                status: CompletionStatus::Fresh,
            });
        }

        let Completion { resource, status } =
            self.completer.complete_resource(stored, None).await?;
        let resource = Arc::new(resource);

        if status.is_success() && resource.is_complete() {
            self.cache.put(resource.clone());
        }
        Ok(CompleteResource { resource, status })
    }

    /// Record a new availability status for a stored resource, skipping
    /// the write when nothing changed.
    pub async fn modify_availability_status(
        &self,
        resource_id: ResourceId,
        status: AvailabilityStatus,
    ) -> ResourceResult<ResourceDefinition> {
        let mut resource = self.repository.get_resource(resource_id).await?;
        modify_availability_status(&*self.repository, &mut resource, status).await?;
        Ok(resource)
    }

    /// Build a connection tester sharing this manager's collaborators.
    #[must_use]
    pub fn connection_tester(&self, config: TestConfig) -> ConnectionTester {
        ConnectionTester::new(
            self.gateway.clone(),
            self.repository.clone(),
            self.completer.clone(),
            config,
        )
    }

    /// The completion service used by this manager.
    #[must_use]
    pub fn completer(&self) -> &Arc<ResourceCompletionService> {
        &self.completer
    }
}
