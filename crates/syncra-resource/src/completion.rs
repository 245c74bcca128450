//! Resource completion
//!
//! Takes a stored, possibly incomplete resource definition and enriches
//! it with a live schema and capability fetch. Completion prefers
//! degrading over failing: a broken connector yields the original
//! resource with the failure attached, so degraded resources stay visible
//! and reconfigurable. Only repository persist failures are fatal.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use syncra_connector::{
    guarded, CapabilitySet, ConnectorGateway, ObjectClass, ResourceId, Schema,
};

use crate::error::{ResourceError, ResourceResult};
use crate::negotiator::adjust_schema_for_simulated_capabilities;
use crate::repository::{ResourceModification, ResourceRepository};
use crate::types::{AvailabilityStatus, ResourceDefinition};

/// How a completion concluded.
#[derive(Debug)]
pub enum CompletionStatus {
    /// The resource was already complete; the connector was not invoked.
    Fresh,
    /// The resource was enriched and the enrichment persisted.
    Completed,
    /// Enrichment failed; the original resource is returned unchanged.
    Degraded {
        /// The failure that prevented enrichment.
        error: ResourceError,
    },
}

impl CompletionStatus {
    /// Whether the completion finished without a recorded failure.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !matches!(self, CompletionStatus::Degraded { .. })
    }
}

/// The outcome of a completion: a resource plus how it was obtained.
#[derive(Debug)]
pub struct Completion {
    /// The resulting resource definition. On success this is the durable
    /// post-persist row; on degradation it is the stored pre-completion
    /// row.
    pub resource: ResourceDefinition,

    /// How the completion concluded.
    pub status: CompletionStatus,
}

/// Everything a successful connector round trip produced.
struct Enrichment {
    /// Freshly fetched, negotiation-adjusted schema. `None` when the
    /// connector reported no schema.
    fetched_schema: Option<Schema>,
    capabilities: CapabilitySet,
}

/// Completes stored resource definitions against live connectors.
///
/// Completions of the same resource are single-flight: concurrent callers
/// serialize on a per-resource lock and the loser re-reads the winner's
/// persisted result instead of invoking the connector again.
pub struct ResourceCompletionService {
    gateway: Arc<dyn ConnectorGateway>,
    repository: Arc<dyn ResourceRepository>,
    locks: Mutex<HashMap<ResourceId, Arc<tokio::sync::Mutex<()>>>>,
}

impl ResourceCompletionService {
    /// Create a completion service over the given gateway and repository.
    pub fn new(
        gateway: Arc<dyn ConnectorGateway>,
        repository: Arc<dyn ResourceRepository>,
    ) -> Self {
        Self {
            gateway,
            repository,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Complete a stored resource definition.
    ///
    /// `prefetched_schema` short-circuits the schema fetch when the caller
    /// (the connection test protocol) already holds a fresh one.
    #[instrument(skip_all, fields(resource_id = %resource.id, resource = %resource.name))]
    pub async fn complete_resource(
        &self,
        resource: ResourceDefinition,
        prefetched_schema: Option<Schema>,
    ) -> ResourceResult<Completion> {
        if resource.is_complete() {
            debug!("resource already complete");
            return Ok(Completion {
                resource,
                status: CompletionStatus::Fresh,
            });
        }

        let resource_id = resource.id;
        let lock = self.resource_lock(resource_id);
        let guard = lock.lock().await;
        let result = self.complete_locked(resource_id, prefetched_schema).await;
        drop(guard);
        self.release_resource_lock(resource_id, lock);
        result
    }

    /// The completion body, entered with the per-resource lock held.
    async fn complete_locked(
        &self,
        resource_id: ResourceId,
        prefetched_schema: Option<Schema>,
    ) -> ResourceResult<Completion> {
        // Another completion may have finished while we waited.
        let resource = self.repository.get_resource(resource_id).await?;
        if resource.is_complete() {
            debug!("resource completed by a concurrent caller");
            return Ok(Completion {
                resource,
                status: CompletionStatus::Fresh,
            });
        }

        let configuration_schema = self.configuration_schema(&resource).await?;
        validate_configuration(&configuration_schema, &resource.connector_config)?;

        let enrichment = match self.enrich(&resource, prefetched_schema).await {
            Ok(enrichment) => enrichment,
            Err(error) => {
                warn!(error = %error, "resource completion degraded");
                return Ok(Completion {
                    resource,
                    status: CompletionStatus::Degraded { error },
                });
            }
        };

        // Without any schema, fetched or statically configured, the
        // resource can never become complete; persisting capabilities
        // here would bump the version on every lookup for nothing.
        let has_static_schema = resource.schema.as_ref().is_some_and(|s| !s.is_empty());
        if enrichment.fetched_schema.is_none() && !has_static_schema {
            warn!("connector reported no schema and none is configured");
            return Ok(Completion {
                resource,
                status: CompletionStatus::Degraded {
                    error: ResourceError::schema("connector reported no schema"),
                },
            });
        }

        // Persist failures are invariant violations, never swallowed.
        let mut modifications = vec![
            ResourceModification::SetCapabilities(enrichment.capabilities),
            ResourceModification::SetAvailability(AvailabilityStatus::Up),
        ];
        if let Some(schema) = enrichment.fetched_schema {
            modifications.insert(0, ResourceModification::SetSchema(schema));
        }
        self.repository
            .modify_resource(resource.id, modifications)
            .await?;

        // Return exactly what is now durable.
        let persisted = self.repository.get_resource(resource.id).await?;
        validate_configuration(&configuration_schema, &persisted.connector_config)?;
        debug!(version = persisted.version, "resource completed");
        Ok(Completion {
            resource: persisted,
            status: CompletionStatus::Completed,
        })
    }

    /// The connector's declared configuration schema. A connector type
    /// without one cannot be validated at all, which is fatal.
    async fn configuration_schema(
        &self,
        resource: &ResourceDefinition,
    ) -> ResourceResult<ObjectClass> {
        self.gateway
            .configuration_schema(resource.connector_id)
            .await
            .map_err(|err| {
                ResourceError::configuration(format!(
                    "connector {} has no usable configuration schema: {err}",
                    resource.connector_id
                ))
            })
    }

    /// One connector round trip: acquire, configure, fetch schema and
    /// capabilities, negotiate. Every failure here degrades the
    /// completion rather than propagating.
    async fn enrich(
        &self,
        resource: &ResourceDefinition,
        prefetched_schema: Option<Schema>,
    ) -> ResourceResult<Enrichment> {
        let handle = guarded(
            "acquire",
            self.gateway.acquire(resource.connector_id, false),
        )
        .await?;
        guarded("configure", handle.configure(&resource.connector_config)).await?;

        let fetched = match prefetched_schema {
            Some(schema) => Some(schema),
            None => guarded("fetch_schema", handle.fetch_schema()).await?,
        };
        let mut fetched_schema = match fetched {
            Some(schema) if !schema.is_empty() => Some(schema),
            _ => {
                warn!("connector reported no schema");
                None
            }
        };

        let native = guarded("fetch_capabilities", handle.fetch_capabilities()).await?;
        let capabilities = CapabilitySet {
            native,
            configured: resource.capabilities.configured.clone(),
            cached_at: Some(Utc::now()),
        };

        if let Some(schema) = &mut fetched_schema {
            adjust_schema_for_simulated_capabilities(schema, &capabilities);
            schema
                .check()
                .map_err(|err| ResourceError::schema(err.to_string()))?;
        }

        Ok(Enrichment {
            fetched_schema,
            capabilities,
        })
    }

    fn resource_lock(&self, resource_id: ResourceId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = match self.locks.lock() {
            Ok(locks) => locks,
            Err(poisoned) => poisoned.into_inner(),
        };
        locks
            .entry(resource_id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Drop the map entry once no other completion holds or awaits the
    /// lock, so the map does not grow with every resource ever completed.
    fn release_resource_lock(&self, resource_id: ResourceId, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = match self.locks.lock() {
            Ok(locks) => locks,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Exactly two handles means ours plus the map's: nobody waits.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&resource_id);
        }
    }
}

/// Validate a resource's connector configuration against the connector's
/// configuration schema: the configuration must be an object and every
/// required configuration attribute must be present.
pub fn validate_configuration(
    configuration_schema: &ObjectClass,
    configuration: &Value,
) -> ResourceResult<()> {
    let Some(entries) = configuration.as_object() else {
        return Err(ResourceError::configuration(
            "connector configuration is not an object",
        ));
    };
    for attribute in configuration_schema.required_attributes() {
        if !entries.contains_key(&attribute.name) {
            return Err(ResourceError::configuration(format!(
                "missing required configuration attribute '{}'",
                attribute.name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use syncra_connector::{
        AttributeDataType, ConnectorError, ConnectorHandle, ConnectorId, ConnectorResult,
        ErrorKind, SchemaAttribute,
    };

    use crate::repository::InMemoryResourceRepository;

    struct UnusedGateway;

    #[async_trait]
    impl ConnectorGateway for UnusedGateway {
        async fn acquire(
            &self,
            connector_id: ConnectorId,
            _force_fresh: bool,
        ) -> ConnectorResult<Arc<dyn ConnectorHandle>> {
            Err(ConnectorError::NotFound { connector_id })
        }

        async fn configuration_schema(
            &self,
            connector_id: ConnectorId,
        ) -> ConnectorResult<ObjectClass> {
            Err(ConnectorError::NotFound { connector_id })
        }
    }

    fn service() -> ResourceCompletionService {
        ResourceCompletionService::new(
            Arc::new(UnusedGateway),
            Arc::new(InMemoryResourceRepository::new()),
        )
    }

    fn configuration_schema() -> ObjectClass {
        ObjectClass::new("configuration", "configuration")
            .with_attribute(
                SchemaAttribute::new("host", "host", AttributeDataType::String).required(),
            )
            .with_attribute(SchemaAttribute::new(
                "port",
                "port",
                AttributeDataType::Integer,
            ))
    }

    #[test]
    fn test_validate_accepts_complete_configuration() {
        let config = json!({"host": "ldap.example.com", "port": 636});
        assert!(validate_configuration(&configuration_schema(), &config).is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_required() {
        let config = json!({"port": 636});
        let err = validate_configuration(&configuration_schema(), &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("host"));
    }

    #[test]
    fn test_validate_rejects_non_object() {
        let err =
            validate_configuration(&configuration_schema(), &json!("ldap://host")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_resource_lock_pruned_when_uncontended() {
        let service = service();
        let resource_id = ResourceId::new();

        let lock = service.resource_lock(resource_id);
        drop(lock.lock().await);
        service.release_resource_lock(resource_id, lock);

        assert!(service.locks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resource_lock_survives_while_contended() {
        let service = service();
        let resource_id = ResourceId::new();

        let ours = service.resource_lock(resource_id);
        let theirs = service.resource_lock(resource_id);

        service.release_resource_lock(resource_id, ours);
        assert_eq!(service.locks.lock().unwrap().len(), 1);

        service.release_resource_lock(resource_id, theirs);
        assert!(service.locks.lock().unwrap().is_empty());
    }
}
