//! Resource repository contract
//!
//! The persistence boundary for resource definitions. Writes are
//! expressed as declarative [`ResourceModification`] values so a batch of
//! related changes lands in one repository round trip. An in-memory
//! implementation backs tests and embedded deployments.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use syncra_connector::{CapabilitySet, ResourceId, Schema};

use crate::error::{ResourceError, ResourceResult};
use crate::types::{AvailabilityStatus, ResourceDefinition};

/// A single declarative change to a stored resource definition.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceModification {
    /// Replace the stored schema and stamp the fetch time.
    SetSchema(Schema),
    /// Replace the stored capability layers.
    SetCapabilities(CapabilitySet),
    /// Record a new availability status.
    SetAvailability(AvailabilityStatus),
}

/// Persistence contract for resource definitions.
///
/// `modify_resource` must apply the whole batch atomically and bump the
/// stored version once, and must fail with a conflict error when the row
/// no longer exists.
#[async_trait]
pub trait ResourceRepository: Send + Sync {
    /// Read a resource definition by id.
    async fn get_resource(&self, resource_id: ResourceId) -> ResourceResult<ResourceDefinition>;

    /// Apply a batch of modifications to a stored resource definition.
    async fn modify_resource(
        &self,
        resource_id: ResourceId,
        modifications: Vec<ResourceModification>,
    ) -> ResourceResult<()>;
}

/// Record a new availability status for a resource, skipping the
/// repository write when the status is unchanged. The in-memory definition
/// is updated to mirror the persisted state.
pub async fn modify_availability_status(
    repository: &dyn ResourceRepository,
    resource: &mut ResourceDefinition,
    status: AvailabilityStatus,
) -> ResourceResult<()> {
    if resource.availability == status {
        return Ok(());
    }
    tracing::info!(
        resource_id = %resource.id,
        from = %resource.availability,
        to = %status,
        "resource availability changed"
    );
    repository
        .modify_resource(resource.id, vec![ResourceModification::SetAvailability(status)])
        .await?;
    resource.availability = status;
    Ok(())
}

/// In-memory repository keyed by resource id.
#[derive(Debug, Default)]
pub struct InMemoryResourceRepository {
    resources: RwLock<HashMap<ResourceId, ResourceDefinition>>,
}

impl InMemoryResourceRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a resource definition, replacing any previous row.
    pub fn insert(&self, resource: ResourceDefinition) {
        if let Ok(mut resources) = self.resources.write() {
            resources.insert(resource.id, resource);
        }
    }

    /// Remove a resource definition.
    pub fn remove(&self, resource_id: ResourceId) {
        if let Ok(mut resources) = self.resources.write() {
            resources.remove(&resource_id);
        }
    }
}

#[async_trait]
impl ResourceRepository for InMemoryResourceRepository {
    async fn get_resource(&self, resource_id: ResourceId) -> ResourceResult<ResourceDefinition> {
        let resources = self
            .resources
            .read()
            .map_err(|_| ResourceError::unexpected("resource store lock poisoned"))?;
        resources
            .get(&resource_id)
            .cloned()
            .ok_or(ResourceError::NotFound { resource_id })
    }

    async fn modify_resource(
        &self,
        resource_id: ResourceId,
        modifications: Vec<ResourceModification>,
    ) -> ResourceResult<()> {
        let mut resources = self
            .resources
            .write()
            .map_err(|_| ResourceError::unexpected("resource store lock poisoned"))?;
        let resource = resources.get_mut(&resource_id).ok_or_else(|| {
            ResourceError::conflict(resource_id, "resource no longer exists")
        })?;

        for modification in modifications {
            match modification {
                ResourceModification::SetSchema(schema) => {
                    resource.schema = Some(schema);
                    resource.schema_fetched_at = Some(Utc::now());
                }
                ResourceModification::SetCapabilities(capabilities) => {
                    resource.capabilities = capabilities;
                }
                ResourceModification::SetAvailability(status) => {
                    resource.availability = status;
                }
            }
        }
        resource.version += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncra_connector::{
        AttributeDataType, ConnectorId, ErrorKind, ObjectClass, SchemaAttribute,
    };

    fn sample_resource() -> ResourceDefinition {
        ResourceDefinition::new("corp-ldap", ConnectorId::new(), serde_json::json!({}))
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let repo = InMemoryResourceRepository::new();
        let err = repo.get_resource(ResourceId::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_modify_missing_is_conflict() {
        let repo = InMemoryResourceRepository::new();
        let err = repo
            .modify_resource(
                ResourceId::new(),
                vec![ResourceModification::SetAvailability(AvailabilityStatus::Up)],
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_modify_availability_skips_unchanged() {
        let repo = InMemoryResourceRepository::new();
        let mut resource = sample_resource();
        let id = resource.id;
        repo.insert(resource.clone());

        modify_availability_status(&repo, &mut resource, AvailabilityStatus::Unknown)
            .await
            .unwrap();
        assert_eq!(repo.get_resource(id).await.unwrap().version, 0);

        modify_availability_status(&repo, &mut resource, AvailabilityStatus::Down)
            .await
            .unwrap();
        assert_eq!(resource.availability, AvailabilityStatus::Down);
        let stored = repo.get_resource(id).await.unwrap();
        assert_eq!(stored.availability, AvailabilityStatus::Down);
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn test_batch_bumps_version_once() {
        let repo = InMemoryResourceRepository::new();
        let resource = sample_resource();
        let id = resource.id;
        repo.insert(resource);

        let schema = Schema::with_object_classes(vec![ObjectClass::new("account", "account")
            .with_attribute(SchemaAttribute::new(
                "uid",
                "uid",
                AttributeDataType::String,
            ))]);
        repo.modify_resource(
            id,
            vec![
                ResourceModification::SetSchema(schema.clone()),
                ResourceModification::SetAvailability(AvailabilityStatus::Up),
            ],
        )
        .await
        .unwrap();

        let stored = repo.get_resource(id).await.unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.schema, Some(schema));
        assert_eq!(stored.availability, AvailabilityStatus::Up);
        assert!(stored.schema_fetched_at.is_some());
    }
}
