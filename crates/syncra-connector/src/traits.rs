//! Connector traits
//!
//! The seam between the platform and target-system integrations. A
//! [`ConnectorHandle`] is a configured, ready-to-use connector instance;
//! a [`ConnectorGateway`] knows how to produce them. Connector code is
//! third-party and untrusted: every call into a handle must go through
//! [`guarded`], which converts panics into errors instead of letting them
//! tear down the caller.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;

use crate::capability::Capability;
use crate::error::{ConnectorError, ConnectorResult};
use crate::ids::ConnectorId;
use crate::schema::{ObjectClass, Schema};

/// A connector instance bound to one target system.
///
/// An instance must be configured before any other call succeeds.
#[async_trait]
pub trait ConnectorHandle: Send + Sync {
    /// Push the resource's connector configuration into this instance.
    async fn configure(&self, configuration: &Value) -> ConnectorResult<()>;

    /// Fetch the schema of the target system.
    ///
    /// Returns `Ok(None)` when the connector cannot determine a schema;
    /// callers must treat that as a degraded but non-fatal outcome.
    async fn fetch_schema(&self) -> ConnectorResult<Option<Schema>>;

    /// Fetch the native capabilities of the target system.
    async fn fetch_capabilities(&self) -> ConnectorResult<Vec<Capability>>;

    /// Verify connectivity to the target system.
    async fn test_connection(&self) -> ConnectorResult<()>;
}

/// Produces connector instances.
///
/// Implementations typically pool instances per connector type;
/// `force_fresh` bypasses the pool so a connection test exercises
/// initialization rather than a warm instance.
#[async_trait]
pub trait ConnectorGateway: Send + Sync {
    /// Acquire a connector instance for the given connector type. The
    /// instance is not yet configured.
    async fn acquire(
        &self,
        connector_id: ConnectorId,
        force_fresh: bool,
    ) -> ConnectorResult<Arc<dyn ConnectorHandle>>;

    /// The configuration schema declared by the connector type, used to
    /// validate resource configuration before any instance is built.
    async fn configuration_schema(&self, connector_id: ConnectorId)
        -> ConnectorResult<ObjectClass>;
}

/// Run a future that calls into connector code, converting panics into
/// [`ConnectorError::Unexpected`].
pub async fn guarded<F, T>(operation: &str, fut: F) -> ConnectorResult<T>
where
    F: Future<Output = ConnectorResult<T>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            tracing::warn!(operation, message, "connector panicked");
            Err(ConnectorError::Unexpected {
                message: format!("connector panicked during {operation}: {message}"),
                source: None,
            })
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn test_guarded_passes_through_ok() {
        let result = guarded("fetch_schema", async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_guarded_passes_through_err() {
        let result: ConnectorResult<()> = guarded("fetch_schema", async {
            Err(ConnectorError::communication("connection refused"))
        })
        .await;
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Communication);
    }

    #[tokio::test]
    async fn test_guarded_converts_panic() {
        let result: ConnectorResult<()> =
            guarded("test_connection", async { panic!("index out of bounds") }).await;
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unexpected);
        assert!(err.to_string().contains("index out of bounds"));
        assert!(err.to_string().contains("test_connection"));
    }
}
