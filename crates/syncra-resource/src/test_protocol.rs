//! Connection test protocol
//!
//! Strict, ordered verification of a resource's connector: initialization,
//! configuration, live connection, schema retrieval. Each phase produces
//! its own outcome; a failing phase short-circuits the rest, and phases
//! that never ran are absent from the report. Administrator-triggered
//! tests double as the canonical schema/capability refresh: a successful
//! schema phase feeds the fetched schema into resource completion.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use syncra_connector::{guarded, ConnectorGateway, ConnectorResult, ErrorKind, Schema};

use crate::completion::{CompletionStatus, ResourceCompletionService};
use crate::repository::{modify_availability_status, ResourceRepository};
use crate::types::{AvailabilityStatus, ResourceDefinition};

/// The ordered phases of a connection test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestPhase {
    /// Acquire a fresh connector instance.
    Initialization,
    /// Push the resource configuration into the connector.
    Configuration,
    /// The connector's own connectivity check.
    Connection,
    /// Fetch the schema and refresh the stored resource.
    Schema,
}

impl TestPhase {
    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TestPhase::Initialization => "initialization",
            TestPhase::Configuration => "configuration",
            TestPhase::Connection => "connection",
            TestPhase::Schema => "schema",
        }
    }
}

impl std::fmt::Display for TestPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one executed phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PhaseOutcome {
    /// The phase succeeded.
    Success,
    /// The phase failed with a classified error.
    Failure { kind: ErrorKind, message: String },
}

impl PhaseOutcome {
    /// Whether this phase succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, PhaseOutcome::Success)
    }
}

/// The structured result of a connection test. A `None` phase was never
/// attempted because an earlier phase failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionTestReport {
    pub initialization: Option<PhaseOutcome>,
    pub configuration: Option<PhaseOutcome>,
    pub connection: Option<PhaseOutcome>,
    pub schema: Option<PhaseOutcome>,
}

impl ConnectionTestReport {
    /// Outcome of one phase, `None` when the phase was never attempted.
    #[must_use]
    pub fn phase(&self, phase: TestPhase) -> Option<&PhaseOutcome> {
        match phase {
            TestPhase::Initialization => self.initialization.as_ref(),
            TestPhase::Configuration => self.configuration.as_ref(),
            TestPhase::Connection => self.connection.as_ref(),
            TestPhase::Schema => self.schema.as_ref(),
        }
    }

    /// Overall success: every phase ran and succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        [
            &self.initialization,
            &self.configuration,
            &self.connection,
            &self.schema,
        ]
        .iter()
        .all(|outcome| outcome.as_ref().is_some_and(PhaseOutcome::is_success))
    }

    /// The first failing phase, if any.
    #[must_use]
    pub fn first_failure(&self) -> Option<(TestPhase, &PhaseOutcome)> {
        [
            TestPhase::Initialization,
            TestPhase::Configuration,
            TestPhase::Connection,
            TestPhase::Schema,
        ]
        .into_iter()
        .find_map(|phase| {
            self.phase(phase)
                .filter(|outcome| !outcome.is_success())
                .map(|outcome| (phase, outcome))
        })
    }
}

/// Tuning for connection tests.
#[derive(Debug, Clone)]
pub struct TestConfig {
    /// Upper bound for each individual phase.
    pub phase_timeout: Duration,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            phase_timeout: Duration::from_secs(30),
        }
    }
}

/// Runs the connection test protocol for resources.
pub struct ConnectionTester {
    gateway: Arc<dyn ConnectorGateway>,
    repository: Arc<dyn ResourceRepository>,
    completer: Arc<ResourceCompletionService>,
    config: TestConfig,
}

impl ConnectionTester {
    /// Create a tester over the given collaborators.
    pub fn new(
        gateway: Arc<dyn ConnectorGateway>,
        repository: Arc<dyn ResourceRepository>,
        completer: Arc<ResourceCompletionService>,
        config: TestConfig,
    ) -> Self {
        Self {
            gateway,
            repository,
            completer,
            config,
        }
    }

    /// Run all four phases against a resource, stopping at the first
    /// failure.
    #[instrument(skip_all, fields(resource_id = %resource.id, resource = %resource.name))]
    pub async fn test_connection(&self, resource: &ResourceDefinition) -> ConnectionTestReport {
        let mut report = ConnectionTestReport::default();
        let mut resource = resource.clone();

        // Phase 1: a fresh instance, never a pooled one, so initialization
        // itself is exercised.
        let handle = match self
            .run_phase(
                TestPhase::Initialization,
                self.gateway.acquire(resource.connector_id, true),
            )
            .await
        {
            Ok(handle) => {
                report.initialization = Some(PhaseOutcome::Success);
                handle
            }
            Err(outcome) => {
                report.initialization = Some(outcome);
                return report;
            }
        };

        // Phase 2: push configuration.
        match self
            .run_phase(
                TestPhase::Configuration,
                handle.configure(&resource.connector_config),
            )
            .await
        {
            Ok(()) => report.configuration = Some(PhaseOutcome::Success),
            Err(outcome) => {
                report.configuration = Some(outcome);
                return report;
            }
        }

        // Phase 3: the connector's own connectivity check; the result
        // drives the availability transition either way.
        match self
            .run_phase(TestPhase::Connection, handle.test_connection())
            .await
        {
            Ok(()) => {
                report.connection = Some(
                    self.record_availability(&mut resource, AvailabilityStatus::Up)
                        .await,
                );
                if !report.connection.as_ref().is_some_and(PhaseOutcome::is_success) {
                    return report;
                }
            }
            Err(outcome) => {
                if let Err(err) =
                    modify_availability_status(&*self.repository, &mut resource, AvailabilityStatus::Down)
                        .await
                {
                    warn!(error = %err, "failed to record availability transition");
                }
                report.connection = Some(outcome);
                return report;
            }
        }

        // Phase 4: fetch schema, fall back to the statically configured
        // one, and refresh the stored resource through completion.
        report.schema = Some(self.schema_phase(&handle, &resource).await);
        report
    }

    async fn schema_phase(
        &self,
        handle: &Arc<dyn syncra_connector::ConnectorHandle>,
        resource: &ResourceDefinition,
    ) -> PhaseOutcome {
        let fetched = match self
            .run_phase(TestPhase::Schema, handle.fetch_schema())
            .await
        {
            Ok(fetched) => fetched,
            Err(outcome) => return outcome,
        };

        let schema = match fetched {
            Some(schema) if !schema.is_empty() => schema,
            _ => match resource.schema.clone() {
                Some(schema) if !schema.is_empty() => {
                    warn!("connector reported no schema, using statically configured schema");
                    schema
                }
                _ => {
                    return PhaseOutcome::Failure {
                        kind: ErrorKind::Schema,
                        message: "connector reported no schema and none is configured".to_string(),
                    }
                }
            },
        };

        self.refresh_resource(resource, schema).await
    }

    async fn refresh_resource(
        &self,
        resource: &ResourceDefinition,
        schema: Schema,
    ) -> PhaseOutcome {
        match self
            .completer
            .complete_resource(resource.clone(), Some(schema))
            .await
        {
            Ok(completion) => match completion.status {
                CompletionStatus::Degraded { error } => PhaseOutcome::Failure {
                    kind: error.kind(),
                    message: error.to_string(),
                },
                CompletionStatus::Fresh | CompletionStatus::Completed => PhaseOutcome::Success,
            },
            Err(err) => PhaseOutcome::Failure {
                kind: err.kind(),
                message: err.to_string(),
            },
        }
    }

    async fn record_availability(
        &self,
        resource: &mut ResourceDefinition,
        status: AvailabilityStatus,
    ) -> PhaseOutcome {
        match modify_availability_status(&*self.repository, resource, status).await {
            Ok(()) => PhaseOutcome::Success,
            Err(err) => PhaseOutcome::Failure {
                kind: err.kind(),
                message: err.to_string(),
            },
        }
    }

    /// Run one connector call under the phase timeout, converting panics,
    /// errors, and elapsed timeouts into a phase failure.
    async fn run_phase<T, F>(&self, phase: TestPhase, fut: F) -> Result<T, PhaseOutcome>
    where
        F: Future<Output = ConnectorResult<T>>,
    {
        match tokio::time::timeout(self.config.phase_timeout, guarded(phase.as_str(), fut)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                warn!(phase = %phase, error = %err, "connection test phase failed");
                Err(PhaseOutcome::Failure {
                    kind: err.kind(),
                    message: err.to_string(),
                })
            }
            Err(_elapsed) => {
                warn!(phase = %phase, "connection test phase timed out");
                Err(PhaseOutcome::Failure {
                    kind: ErrorKind::Communication,
                    message: format!(
                        "phase {phase} timed out after {} seconds",
                        self.config.phase_timeout.as_secs()
                    ),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_success_requires_all_phases() {
        let mut report = ConnectionTestReport {
            initialization: Some(PhaseOutcome::Success),
            configuration: Some(PhaseOutcome::Success),
            connection: Some(PhaseOutcome::Success),
            schema: None,
        };
        assert!(!report.is_success());

        report.schema = Some(PhaseOutcome::Success);
        assert!(report.is_success());
    }

    #[test]
    fn test_first_failure_picks_earliest_phase() {
        let report = ConnectionTestReport {
            initialization: Some(PhaseOutcome::Success),
            configuration: Some(PhaseOutcome::Failure {
                kind: ErrorKind::Configuration,
                message: "bad port".to_string(),
            }),
            connection: None,
            schema: None,
        };
        let (phase, outcome) = report.first_failure().unwrap();
        assert_eq!(phase, TestPhase::Configuration);
        assert!(!outcome.is_success());
    }
}
