//! # Syncra Resource
//!
//! Resource management for the Syncra identity platform: stored resource
//! definitions, their completion against live connectors, capability
//! negotiation, the versioned resource cache, and the connection test
//! protocol.
//!
//! ## Modules
//!
//! - [`types`]: Resource definitions and availability state
//! - [`repository`]: Persistence contract and in-memory implementation
//! - [`negotiator`]: Schema adjustment for simulated capabilities
//! - [`completion`]: Single-flight resource completion
//! - [`cache`]: Versioned cache of complete definitions
//! - [`manager`]: The `get_complete_resource` front door
//! - [`test_protocol`]: Four-phase connection testing
//! - [`error`]: Error types

pub mod cache;
pub mod completion;
pub mod error;
pub mod manager;
pub mod negotiator;
pub mod repository;
pub mod test_protocol;
pub mod types;

pub use cache::ResourceCache;
pub use completion::{Completion, CompletionStatus, ResourceCompletionService};
pub use error::{ResourceError, ResourceResult};
pub use manager::{CompleteResource, ResourceManager};
pub use negotiator::adjust_schema_for_simulated_capabilities;
pub use repository::{
    modify_availability_status, InMemoryResourceRepository, ResourceModification,
    ResourceRepository,
};
pub use test_protocol::{
    ConnectionTestReport, ConnectionTester, PhaseOutcome, TestConfig, TestPhase,
};
pub use types::{AvailabilityStatus, ResourceDefinition};
