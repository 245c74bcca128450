//! # Syncra Connector
//!
//! Connector abstractions for the Syncra identity platform: the traits
//! a target-system integration implements, the schema and capability
//! types it reports, and the object/delta representation shared by
//! everything that talks to external systems.
//!
//! ## Modules
//!
//! - [`traits`]: Core connector traits ([`ConnectorHandle`], [`ConnectorGateway`])
//! - [`schema`]: Target system schema ([`Schema`], [`ObjectClass`], [`SchemaAttribute`])
//! - [`capability`]: Capability declarations and layering ([`Capability`], [`CapabilitySet`])
//! - [`object`]: Object trees, paths, and deltas ([`AttributePath`], [`Modification`])
//! - [`error`]: Error taxonomy ([`ConnectorError`], [`ErrorKind`])
//! - [`ids`]: Typed identifiers

pub mod capability;
pub mod error;
pub mod ids;
pub mod object;
pub mod schema;
pub mod traits;

pub use capability::{Capability, CapabilityKind, CapabilitySet};
pub use error::{ConnectorError, ConnectorResult, ErrorKind};
pub use ids::{ConnectorId, ResourceId};
pub use object::{apply_modifications, get_path, AttributePath, Modification, ModificationOp};
pub use schema::{AttributeDataType, ObjectClass, Schema, SchemaAttribute};
pub use traits::{guarded, ConnectorGateway, ConnectorHandle};
