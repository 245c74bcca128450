//! # Syncra Mapping
//!
//! The attribute mapping engine of the Syncra identity platform:
//! bidirectional mapping rules between identity objects and
//! resource-native objects, evaluated against a complete resource
//! definition and producing generic modifications.
//!
//! ## Modules
//!
//! - [`rules`]: The mapping rule model ([`AttributeMapping`], [`OutboundRule`], [`InboundRule`])
//! - [`bindings`]: Per-rule variable scopes and the [`ObjectResolver`] contract
//! - [`expression`]: Sandboxed Rhai expression evaluation
//! - [`filters`]: Value filter registry and built-ins
//! - [`engine`]: The [`MappingEngine`] entry point
//! - [`error`]: Error types

pub mod bindings;
pub mod engine;
pub mod error;
pub mod expression;
pub mod filters;
mod inbound;
mod outbound;
pub mod rules;

pub use bindings::{ObjectResolver, VariableBindings};
pub use engine::{MappingEngine, MappingIssue, MappingOutcome};
pub use error::{MappingError, MappingResult};
pub use expression::{ExpressionConfig, ExpressionEvaluator};
pub use filters::{apply_filter_chain, FilterRegistry, ValueFilter};
pub use rules::{
    AttributeMapping, FilterSpec, InboundRule, ObjectRef, OutboundRule, VariableDeclaration,
};
