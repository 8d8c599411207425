//! Resource-identity resolution for Crossplane managed resources
//!
//! This crate provides the core functionality for:
//! - Enumerating and reading managed resources
//! - Scoring how likely a resource belongs to a workload
//! - Indexing resource network addresses
//! - Merging workload labels into matched resources
//! - Periodic labelling passes with status and health reporting

pub mod catalog;
pub mod document;
pub mod error;
pub mod health;
pub mod labels;
pub mod models;
pub mod network_index;
pub mod observability;
pub mod reconcile;
pub mod resolver;
pub mod scorer;
pub mod signals;

pub use catalog::{KubeResourceStore, MemoryResourceStore, ResourceCatalog, ResourceStore};
pub use document::Document;
pub use error::Error;
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use labels::{LabelApplier, LabelOutcome};
pub use models::*;
pub use network_index::{NetworkIndex, NetworkIndexCache, RebuildStats};
pub use observability::{LabellerMetrics, StructuredLogger};
pub use reconcile::{LabellerSpec, LabellerStatus, LabellingPass, PassReport, ReconcileLoop};
pub use resolver::{MatchResolver, ResolverConfig};
pub use scorer::{ConfidenceScorer, Score, ScoringPolicy};
