//! Subcommand implementations
//!
//! Every command talks to the cluster directly through the resolution
//! library; there is no controller API in between.

pub mod index;
pub mod label;
pub mod resolve;
pub mod types;

use labeller_lib::{
    ConfidenceScorer, KubeResourceStore, MatchResolver, NetworkIndexCache, ResolverConfig,
    ResourceCatalog,
};
use std::sync::Arc;

/// Resolver over the live cluster with default tuning
pub fn resolver(client: kube::Client) -> MatchResolver {
    let catalog = ResourceCatalog::new(Arc::new(KubeResourceStore::new(client)));
    MatchResolver::new(
        catalog,
        ConfidenceScorer::default(),
        ResolverConfig::default(),
        Arc::new(NetworkIndexCache::default()),
    )
}
