//! Match resolution
//!
//! Resolution runs in two phases:
//! 1. A name phase that scores every resource in the catalog against the
//!    target and keeps those above the threshold.
//! 2. An optional network phase that adds resources sharing an address with
//!    the workload, at a fixed confidence.
//!
//! Both phases skip collections that fail to list, so a partial backend
//! outage narrows the result instead of failing it.


use crate::catalog::ResourceCatalog;
use crate::models::{MatchSource, ResourceKey, ResourceMatch};
use crate::network_index::NetworkIndexCache;
use crate::observability::LabellerMetrics;
use crate::scorer::ConfidenceScorer;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolver tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Name-phase matches must score strictly above this
    pub match_threshold: f64,
    /// Confidence assigned to network-evidence matches
    pub network_confidence: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            match_threshold: 0.30,
            network_confidence: 0.90,
        }
    }
}

/// Reason recorded on a network-evidence match
pub fn network_reason(address: &str) -> String {
    format!("Network connection detected from pod IP {}", address)
}

/// Highest confidence first; ties keep discovery order
pub fn sort_matches(matches: &mut [ResourceMatch]) {
    matches.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
}

/// Resolves workload names and addresses to managed resources
#[derive(Clone)]
pub struct MatchResolver {
    catalog: ResourceCatalog,
    scorer: ConfidenceScorer,
    config: ResolverConfig,
    index: Arc<NetworkIndexCache>,
    metrics: LabellerMetrics,
}

impl MatchResolver {
    pub fn new(
        catalog: ResourceCatalog,
        scorer: ConfidenceScorer,
        config: ResolverConfig,
        index: Arc<NetworkIndexCache>,
    ) -> Self {
        Self {
            catalog,
            scorer,
            config,
            index,
            metrics: LabellerMetrics::new(),
        }
    }

    pub fn catalog(&self) -> &ResourceCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn index(&self) -> &Arc<NetworkIndexCache> {
        &self.index
    }

    /// Score every catalog resource against `target`
    pub async fn resolve_by_name(&self, target: &str) -> Vec<ResourceMatch> {
        if target.trim().is_empty() {
            warn!("Refusing to resolve an empty target");
            return Vec::new();
        }

        let mut seen: HashSet<ResourceKey> = HashSet::new();
        let mut matches = Vec::new();

        for descriptor in self.catalog.resource_types() {
            let resources = match self.catalog.list_instances(descriptor).await {
                Ok(resources) => resources,
                Err(e) => {
                    warn!(error = %e, gvr = %descriptor, "Failed to list resources, skipping type");
                    self.metrics.inc_backend_errors();
                    continue;
                }
            };

            for resource in resources {
                if !seen.insert(resource.key()) {
                    continue;
                }

                let score = self.scorer.score(&resource, target);
                if score.is_empty() || score.confidence <= self.config.match_threshold {
                    continue;
                }

                debug!(
                    target = %target,
                    resource = %resource.key(),
                    confidence = score.confidence,
                    reasons = score.reasons.len(),
                    "Name match"
                );
                matches.push(ResourceMatch {
                    resource,
                    confidence: score.confidence,
                    reasons: score.reasons,
                    source: MatchSource::Metadata,
                });
            }
        }

        sort_matches(&mut matches);
        matches
    }

    /// Name phase followed by the network phase for `addresses`
    pub async fn resolve_by_name_with_network(
        &self,
        target: &str,
        addresses: &[String],
    ) -> Vec<ResourceMatch> {
        let matches = self.resolve_by_name(target).await;
        self.attach_network_matches(matches, addresses).await
    }

    /// Add resources sharing an address with the workload
    ///
    /// Resources already present are left untouched. The combined list is
    /// re-sorted.
    pub async fn attach_network_matches(
        &self,
        matches: Vec<ResourceMatch>,
        addresses: &[String],
    ) -> Vec<ResourceMatch> {
        self.attach_network_matches_at(matches, addresses, Utc::now())
            .await
    }

    /// [`attach_network_matches`](Self::attach_network_matches) with an
    /// explicit clock for the index staleness check
    pub async fn attach_network_matches_at(
        &self,
        mut matches: Vec<ResourceMatch>,
        addresses: &[String],
        now: DateTime<Utc>,
    ) -> Vec<ResourceMatch> {
        if addresses.is_empty() {
            return matches;
        }

        let index = self.index.get_or_rebuild(&self.catalog, now).await;
        let mut seen: HashSet<ResourceKey> = matches.iter().map(ResourceMatch::key).collect();

        for address in addresses {
            let Some(connected) = index.lookup(address) else {
                continue;
            };

            for id in connected {
                if seen.contains(&id.key()) {
                    continue;
                }

                let resource = match self.catalog.get(id).await {
                    Ok(resource) => resource,
                    Err(e) => {
                        warn!(error = %e, resource = %id.key(), "Failed to fetch network-connected resource");
                        self.metrics.inc_backend_errors();
                        continue;
                    }
                };

                debug!(address = %address, resource = %id.key(), "Network match");
                seen.insert(id.key());
                matches.push(ResourceMatch {
                    resource,
                    confidence: self.config.network_confidence,
                    reasons: vec![network_reason(address)],
                    source: MatchSource::Network,
                });
            }
        }

        sort_matches(&mut matches);
        matches
    }
}
