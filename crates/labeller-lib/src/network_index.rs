//! Address-to-resource index
//!
//! The index maps every address advertised by a managed resource to the
//! resources advertising it. It is rebuilt wholesale from a full catalog
//! scan and published by swapping an `Arc`, so readers always see one
//! complete snapshot.

use crate::catalog::ResourceCatalog;
use crate::models::ResourceIdentifier;
use crate::observability::{LabellerMetrics, StructuredLogger};
use crate::signals::extract_addresses;
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Default time after which the index is considered stale
pub const DEFAULT_INDEX_TTL_SECS: i64 = 30 * 60;

/// Summary of one rebuild
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildStats {
    pub types_listed: usize,
    pub types_failed: usize,
    pub resources_with_addresses: usize,
    pub addresses: usize,
}

/// Immutable snapshot of address → resources
#[derive(Debug, Clone, Default)]
pub struct NetworkIndex {
    entries: HashMap<String, BTreeSet<ResourceIdentifier>>,
    built_at: Option<DateTime<Utc>>,
}

impl NetworkIndex {
    /// Scan every catalog type and index the addresses found
    ///
    /// Types that fail to list are logged and skipped; the build itself
    /// never fails.
    pub async fn build(catalog: &ResourceCatalog, now: DateTime<Utc>) -> (Self, RebuildStats) {
        let mut entries: HashMap<String, BTreeSet<ResourceIdentifier>> = HashMap::new();
        let mut stats = RebuildStats::default();

        for descriptor in catalog.resource_types() {
            let resources = match catalog.list_instances(descriptor).await {
                Ok(resources) => resources,
                Err(e) => {
                    warn!(error = %e, gvr = %descriptor, "Failed to list resources for network index");
                    stats.types_failed += 1;
                    continue;
                }
            };
            stats.types_listed += 1;

            for resource in &resources {
                let addresses = extract_addresses(resource);
                if addresses.is_empty() {
                    continue;
                }
                stats.resources_with_addresses += 1;

                let id = resource.identifier();
                for address in addresses {
                    debug!(resource = %id.key(), address = %address, "Indexed address");
                    entries.entry(address).or_default().insert(id.clone());
                }
            }
        }

        stats.addresses = entries.len();
        (
            Self {
                entries,
                built_at: Some(now),
            },
            stats,
        )
    }

    /// Build an index from explicit entries
    pub fn from_entries(
        entries: impl IntoIterator<Item = (String, ResourceIdentifier)>,
        built_at: DateTime<Utc>,
    ) -> Self {
        let mut map: HashMap<String, BTreeSet<ResourceIdentifier>> = HashMap::new();
        for (address, id) in entries {
            map.entry(address).or_default().insert(id);
        }
        Self {
            entries: map,
            built_at: Some(built_at),
        }
    }

    /// Resources advertising `address`
    pub fn lookup(&self, address: &str) -> Option<&BTreeSet<ResourceIdentifier>> {
        self.entries.get(address)
    }

    pub fn built_at(&self) -> Option<DateTime<Utc>> {
        self.built_at
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate (address, resources) pairs in address order
    pub fn entries(&self) -> Vec<(&str, &BTreeSet<ResourceIdentifier>)> {
        let mut out: Vec<_> = self.entries.iter().map(|(k, v)| (k.as_str(), v)).collect();
        out.sort_by(|a, b| a.0.cmp(b.0));
        out
    }

    /// Empty, never built, or older than `ttl`
    pub fn is_stale(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match self.built_at {
            None => true,
            Some(_) if self.entries.is_empty() => true,
            Some(built_at) => now - built_at > ttl,
        }
    }
}

/// Shared, lazily refreshed index
#[derive(Debug)]
pub struct NetworkIndexCache {
    current: RwLock<Arc<NetworkIndex>>,
    ttl: Duration,
    logger: StructuredLogger,
}

impl Default for NetworkIndexCache {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_INDEX_TTL_SECS))
    }
}

impl NetworkIndexCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            current: RwLock::new(Arc::new(NetworkIndex::default())),
            ttl,
            logger: StructuredLogger::default(),
        }
    }

    /// Report rebuilds through `logger` instead of the default instance
    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn logger(&self) -> &StructuredLogger {
        &self.logger
    }

    /// Current snapshot without refreshing
    pub async fn snapshot(&self) -> Arc<NetworkIndex> {
        self.current.read().await.clone()
    }

    /// Replace the snapshot
    pub async fn install(&self, index: NetworkIndex) {
        *self.current.write().await = Arc::new(index);
    }

    /// Rebuild from the catalog and publish the result
    pub async fn rebuild(&self, catalog: &ResourceCatalog, now: DateTime<Utc>) -> RebuildStats {
        let (index, stats) = NetworkIndex::build(catalog, now).await;
        self.install(index).await;

        LabellerMetrics::new().record_index_rebuild(stats.addresses);
        self.logger.log_index_rebuilt(&stats);
        stats
    }

    /// Current snapshot, rebuilt first when stale
    pub async fn get_or_rebuild(
        &self,
        catalog: &ResourceCatalog,
        now: DateTime<Utc>,
    ) -> Arc<NetworkIndex> {
        let snapshot = self.snapshot().await;
        if !snapshot.is_stale(now, self.ttl) {
            return snapshot;
        }
        self.rebuild(catalog, now).await;
        self.snapshot().await
    }
}
