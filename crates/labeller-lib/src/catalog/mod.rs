//! Catalog of watched managed-resource types
//!
//! This module enumerates the Crossplane resource collections the labeller
//! inspects and provides the [`ResourceStore`] seam through which instances
//! are listed, fetched and patched. Two stores are provided: one backed by
//! the Kubernetes API and one held in memory.

mod kube_store;
mod memory;

pub use kube_store::KubeResourceStore;
pub use memory::MemoryResourceStore;

use crate::error::Error;
use crate::models::{ManagedResource, ResourceIdentifier, ResourceTypeDescriptor};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// (group, version, plural, kind) of every watched collection
const RESOURCE_TYPES: &[(&str, &str, &str, &str)] = &[
    // Compute
    ("compute.gcp.upbound.io", "v1beta1", "instances", "Instance"),
    ("compute.gcp.upbound.io", "v1beta1", "disks", "Disk"),
    ("compute.gcp.upbound.io", "v1beta1", "firewalls", "Firewall"),
    ("compute.gcp.upbound.io", "v1beta1", "networks", "Network"),
    ("compute.gcp.upbound.io", "v1beta1", "subnetworks", "Subnetwork"),
    ("compute.gcp.upbound.io", "v1beta1", "routers", "Router"),
    ("compute.gcp.upbound.io", "v1beta1", "addresses", "Address"),
    // Storage
    ("storage.gcp.upbound.io", "v1beta1", "buckets", "Bucket"),
    ("storage.gcp.upbound.io", "v1beta1", "bucketiammembers", "BucketIAMMember"),
    ("storage.gcp.upbound.io", "v1beta1", "bucketobjects", "BucketObject"),
    // SQL
    ("sql.gcp.upbound.io", "v1beta1", "databaseinstances", "DatabaseInstance"),
    ("sql.gcp.upbound.io", "v1beta2", "databaseinstances", "DatabaseInstance"),
    ("sql.gcp.upbound.io", "v1beta1", "databases", "Database"),
    ("sql.gcp.upbound.io", "v1beta1", "users", "User"),
    ("sql.gcp.upbound.io", "v1beta1", "sslcerts", "SSLCert"),
    // Cache
    ("redis.gcp.upbound.io", "v1beta1", "instances", "Instance"),
    // Bigtable
    ("bigtable.gcp.upbound.io", "v1beta1", "instances", "Instance"),
    ("bigtable.gcp.upbound.io", "v1beta1", "tables", "Table"),
    // Spanner
    ("spanner.gcp.upbound.io", "v1beta1", "instances", "Instance"),
    ("spanner.gcp.upbound.io", "v1beta1", "databases", "Database"),
    // Messaging
    ("pubsub.gcp.upbound.io", "v1beta1", "topics", "Topic"),
    ("pubsub.gcp.upbound.io", "v1beta1", "subscriptions", "Subscription"),
    ("pubsub.gcp.upbound.io", "v1beta1", "topiciammembers", "TopicIAMMember"),
    // Functions
    ("cloudfunctions.gcp.upbound.io", "v1beta1", "functions", "Function"),
    // Key management
    ("kms.gcp.upbound.io", "v1beta1", "cryptokeys", "CryptoKey"),
    ("kms.gcp.upbound.io", "v1beta1", "keyrings", "KeyRing"),
    // Scheduling
    ("cloudscheduler.gcp.upbound.io", "v1beta1", "jobs", "Job"),
    // IAM
    ("iam.gcp.upbound.io", "v1beta1", "serviceaccounts", "ServiceAccount"),
    ("iam.gcp.upbound.io", "v1beta1", "serviceaccountkeys", "ServiceAccountKey"),
    ("cloudplatform.gcp.upbound.io", "v1beta1", "serviceaccounts", "ServiceAccount"),
    ("cloudplatform.gcp.upbound.io", "v1beta1", "serviceaccountiammembers", "ServiceAccountIAMMember"),
    ("cloudplatform.gcp.upbound.io", "v1beta1", "projectiammembers", "ProjectIAMMember"),
];

/// The compiled-in list of watched collections, in scan order
pub fn resource_types() -> Vec<ResourceTypeDescriptor> {
    RESOURCE_TYPES
        .iter()
        .map(|(group, version, plural, kind)| {
            ResourceTypeDescriptor::new(*group, *version, *plural, *kind)
        })
        .collect()
}

/// Best-effort plural for a kind that is not in the catalog
pub fn pluralize_kind(kind: &str) -> String {
    let lower = kind.to_lowercase();
    if lower.ends_with('s') || lower.ends_with('x') || lower.ends_with("ch") || lower.ends_with("sh")
    {
        format!("{}es", lower)
    } else if let Some(stem) = lower.strip_suffix('y') {
        match stem.chars().last() {
            Some(c) if !"aeiou".contains(c) => format!("{}ies", stem),
            _ => format!("{}s", lower),
        }
    } else {
        format!("{}s", lower)
    }
}

/// Backend holding managed resources
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// List every instance of one collection
    async fn list(&self, descriptor: &ResourceTypeDescriptor)
        -> Result<Vec<ManagedResource>, Error>;

    /// Fetch one instance by name, fresh from the backend
    async fn get(
        &self,
        descriptor: &ResourceTypeDescriptor,
        name: &str,
    ) -> Result<ManagedResource, Error>;

    /// Merge-patch the labels of one instance
    ///
    /// When `resource_version` is set the write only succeeds if the stored
    /// object still carries that version; otherwise it fails with
    /// [`Error::ResourceConflict`].
    async fn patch_labels(
        &self,
        descriptor: &ResourceTypeDescriptor,
        name: &str,
        labels: &BTreeMap<String, String>,
        resource_version: Option<&str>,
    ) -> Result<(), Error>;
}

/// Watched resource types bound to the store that serves them
#[derive(Clone)]
pub struct ResourceCatalog {
    store: Arc<dyn ResourceStore>,
    types: Vec<ResourceTypeDescriptor>,
}

impl ResourceCatalog {
    /// Catalog over the compiled-in resource types
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self::with_types(store, resource_types())
    }

    /// Catalog over an explicit list of types
    pub fn with_types(store: Arc<dyn ResourceStore>, types: Vec<ResourceTypeDescriptor>) -> Self {
        Self { store, types }
    }

    pub fn resource_types(&self) -> &[ResourceTypeDescriptor] {
        &self.types
    }

    pub fn store(&self) -> &Arc<dyn ResourceStore> {
        &self.store
    }

    /// List live instances of one type
    pub async fn list_instances(
        &self,
        descriptor: &ResourceTypeDescriptor,
    ) -> Result<Vec<ManagedResource>, Error> {
        self.store.list(descriptor).await
    }

    /// Map an identifier back to the collection that holds it
    pub fn descriptor_for(&self, id: &ResourceIdentifier) -> ResourceTypeDescriptor {
        self.types
            .iter()
            .find(|d| d.group == id.group && d.version == id.version && d.kind == id.kind)
            .cloned()
            .unwrap_or_else(|| {
                ResourceTypeDescriptor::new(
                    id.group.clone(),
                    id.version.clone(),
                    pluralize_kind(&id.kind),
                    id.kind.clone(),
                )
            })
    }

    /// Fetch the current state of an identified resource
    pub async fn get(&self, id: &ResourceIdentifier) -> Result<ManagedResource, Error> {
        let descriptor = self.descriptor_for(id);
        self.store.get(&descriptor, &id.name).await
    }
}
