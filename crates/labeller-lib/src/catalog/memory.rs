//! In-memory resource store
//!
//! Used by tests and dry runs. Writes bump a numeric resourceVersion so
//! conditional patches behave the way they do against the API server.

use super::ResourceStore;
use crate::error::Error;
use crate::models::{ManagedResource, ResourceTypeDescriptor};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// [`ResourceStore`] holding resources in a map keyed by collection
#[derive(Default)]
pub struct MemoryResourceStore {
    collections: RwLock<HashMap<ResourceTypeDescriptor, Vec<ManagedResource>>>,
    unavailable: RwLock<HashSet<ResourceTypeDescriptor>>,
    writes: AtomicUsize,
}

impl MemoryResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a resource in a collection
    pub async fn insert(&self, descriptor: &ResourceTypeDescriptor, mut resource: ManagedResource) {
        if resource.resource_version.is_none() {
            resource.resource_version = Some("1".to_string());
        }
        let mut collections = self.collections.write().await;
        let items = collections.entry(descriptor.clone()).or_default();
        match items.iter_mut().find(|r| r.name == resource.name) {
            Some(existing) => *existing = resource,
            None => items.push(resource),
        }
    }

    /// Remove a resource, returning whether it existed
    pub async fn remove(&self, descriptor: &ResourceTypeDescriptor, name: &str) -> bool {
        let mut collections = self.collections.write().await;
        match collections.get_mut(descriptor) {
            Some(items) => {
                let before = items.len();
                items.retain(|r| r.name != name);
                items.len() != before
            }
            None => false,
        }
    }

    /// Make every call for a collection fail as if the backend were down
    pub async fn mark_unavailable(&self, descriptor: &ResourceTypeDescriptor) {
        self.unavailable.write().await.insert(descriptor.clone());
    }

    /// Current stored copy of a resource
    pub async fn resource(
        &self,
        descriptor: &ResourceTypeDescriptor,
        name: &str,
    ) -> Option<ManagedResource> {
        self.collections
            .read()
            .await
            .get(descriptor)
            .and_then(|items| items.iter().find(|r| r.name == name).cloned())
    }

    /// Number of successful label writes
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    async fn check_available(&self, descriptor: &ResourceTypeDescriptor) -> Result<(), Error> {
        if self.unavailable.read().await.contains(descriptor) {
            return Err(Error::backend(descriptor.to_string(), "collection unavailable"));
        }
        Ok(())
    }
}

fn bump_version(current: Option<&str>) -> String {
    let next = current.and_then(|v| v.parse::<u64>().ok()).unwrap_or(0) + 1;
    next.to_string()
}

#[async_trait]
impl ResourceStore for MemoryResourceStore {
    async fn list(
        &self,
        descriptor: &ResourceTypeDescriptor,
    ) -> Result<Vec<ManagedResource>, Error> {
        self.check_available(descriptor).await?;
        Ok(self
            .collections
            .read()
            .await
            .get(descriptor)
            .cloned()
            .unwrap_or_default())
    }

    async fn get(
        &self,
        descriptor: &ResourceTypeDescriptor,
        name: &str,
    ) -> Result<ManagedResource, Error> {
        self.check_available(descriptor).await?;
        self.resource(descriptor, name)
            .await
            .ok_or_else(|| Error::not_found(format!("{}/{}", descriptor.kind, name)))
    }

    async fn patch_labels(
        &self,
        descriptor: &ResourceTypeDescriptor,
        name: &str,
        labels: &BTreeMap<String, String>,
        resource_version: Option<&str>,
    ) -> Result<(), Error> {
        self.check_available(descriptor).await?;
        let key = format!("{}/{}", descriptor.kind, name);

        let mut collections = self.collections.write().await;
        let stored = collections
            .get_mut(descriptor)
            .and_then(|items| items.iter_mut().find(|r| r.name == name))
            .ok_or_else(|| Error::not_found(key.clone()))?;

        if let Some(expected) = resource_version {
            if stored.resource_version.as_deref() != Some(expected) {
                return Err(Error::conflict(
                    key,
                    format!(
                        "resourceVersion {} does not match stored {}",
                        expected,
                        stored.resource_version.as_deref().unwrap_or("<none>")
                    ),
                ));
            }
        }

        for (k, v) in labels {
            stored.labels.insert(k.clone(), v.clone());
        }
        stored.resource_version = Some(bump_version(stored.resource_version.as_deref()));
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redis() -> ResourceTypeDescriptor {
        ResourceTypeDescriptor::new("redis.gcp.upbound.io", "v1beta1", "instances", "Instance")
    }

    fn cache() -> ManagedResource {
        ManagedResource::new("redis.gcp.upbound.io/v1beta1", "Instance", "cache-1")
            .with_label("team", "core")
    }

    #[tokio::test]
    async fn test_insert_list_get() {
        let store = MemoryResourceStore::new();
        store.insert(&redis(), cache()).await;

        let listed = store.list(&redis()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].resource_version.as_deref(), Some("1"));

        let fetched = store.get(&redis(), "cache-1").await.unwrap();
        assert_eq!(fetched.labels["team"], "core");

        assert!(matches!(
            store.get(&redis(), "missing").await,
            Err(Error::ResourceNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_patch_merges_and_bumps_version() {
        let store = MemoryResourceStore::new();
        store.insert(&redis(), cache()).await;

        let labels = BTreeMap::from([("owner".to_string(), "payments".to_string())]);
        store
            .patch_labels(&redis(), "cache-1", &labels, Some("1"))
            .await
            .unwrap();

        let stored = store.resource(&redis(), "cache-1").await.unwrap();
        assert_eq!(stored.labels["team"], "core");
        assert_eq!(stored.labels["owner"], "payments");
        assert_eq!(stored.resource_version.as_deref(), Some("2"));
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_stale_version_conflicts() {
        let store = MemoryResourceStore::new();
        store.insert(&redis(), cache()).await;

        let labels = BTreeMap::from([("owner".to_string(), "payments".to_string())]);
        let result = store.patch_labels(&redis(), "cache-1", &labels, Some("0")).await;
        assert!(matches!(result, Err(Error::ResourceConflict { .. })));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_collection() {
        let store = MemoryResourceStore::new();
        store.insert(&redis(), cache()).await;
        store.mark_unavailable(&redis()).await;

        assert!(matches!(
            store.list(&redis()).await,
            Err(Error::BackendUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_remove() {
        let store = MemoryResourceStore::new();
        store.insert(&redis(), cache()).await;
        assert!(store.remove(&redis(), "cache-1").await);
        assert!(!store.remove(&redis(), "cache-1").await);
        assert!(store.list(&redis()).await.unwrap().is_empty());
    }
}
