//! Label application on managed resources

use crate::catalog::ResourceCatalog;
use crate::error::Error;
use crate::models::ManagedResource;
use std::collections::BTreeMap;
use tracing::debug;

/// Result of one apply call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelOutcome {
    /// Labels were written
    Updated,
    /// Every desired label was already present
    Unchanged,
}

/// Merges desired labels into resources through the catalog's store
#[derive(Clone)]
pub struct LabelApplier {
    catalog: ResourceCatalog,
}

impl LabelApplier {
    pub fn new(catalog: ResourceCatalog) -> Self {
        Self { catalog }
    }

    /// Merge `desired` into the current labels of `resource`
    ///
    /// The resource is re-read first; the write is skipped when nothing
    /// changes and is otherwise conditional on the version just read.
    pub async fn apply(
        &self,
        resource: &ManagedResource,
        desired: &BTreeMap<String, String>,
    ) -> Result<LabelOutcome, Error> {
        let id = resource.identifier();
        let descriptor = self.catalog.descriptor_for(&id);
        let fresh = self.catalog.store().get(&descriptor, &id.name).await?;

        let mut merged = fresh.labels.clone();
        merged.extend(desired.iter().map(|(k, v)| (k.clone(), v.clone())));

        if merged == fresh.labels {
            debug!(resource = %id.key(), "Labels already up to date");
            return Ok(LabelOutcome::Unchanged);
        }

        self.catalog
            .store()
            .patch_labels(&descriptor, &id.name, &merged, fresh.resource_version.as_deref())
            .await?;

        debug!(resource = %id.key(), labels = merged.len(), "Updated labels");
        Ok(LabelOutcome::Updated)
    }
}
