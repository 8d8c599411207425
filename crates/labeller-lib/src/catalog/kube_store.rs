//! Resource store backed by the Kubernetes API
//!
//! Managed resources are cluster-scoped custom resources whose schema the
//! labeller does not compile in, so every call goes through
//! `DynamicObject` with an `ApiResource` built from the catalog descriptor.

use super::ResourceStore;
use crate::document::Document;
use crate::error::Error;
use crate::models::{ManagedResource, ResourceTypeDescriptor};
use async_trait::async_trait;
use kube::api::{Api, DynamicObject, ListParams, Patch, PatchParams};
use kube::discovery::ApiResource;
use kube::Client;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Field manager recorded on label patches
const FIELD_MANAGER: &str = "styx-labeller";

/// [`ResourceStore`] over a live cluster
#[derive(Clone)]
pub struct KubeResourceStore {
    client: Client,
}

impl KubeResourceStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, descriptor: &ResourceTypeDescriptor) -> Api<DynamicObject> {
        Api::all_with(self.client.clone(), &api_resource(descriptor))
    }
}

fn api_resource(descriptor: &ResourceTypeDescriptor) -> ApiResource {
    ApiResource {
        group: descriptor.group.clone(),
        version: descriptor.version.clone(),
        api_version: descriptor.api_version(),
        kind: descriptor.kind.clone(),
        plural: descriptor.plural.clone(),
    }
}

/// Convert a dynamic object into the labeller's resource shape
pub(crate) fn to_managed(
    obj: DynamicObject,
    descriptor: &ResourceTypeDescriptor,
) -> Result<ManagedResource, Error> {
    let name = obj
        .metadata
        .name
        .clone()
        .ok_or_else(|| Error::malformed(format!("{} object without a name", descriptor)))?;

    // List items usually carry their own type meta; fall back to the collection's
    let (api_version, kind) = match &obj.types {
        Some(types) => (types.api_version.clone(), types.kind.clone()),
        None => (descriptor.api_version(), descriptor.kind.clone()),
    };

    let section = |key: &str| {
        obj.data
            .get(key)
            .cloned()
            .map(Document::from)
            .unwrap_or_default()
    };

    Ok(ManagedResource {
        api_version,
        kind,
        name,
        labels: obj.metadata.labels.clone().unwrap_or_default(),
        resource_version: obj.metadata.resource_version.clone(),
        spec: section("spec"),
        status: section("status"),
    })
}

#[async_trait]
impl ResourceStore for KubeResourceStore {
    async fn list(
        &self,
        descriptor: &ResourceTypeDescriptor,
    ) -> Result<Vec<ManagedResource>, Error> {
        let list = self
            .api(descriptor)
            .list(&ListParams::default())
            .await
            .map_err(|e| Error::backend(descriptor.to_string(), e.to_string()))?;

        let mut resources = Vec::with_capacity(list.items.len());
        for obj in list.items {
            match to_managed(obj, descriptor) {
                Ok(resource) => resources.push(resource),
                Err(e) => warn!(error = %e, gvr = %descriptor, "Skipping undecodable resource"),
            }
        }

        debug!(gvr = %descriptor, count = resources.len(), "Listed managed resources");
        Ok(resources)
    }

    async fn get(
        &self,
        descriptor: &ResourceTypeDescriptor,
        name: &str,
    ) -> Result<ManagedResource, Error> {
        let key = format!("{}/{}", descriptor.kind, name);
        let obj = self
            .api(descriptor)
            .get(name)
            .await
            .map_err(|e| Error::from_kube(&key, e))?;
        to_managed(obj, descriptor)
    }

    async fn patch_labels(
        &self,
        descriptor: &ResourceTypeDescriptor,
        name: &str,
        labels: &BTreeMap<String, String>,
        resource_version: Option<&str>,
    ) -> Result<(), Error> {
        let key = format!("{}/{}", descriptor.kind, name);

        let mut metadata = serde_json::json!({ "labels": labels });
        if let Some(rv) = resource_version {
            // A resourceVersion in the patch body is checked as a precondition
            metadata["resourceVersion"] = serde_json::Value::String(rv.to_string());
        }
        let patch = serde_json::json!({ "metadata": metadata });

        self.api(descriptor)
            .patch(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch))
            .await
            .map_err(|e| Error::from_kube(&key, e))?;

        Ok(())
    }
}
