//! Workload discovery: namespaces and pods
//!
//! The labelling pass only needs names, labels and addresses of pods, so
//! the Kubernetes objects are reduced to [`PodInfo`] at this boundary.

use crate::error::Error;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Pod};
use kube::api::{Api, ListParams};
use kube::{Client, ResourceExt};
use std::collections::{BTreeMap, HashSet};
use tokio::sync::RwLock;

/// The parts of a pod the labelling pass uses
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PodInfo {
    pub name: String,
    pub namespace: String,
    pub labels: BTreeMap<String, String>,
    pub ips: Vec<String>,
}

impl PodInfo {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ips.push(ip.into());
        self
    }

    /// Non-empty label value
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }
}

impl From<&Pod> for PodInfo {
    fn from(pod: &Pod) -> Self {
        let status = pod.status.as_ref();

        // podIPs lists every address of a dual-stack pod; podIP is the
        // older single-address field
        let mut ips: Vec<String> = status
            .and_then(|s| s.pod_ips.as_ref())
            .map(|ips| ips.iter().filter_map(|ip| ip.ip.clone()).collect())
            .unwrap_or_default();
        if ips.is_empty() {
            if let Some(ip) = status.and_then(|s| s.pod_ip.clone()).filter(|ip| !ip.is_empty()) {
                ips.push(ip);
            }
        }

        Self {
            name: pod.name_any(),
            namespace: pod.namespace().unwrap_or_default(),
            labels: pod.labels().clone(),
            ips,
        }
    }
}

/// Source of namespaces and pods
#[async_trait]
pub trait WorkloadSource: Send + Sync {
    async fn list_namespaces(&self) -> Result<Vec<String>, Error>;

    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodInfo>, Error>;
}

/// [`WorkloadSource`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeWorkloadSource {
    client: Client,
}

impl KubeWorkloadSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WorkloadSource for KubeWorkloadSource {
    async fn list_namespaces(&self) -> Result<Vec<String>, Error> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|e| Error::backend("namespaces", e.to_string()))?;
        Ok(list.items.iter().map(|ns| ns.name_any()).collect())
    }

    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodInfo>, Error> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|e| Error::backend(format!("pods in {}", namespace), e.to_string()))?;
        Ok(list.items.iter().map(PodInfo::from).collect())
    }
}

/// In-memory [`WorkloadSource`] for tests and dry runs
#[derive(Default)]
pub struct MemoryWorkloadSource {
    namespaces: RwLock<BTreeMap<String, Vec<PodInfo>>>,
    failing_namespaces: RwLock<bool>,
    failing_pods: RwLock<HashSet<String>>,
}

impl MemoryWorkloadSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_namespace(&self, namespace: &str) {
        self.namespaces
            .write()
            .await
            .entry(namespace.to_string())
            .or_default();
    }

    /// Add a pod, creating its namespace when needed
    pub async fn add_pod(&self, pod: PodInfo) {
        self.namespaces
            .write()
            .await
            .entry(pod.namespace.clone())
            .or_default()
            .push(pod);
    }

    /// Make namespace listing fail
    pub async fn fail_namespace_listing(&self) {
        *self.failing_namespaces.write().await = true;
    }

    /// Make pod listing in `namespace` fail
    pub async fn fail_pod_listing(&self, namespace: &str) {
        self.failing_pods.write().await.insert(namespace.to_string());
    }
}

#[async_trait]
impl WorkloadSource for MemoryWorkloadSource {
    async fn list_namespaces(&self) -> Result<Vec<String>, Error> {
        if *self.failing_namespaces.read().await {
            return Err(Error::backend("namespaces", "listing unavailable"));
        }
        Ok(self.namespaces.read().await.keys().cloned().collect())
    }

    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodInfo>, Error> {
        if self.failing_pods.read().await.contains(namespace) {
            return Err(Error::backend(format!("pods in {}", namespace), "listing unavailable"));
        }
        Ok(self
            .namespaces
            .read()
            .await
            .get(namespace)
            .cloned()
            .unwrap_or_default())
    }
}
