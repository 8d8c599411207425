//! Core data models for resource resolution

use crate::document::Document;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifies one watchable managed-resource collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceTypeDescriptor {
    pub group: String,
    pub version: String,
    /// Plural resource name used in API paths (e.g. `databaseinstances`)
    pub plural: String,
    /// Singular kind carried by instances (e.g. `DatabaseInstance`)
    pub kind: String,
}

impl ResourceTypeDescriptor {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        plural: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            plural: plural.into(),
            kind: kind.into(),
        }
    }

    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for ResourceTypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.group, self.version, self.plural)
    }
}

/// Deduplication key for a resource within one resolution call
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    pub kind: String,
    pub name: String,
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

/// Lightweight handle to a resource, kept in the network index instead of
/// the full document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    pub kind: String,
    pub name: String,
    pub group: String,
    pub version: String,
}

impl ResourceIdentifier {
    pub fn key(&self) -> ResourceKey {
        ResourceKey {
            kind: self.kind.clone(),
            name: self.name.clone(),
        }
    }
}

/// Split an apiVersion into (group, version); core types have no group
pub fn parse_api_version(api_version: &str) -> (String, String) {
    match api_version.split_once('/') {
        Some((group, version)) => (group.to_string(), version.to_string()),
        None => (String::new(), api_version.to_string()),
    }
}

/// A cloud resource as represented in-cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedResource {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    #[serde(default)]
    pub spec: Document,
    #[serde(default)]
    pub status: Document,
}

impl ManagedResource {
    pub fn new(
        api_version: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            name: name.into(),
            labels: BTreeMap::new(),
            resource_version: None,
            spec: Document::Null,
            status: Document::Null,
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_spec(mut self, spec: impl Into<Document>) -> Self {
        self.spec = spec.into();
        self
    }

    pub fn with_status(mut self, status: impl Into<Document>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_resource_version(mut self, resource_version: impl Into<String>) -> Self {
        self.resource_version = Some(resource_version.into());
        self
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey {
            kind: self.kind.clone(),
            name: self.name.clone(),
        }
    }

    pub fn identifier(&self) -> ResourceIdentifier {
        let (group, version) = parse_api_version(&self.api_version);
        ResourceIdentifier {
            kind: self.kind.clone(),
            name: self.name.clone(),
            group,
            version,
        }
    }

    /// `spec.forProvider`, the provider-facing parameters of the resource
    pub fn for_provider(&self) -> Option<&Document> {
        self.spec.get("forProvider")
    }

    /// `status.atProvider`, the observed provider state
    pub fn at_provider(&self) -> Option<&Document> {
        self.status.get("atProvider")
    }
}

/// Where the evidence for a match came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchSource {
    /// Name, label and field signals
    Metadata,
    /// A live network address shared with the workload
    Network,
}

impl MatchSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchSource::Metadata => "metadata",
            MatchSource::Network => "network",
        }
    }
}

/// A resource believed to belong to a workload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceMatch {
    pub resource: ManagedResource,
    pub confidence: f64,
    pub reasons: Vec<String>,
    pub source: MatchSource,
}

impl ResourceMatch {
    pub fn key(&self) -> ResourceKey {
        self.resource.key()
    }
}
