//! Identity signals: does a resource's metadata point at a target name?

use crate::document::Document;
use crate::models::ManagedResource;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Label keys matched exactly against the target
const NAMESPACE_KEYS: [&str; 2] = ["kubernetes-namespace", "namespace"];
const WORKLOAD_KEY: &str = "workload-name";
const APP_KEY: &str = "app";
const ENVIRONMENT_KEY: &str = "environment";

/// Label keys never searched for the target by value containment
const CONTAINMENT_EXCLUDED_KEYS: [&str; 3] = ["kubernetes-namespace", "namespace", "environment"];

/// Kinds of evidence, each weighted by the scoring policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    NameContains,
    NamespaceLabel,
    WorkloadLabel,
    AppLabel,
    EnvironmentLabel,
    LabelValueContains,
    ForProviderFieldContains,
}

impl SignalKind {
    pub const ALL: [SignalKind; 7] = [
        SignalKind::NameContains,
        SignalKind::NamespaceLabel,
        SignalKind::WorkloadLabel,
        SignalKind::AppLabel,
        SignalKind::EnvironmentLabel,
        SignalKind::LabelValueContains,
        SignalKind::ForProviderFieldContains,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::NameContains => "name_contains",
            SignalKind::NamespaceLabel => "namespace_label",
            SignalKind::WorkloadLabel => "workload_label",
            SignalKind::AppLabel => "app_label",
            SignalKind::EnvironmentLabel => "environment_label",
            SignalKind::LabelValueContains => "label_value_contains",
            SignalKind::ForProviderFieldContains => "for_provider_field_contains",
        }
    }

    /// Kind of exact-match signal carried by a well-known label key
    fn for_label_key(key: &str) -> Option<SignalKind> {
        match key {
            k if NAMESPACE_KEYS.contains(&k) => Some(SignalKind::NamespaceLabel),
            WORKLOAD_KEY => Some(SignalKind::WorkloadLabel),
            APP_KEY => Some(SignalKind::AppLabel),
            ENVIRONMENT_KEY => Some(SignalKind::EnvironmentLabel),
            _ => None,
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One fired piece of evidence with its human-readable reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentitySignal {
    pub kind: SignalKind,
    pub reason: String,
}

impl IdentitySignal {
    fn new(kind: SignalKind, reason: String) -> Self {
        Self { kind, reason }
    }
}

/// Collect every identity signal linking `resource` to `target`
///
/// Order is deterministic: name, top-level exact labels, top-level label
/// containment, `forProvider.labels` exact labels, then `forProvider` string
/// fields. Label and field maps iterate in key order.
pub fn identity_signals(resource: &ManagedResource, target: &str) -> Vec<IdentitySignal> {
    let mut signals = Vec::new();
    let needle = target.to_lowercase();
    if needle.is_empty() {
        return signals;
    }

    if resource.name.to_lowercase().contains(&needle) {
        signals.push(IdentitySignal::new(
            SignalKind::NameContains,
            format!("Resource name contains target: {}", target),
        ));
    }

    for (key, value) in &resource.labels {
        if let Some(kind) = SignalKind::for_label_key(key) {
            if value == target {
                signals.push(IdentitySignal::new(
                    kind,
                    format!("Resource has '{}' label matching the target", key),
                ));
            }
        }
    }

    for (key, value) in &resource.labels {
        if !CONTAINMENT_EXCLUDED_KEYS.contains(&key.as_str())
            && value.to_lowercase().contains(&needle)
        {
            signals.push(IdentitySignal::new(
                SignalKind::LabelValueContains,
                format!("Resource has label '{}' with value containing the target", key),
            ));
        }
    }

    if let Some(for_provider) = resource.for_provider() {
        let provider_labels = for_provider.get("labels").map(Document::string_entries);
        for (key, value) in provider_labels.into_iter().flatten() {
            if let Some(kind) = SignalKind::for_label_key(key) {
                if value == target {
                    signals.push(IdentitySignal::new(
                        kind,
                        format!("Resource spec has '{}' label in forProvider.labels", key),
                    ));
                }
            }
        }

        for (key, value) in for_provider.string_entries() {
            if value.to_lowercase().contains(&needle) {
                signals.push(IdentitySignal::new(
                    SignalKind::ForProviderFieldContains,
                    format!("Resource spec.forProvider.{} contains the target", key),
                ));
            }
        }
    }

    signals
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kinds(signals: &[IdentitySignal]) -> Vec<SignalKind> {
        signals.iter().map(|s| s.kind).collect()
    }

    #[test]
    fn test_name_contains_is_case_insensitive() {
        let resource = ManagedResource::new("sql.gcp.upbound.io/v1beta1", "DatabaseInstance", "Billing-Prod-db-1");
        let signals = identity_signals(&resource, "billing-prod");
        assert_eq!(kinds(&signals), vec![SignalKind::NameContains]);
        assert_eq!(signals[0].reason, "Resource name contains target: billing-prod");
    }

    #[test]
    fn test_well_known_labels_match_exactly() {
        let resource = ManagedResource::new("storage.gcp.upbound.io/v1beta1", "Bucket", "assets")
            .with_label("kubernetes-namespace", "shop")
            .with_label("app", "shop")
            .with_label("environment", "shop-staging");

        let signals = identity_signals(&resource, "shop");
        // environment is neither an exact match nor searched by containment;
        // app is searched by both
        assert_eq!(
            kinds(&signals),
            vec![
                SignalKind::AppLabel,
                SignalKind::NamespaceLabel,
                SignalKind::LabelValueContains,
            ]
        );
        assert!(signals[2].reason.contains("'app'"));
    }

    #[test]
    fn test_app_and_workload_values_match_by_containment() {
        let resource = ManagedResource::new("storage.gcp.upbound.io/v1beta1", "Bucket", "assets")
            .with_label("app", "shop-frontend");
        let signals = identity_signals(&resource, "shop");
        assert_eq!(kinds(&signals), vec![SignalKind::LabelValueContains]);
        assert_eq!(
            signals[0].reason,
            "Resource has label 'app' with value containing the target"
        );

        let resource = ManagedResource::new("redis.gcp.upbound.io/v1beta1", "Instance", "cache")
            .with_label("workload-name", "shop-api");
        assert_eq!(
            kinds(&identity_signals(&resource, "shop")),
            vec![SignalKind::LabelValueContains]
        );
    }

    #[test]
    fn test_namespace_and_environment_values_not_searched() {
        let resource = ManagedResource::new("storage.gcp.upbound.io/v1beta1", "Bucket", "assets")
            .with_label("kubernetes-namespace", "shop-prod")
            .with_label("namespace", "shop-prod")
            .with_label("environment", "shop-staging");
        assert!(identity_signals(&resource, "shop").is_empty());
    }

    #[test]
    fn test_other_label_values_match_by_containment() {
        let resource = ManagedResource::new("pubsub.gcp.upbound.io/v1beta1", "Topic", "events")
            .with_label("owner", "team-Shop")
            .with_label("tier", "gold");

        let signals = identity_signals(&resource, "shop");
        assert_eq!(kinds(&signals), vec![SignalKind::LabelValueContains]);
        assert!(signals[0].reason.contains("'owner'"));
    }

    #[test]
    fn test_for_provider_labels_and_fields() {
        let resource = ManagedResource::new("compute.gcp.upbound.io/v1beta1", "Instance", "vm-a")
            .with_spec(Document::from(json!({
                "forProvider": {
                    "labels": { "namespace": "shop", "workload-name": "shop" },
                    "description": "VM for the SHOP frontend",
                    "machineType": "e2-small",
                    "diskSizeGb": 10
                }
            })));

        let signals = identity_signals(&resource, "shop");
        assert_eq!(
            kinds(&signals),
            vec![
                SignalKind::NamespaceLabel,
                SignalKind::WorkloadLabel,
                SignalKind::ForProviderFieldContains,
            ]
        );
        assert_eq!(signals[2].reason, "Resource spec.forProvider.description contains the target");
    }

    #[test]
    fn test_no_signals_for_unrelated_resource() {
        let resource = ManagedResource::new("kms.gcp.upbound.io/v1beta1", "KeyRing", "ring")
            .with_label("team", "core");
        assert!(identity_signals(&resource, "billing").is_empty());
        assert!(identity_signals(&resource, "").is_empty());
    }
}
