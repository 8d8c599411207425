//! End-to-end resolution and labelling against in-memory backends

use labeller_lib::health::components;
use labeller_lib::reconcile::{
    ConditionStatus, LabelMode, MemoryWorkloadSource, PassStage, PodInfo, CONDITION_READY,
};
use labeller_lib::{
    ComponentStatus, ConfidenceScorer, HealthRegistry, LabelApplier, LabellerSpec,
    LabellingPass, ManagedResource, MatchResolver, MatchSource, MemoryResourceStore,
    NetworkIndexCache, ReconcileLoop, ResolverConfig, ResourceCatalog, ResourceTypeDescriptor,
    StructuredLogger,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

fn sql_instances() -> ResourceTypeDescriptor {
    ResourceTypeDescriptor::new("sql.gcp.upbound.io", "v1beta1", "databaseinstances", "DatabaseInstance")
}

fn compute_instances() -> ResourceTypeDescriptor {
    ResourceTypeDescriptor::new("compute.gcp.upbound.io", "v1beta1", "instances", "Instance")
}

fn billing_db() -> ManagedResource {
    ManagedResource::new("sql.gcp.upbound.io/v1beta1", "DatabaseInstance", "billing-prod-db-1")
        .with_spec(json!({ "forProvider": { "region": "us-central1" } }))
}

fn web_vm() -> ManagedResource {
    ManagedResource::new("compute.gcp.upbound.io/v1beta1", "Instance", "web-1").with_spec(json!({
        "forProvider": {
            "zone": "us-central1-a",
            "networkInterfaces": [ { "networkIP": "10.0.3.4" } ]
        }
    }))
}

struct Harness {
    store: Arc<MemoryResourceStore>,
    workloads: Arc<MemoryWorkloadSource>,
    resolver: MatchResolver,
    pass: LabellingPass,
}

async fn harness() -> Harness {
    let store = Arc::new(MemoryResourceStore::new());
    store.insert(&sql_instances(), billing_db()).await;
    store.insert(&compute_instances(), web_vm()).await;

    let catalog = ResourceCatalog::new(store.clone());
    let resolver = MatchResolver::new(
        catalog.clone(),
        ConfidenceScorer::default(),
        ResolverConfig::default(),
        Arc::new(NetworkIndexCache::default()),
    );
    let workloads = Arc::new(MemoryWorkloadSource::new());
    let pass = LabellingPass::new(
        resolver.clone(),
        LabelApplier::new(catalog),
        workloads.clone(),
        StructuredLogger::new("test"),
    );

    Harness {
        store,
        workloads,
        resolver,
        pass,
    }
}

fn spec_with_labels(labels: &[(&str, &str)]) -> LabellerSpec {
    LabellerSpec {
        labels: labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_namespace_name_resolves_to_database() {
    let h = harness().await;

    let matches = h.resolver.resolve_by_name("billing-prod").await;
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].resource.name, "billing-prod-db-1");
    assert_eq!(
        matches[0].reasons,
        vec!["Resource name contains target: billing-prod".to_string()]
    );
    assert!(matches[0].confidence >= 0.75);
}

#[tokio::test]
async fn test_unrelated_target_has_no_matches() {
    let h = harness().await;
    assert!(h.resolver.resolve_by_name("inventory").await.is_empty());
}

#[tokio::test]
async fn test_pod_ip_resolves_to_instance() {
    let h = harness().await;

    let matches = h
        .resolver
        .resolve_by_name_with_network("storefront", &["10.0.3.4".to_string()])
        .await;
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].resource.name, "web-1");
    assert_eq!(matches[0].confidence, 0.90);
    assert_eq!(matches[0].source, MatchSource::Network);
    assert_eq!(
        matches[0].reasons,
        vec!["Network connection detected from pod IP 10.0.3.4".to_string()]
    );
}

#[tokio::test]
async fn test_unavailable_collection_keeps_other_matches() {
    let h = harness().await;
    h.store.mark_unavailable(&compute_instances()).await;

    let matches = h
        .resolver
        .resolve_by_name_with_network("billing-prod", &["10.0.3.4".to_string()])
        .await;
    let names: Vec<_> = matches.iter().map(|m| m.resource.name.as_str()).collect();
    assert_eq!(names, vec!["billing-prod-db-1"]);
}

#[tokio::test]
async fn test_pass_labels_once_then_converges() {
    let h = harness().await;
    h.workloads
        .add_pod(PodInfo::new("billing-prod", "api-0"))
        .await;
    let spec = spec_with_labels(&[("cost-center", "billing")]);

    let first = h.pass.run(&spec).await.unwrap();
    assert_eq!(first.pods, 1);
    assert_eq!(first.updated, 1);
    assert_eq!(h.store.write_count(), 1);

    let stored = h
        .store
        .resource(&sql_instances(), "billing-prod-db-1")
        .await
        .unwrap();
    assert_eq!(stored.labels["cost-center"], "billing");

    let second = h.pass.run(&spec).await.unwrap();
    assert_eq!(second.updated, 0);
    assert_eq!(second.unchanged, 1);
    assert_eq!(h.store.write_count(), 1);
}

#[tokio::test]
async fn test_pass_uses_pod_ips() {
    let h = harness().await;
    h.workloads
        .add_pod(PodInfo::new("storefront", "web-0").with_ip("10.0.3.4"))
        .await;

    let report = h
        .pass
        .run(&spec_with_labels(&[("team", "web")]))
        .await
        .unwrap();
    assert_eq!(report.matches, 1);
    assert_eq!(report.updated, 1);

    let stored = h.store.resource(&compute_instances(), "web-1").await.unwrap();
    assert_eq!(stored.labels["team"], "web");
}

#[tokio::test]
async fn test_workload_mode_copies_pod_labels() {
    let h = harness().await;
    h.workloads
        .add_pod(
            PodInfo::new("default", "billing-prod-7d9f")
                .with_label("workload-name", "billing-prod")
                .with_label("team", "payments"),
        )
        .await;
    let spec = LabellerSpec {
        mode: LabelMode::Workload,
        ..Default::default()
    };

    let report = h.pass.run(&spec).await.unwrap();
    assert_eq!(report.updated, 1);

    let stored = h
        .store
        .resource(&sql_instances(), "billing-prod-db-1")
        .await
        .unwrap();
    let expected = BTreeMap::from([
        ("team".to_string(), "payments".to_string()),
        ("workload-name".to_string(), "billing-prod".to_string()),
    ]);
    assert_eq!(stored.labels, expected);
}

#[tokio::test]
async fn test_invalid_selector_fails_without_writes() {
    let h = harness().await;
    h.workloads
        .add_pod(PodInfo::new("billing-prod", "api-0"))
        .await;

    let health = HealthRegistry::new();
    health.register(components::LABELLER).await;

    let spec = LabellerSpec {
        namespace_selector: Some("[".to_string()),
        ..spec_with_labels(&[("cost-center", "billing")])
    };
    let reconciler = ReconcileLoop::new(h.pass.clone(), spec, health.clone());

    let failure = reconciler.run_once().await.unwrap_err();
    assert_eq!(failure.stage, PassStage::Selectors);
    assert!(matches!(
        failure.source,
        labeller_lib::Error::InvalidPattern { .. }
    ));
    assert_eq!(h.store.write_count(), 0);

    let status = reconciler.status();
    let status = status.read().await;
    let ready = status.condition(CONDITION_READY).unwrap();
    assert_eq!(ready.status, ConditionStatus::False);
    assert_eq!(ready.reason, "InvalidSelector");

    let labeller = health.component(components::LABELLER).await.unwrap();
    assert_eq!(labeller.status, ComponentStatus::Unhealthy);
}

#[tokio::test]
async fn test_successful_run_marks_ready() {
    let h = harness().await;
    h.workloads
        .add_pod(PodInfo::new("billing-prod", "api-0"))
        .await;

    let health = HealthRegistry::new();
    health.register(components::LABELLER).await;
    let reconciler = ReconcileLoop::new(
        h.pass.clone(),
        spec_with_labels(&[("cost-center", "billing")]),
        health.clone(),
    );

    let report = reconciler.run_once().await.unwrap();
    assert_eq!(report.labeled(), 1);

    let status = reconciler.status();
    let status = status.read().await;
    assert_eq!(status.resources_labeled, 1);
    assert_eq!(
        status.condition(CONDITION_READY).unwrap().status,
        ConditionStatus::True
    );
    assert!(health.readiness().await.ready);
}
