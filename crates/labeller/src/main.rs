//! Styx labeller - copies workload labels onto Crossplane managed resources
//!
//! This binary runs in-cluster, periodically resolving which managed
//! resources belong to the selected namespaces or workloads and merging
//! the configured labels into them.

use anyhow::{Context, Result};
use labeller_lib::{
    catalog::{KubeResourceStore, ResourceCatalog},
    health::{components, HealthRegistry},
    labels::LabelApplier,
    network_index::NetworkIndexCache,
    observability::{LabellerMetrics, StructuredLogger},
    reconcile::{KubeWorkloadSource, LabellingPass, ReconcileLoop},
    resolver::MatchResolver,
    scorer::ConfidenceScorer,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const LABELLER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // JSON output with env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting styx-labeller");

    let config = config::LabellerConfig::load()?;
    info!(
        instance = %config.instance_name,
        mode = ?config.labeller.mode,
        interval_secs = config.labeller.interval_seconds,
        "Labeller configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::CATALOG).await;
    health_registry.register(components::NETWORK_INDEX).await;
    health_registry.register(components::LABELLER).await;
    health_registry.register(components::API).await;

    // Register metrics before the first scrape
    let _metrics = LabellerMetrics::new();

    let logger = StructuredLogger::new(&config.instance_name);
    logger.log_startup(LABELLER_VERSION, config.labeller.interval_seconds);

    let client = kube::Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let catalog = ResourceCatalog::new(Arc::new(KubeResourceStore::new(client.clone())));
    probe_catalog(&catalog, &health_registry).await;

    let index = Arc::new(
        NetworkIndexCache::new(chrono::Duration::seconds(config.index_ttl_secs as i64))
            .with_logger(logger.clone()),
    );
    let resolver = MatchResolver::new(
        catalog.clone(),
        ConfidenceScorer::new(config.weights.clone()),
        config.resolver_config(),
        index,
    );
    let pass = LabellingPass::new(
        resolver,
        LabelApplier::new(catalog),
        Arc::new(KubeWorkloadSource::new(client)),
        logger.clone(),
    );
    let reconcile = ReconcileLoop::new(pass, config.labeller.clone(), health_registry.clone());

    let app_state = Arc::new(api::AppState::new(health_registry.clone(), reconcile.status()));
    let api_health = health_registry.clone();
    let api_handle = tokio::spawn(async move {
        if let Err(e) = api::serve(config.api_port, app_state).await {
            warn!(error = %e, "API server stopped");
            api_health
                .set_unhealthy(components::API, e.to_string())
                .await;
        }
    });

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let loop_handle = tokio::spawn(reconcile.run(shutdown_rx));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    logger.log_shutdown("SIGINT received");

    // Ignore send errors: the loop may already have exited
    let _ = shutdown_tx.send(());
    if let Err(e) = loop_handle.await {
        warn!(error = %e, "Reconcile loop task failed");
    }
    api_handle.abort();

    info!("Shutdown complete");
    Ok(())
}

/// Check that at least the first watched collection can be listed
async fn probe_catalog(catalog: &ResourceCatalog, health: &HealthRegistry) {
    let Some(first) = catalog.resource_types().first() else {
        health
            .set_degraded(components::CATALOG, "No resource types configured")
            .await;
        return;
    };

    match catalog.list_instances(first).await {
        Ok(_) => health.set_healthy(components::CATALOG).await,
        Err(e) => {
            warn!(error = %e, gvr = %first, "Catalog probe failed");
            health
                .set_degraded(components::CATALOG, e.to_string())
                .await;
        }
    }
}
