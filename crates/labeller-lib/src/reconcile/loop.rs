//! Periodic reconciliation loop
//!
//! Runs a [`LabellingPass`] every `interval_seconds`, publishing the outcome
//! to the shared [`LabellerStatus`] and the health registry. Passes never
//! overlap: the next tick is only awaited once the current pass returns.

use super::{LabellerSpec, LabellerStatus, LabellingPass, PassFailure, PassReport};
use crate::health::{components, HealthRegistry};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

pub struct ReconcileLoop {
    pass: LabellingPass,
    spec: LabellerSpec,
    status: Arc<RwLock<LabellerStatus>>,
    health: HealthRegistry,
}

impl ReconcileLoop {
    pub fn new(pass: LabellingPass, spec: LabellerSpec, health: HealthRegistry) -> Self {
        Self {
            pass,
            spec,
            status: Arc::new(RwLock::new(LabellerStatus::default())),
            health,
        }
    }

    /// Shared status, updated after every pass
    pub fn status(&self) -> Arc<RwLock<LabellerStatus>> {
        self.status.clone()
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.spec.interval_seconds.max(1))
    }

    /// Run one pass and publish its outcome
    pub async fn run_once(&self) -> Result<PassReport, PassFailure> {
        let result = self.pass.run(&self.spec).await;
        let now = Utc::now();

        match &result {
            Ok(report) => {
                self.status
                    .write()
                    .await
                    .record_success(report.labeled(), &report.errors, now);

                if report.errors.is_empty() {
                    self.health.set_healthy(components::LABELLER).await;
                } else {
                    self.health
                        .set_degraded(
                            components::LABELLER,
                            format!("{} resources could not be labeled", report.errors.len()),
                        )
                        .await;
                }
                self.health.set_ready(true).await;
            }
            Err(failure) => {
                error!(error = %failure, reason = failure.stage.reason(), "Labelling pass failed");
                self.status
                    .write()
                    .await
                    .record_failure(failure.stage.reason(), failure.to_string(), now);
                self.health
                    .set_unhealthy(components::LABELLER, failure.to_string())
                    .await;
            }
        }

        let index = self.pass.resolver().index().snapshot().await;
        if index.built_at().is_some() {
            self.health.set_healthy(components::NETWORK_INDEX).await;
        }

        result
    }

    /// Run passes until shutdown is signalled
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.interval().as_secs(),
            "Starting reconcile loop"
        );

        let mut ticker = interval(self.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut pass_count = 0u64;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    pass_count += 1;
                    if let Ok(report) = self.run_once().await {
                        if !report.errors.is_empty() {
                            warn!(
                                pass = pass_count,
                                errors = report.errors.len(),
                                "Pass finished with labelling errors, retrying next interval"
                            );
                        }
                    }
                }
                _ = shutdown.recv() => {
                    info!(passes = pass_count, "Shutting down reconcile loop");
                    break;
                }
            }
        }
    }
}
