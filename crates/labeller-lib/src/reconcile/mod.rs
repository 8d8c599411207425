//! Periodic labelling of managed resources from workload metadata
//!
//! A pass selects namespaces and pods by name pattern, resolves the
//! managed resources each pod uses and merges the configured labels into
//! them. Failures on individual resources are collected into the
//! [`PassReport`]; only selector and listing failures abort a pass.

mod r#loop;
mod selector;
mod status;
mod workloads;

pub use r#loop::ReconcileLoop;
pub use selector::NamePattern;
pub use status::{
    Condition, ConditionStatus, LabellerStatus, CONDITION_LABELING_ERRORS, CONDITION_READY,
};
pub use workloads::{KubeWorkloadSource, MemoryWorkloadSource, PodInfo, WorkloadSource};

use crate::error::Error;
use crate::labels::{LabelApplier, LabelOutcome};
use crate::models::ResourceMatch;
use crate::observability::{LabellerMetrics, StructuredLogger};
use crate::resolver::MatchResolver;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error as ThisError;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Pod label naming the workload a pod belongs to
pub const WORKLOAD_NAME_LABEL: &str = "workload-name";

/// Pod labels copied in workload mode when no mappings are configured
const WORKLOAD_COPIED_LABELS: [&str; 5] = [
    "department",
    "pl-category",
    "sw-part-number",
    "environment-name",
    "team",
];

/// What a pod's resources are resolved against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelMode {
    /// The pod's namespace name
    #[default]
    Namespace,
    /// The pod's `workload-name` label, else the pod name
    Workload,
}

/// Copy one pod label onto matched resources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMapping {
    /// Pod label to read
    pub source: String,
    /// Resource label to write; defaults to `source`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Value used when the pod has no such label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl LabelMapping {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: None,
            default: None,
        }
    }

    pub fn target_key(&self) -> &str {
        self.target.as_deref().unwrap_or(&self.source)
    }

    /// Value to write for `pod`, if any
    pub fn value_for<'a>(&'a self, pod: &'a PodInfo) -> Option<&'a str> {
        pod.label(&self.source)
            .or(self.default.as_deref())
            .filter(|v| !v.is_empty())
    }
}

/// Desired behaviour of the labeller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabellerSpec {
    /// Regex over namespace names; empty selects all
    pub namespace_selector: Option<String>,
    /// Regex over pod names; empty selects all
    pub pod_selector: Option<String>,
    /// Labels written to every matched resource
    pub labels: BTreeMap<String, String>,
    pub label_mappings: Vec<LabelMapping>,
    pub interval_seconds: u64,
    pub mode: LabelMode,
}

impl Default for LabellerSpec {
    fn default() -> Self {
        Self {
            namespace_selector: None,
            pod_selector: None,
            labels: BTreeMap::new(),
            label_mappings: Vec::new(),
            interval_seconds: 300,
            mode: LabelMode::Namespace,
        }
    }
}

impl LabellerSpec {
    /// Name the pod's resources are resolved against
    pub fn target_for(&self, pod: &PodInfo) -> String {
        match self.mode {
            LabelMode::Namespace => pod.namespace.clone(),
            LabelMode::Workload => pod
                .label(WORKLOAD_NAME_LABEL)
                .map(str::to_string)
                .unwrap_or_else(|| pod.name.clone()),
        }
    }

    /// Mappings in effect for this mode
    pub fn effective_mappings(&self) -> Vec<LabelMapping> {
        if self.label_mappings.is_empty() && self.mode == LabelMode::Workload {
            WORKLOAD_COPIED_LABELS.iter().map(|l| LabelMapping::new(*l)).collect()
        } else {
            self.label_mappings.clone()
        }
    }

    /// Labels to merge into the resources of `pod`
    pub fn desired_labels(&self, pod: &PodInfo, target: &str) -> BTreeMap<String, String> {
        let mut desired = self.labels.clone();
        for mapping in self.effective_mappings() {
            if let Some(value) = mapping.value_for(pod) {
                desired.insert(mapping.target_key().to_string(), value.to_string());
            }
        }
        if self.mode == LabelMode::Workload {
            desired.insert(WORKLOAD_NAME_LABEL.to_string(), target.to_string());
        }
        desired
    }
}

/// Point at which a pass aborted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassStage {
    Selectors,
    Namespaces,
    Pods,
}

impl PassStage {
    /// Reason recorded on the Ready condition
    pub fn reason(&self) -> &'static str {
        match self {
            PassStage::Selectors => "InvalidSelector",
            PassStage::Namespaces => "NamespacesFetchFailed",
            PassStage::Pods => "PodsFetchFailed",
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            PassStage::Selectors => "Invalid selector",
            PassStage::Namespaces => "Failed to fetch namespaces",
            PassStage::Pods => "Failed to fetch pods",
        }
    }
}

/// A pass that stopped before labelling
#[derive(Debug, ThisError)]
#[error("{}: {source}", .stage.describe())]
pub struct PassFailure {
    pub stage: PassStage,
    pub source: Error,
}

impl PassFailure {
    fn new(stage: PassStage, source: Error) -> Self {
        Self { stage, source }
    }
}

/// Tally of one completed pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub namespaces: usize,
    pub pods: usize,
    pub matches: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub errors: Vec<String>,
}

impl PassReport {
    /// Resources that carry the desired labels after the pass
    pub fn labeled(&self) -> usize {
        self.updated + self.unchanged
    }
}

/// One selection, resolution and apply sweep
#[derive(Clone)]
pub struct LabellingPass {
    resolver: MatchResolver,
    applier: LabelApplier,
    workloads: Arc<dyn WorkloadSource>,
    logger: StructuredLogger,
    metrics: LabellerMetrics,
}

impl LabellingPass {
    pub fn new(
        resolver: MatchResolver,
        applier: LabelApplier,
        workloads: Arc<dyn WorkloadSource>,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            resolver,
            applier,
            workloads,
            logger,
            metrics: LabellerMetrics::new(),
        }
    }

    pub fn resolver(&self) -> &MatchResolver {
        &self.resolver
    }

    pub async fn run(&self, spec: &LabellerSpec) -> Result<PassReport, PassFailure> {
        let start = Instant::now();

        let namespace_pattern = NamePattern::compile(spec.namespace_selector.as_deref())
            .map_err(|e| PassFailure::new(PassStage::Selectors, e))?;
        let pod_pattern = NamePattern::compile(spec.pod_selector.as_deref())
            .map_err(|e| PassFailure::new(PassStage::Selectors, e))?;

        let namespaces: Vec<String> = self
            .workloads
            .list_namespaces()
            .await
            .map_err(|e| PassFailure::new(PassStage::Namespaces, e))?
            .into_iter()
            .filter(|ns| namespace_pattern.matches(ns))
            .collect();

        let mut pods = Vec::new();
        for namespace in &namespaces {
            let listed = self
                .workloads
                .list_pods(namespace)
                .await
                .map_err(|e| PassFailure::new(PassStage::Pods, e))?;
            pods.extend(listed.into_iter().filter(|p| pod_pattern.matches(&p.name)));
        }
        info!(namespaces = namespaces.len(), pods = pods.len(), "Selected workloads");

        let mut report = PassReport {
            namespaces: namespaces.len(),
            pods: pods.len(),
            ..Default::default()
        };
        let mut name_matches: HashMap<String, Vec<ResourceMatch>> = HashMap::new();

        for pod in &pods {
            let target = spec.target_for(pod);
            let desired = spec.desired_labels(pod, &target);
            if desired.is_empty() {
                debug!(pod = %pod.name, namespace = %pod.namespace, "No labels to apply");
                continue;
            }

            let by_name = match name_matches.get(&target) {
                Some(cached) => cached.clone(),
                None => {
                    let resolved = self.resolver.resolve_by_name(&target).await;
                    name_matches.insert(target.clone(), resolved.clone());
                    resolved
                }
            };
            let matches = self.resolver.attach_network_matches(by_name, &pod.ips).await;
            report.matches += matches.len();
            self.metrics.add_matches(matches.len());

            for m in &matches {
                let key = m.key().to_string();
                self.logger.log_match(&target, &key, m.confidence, m.source.as_str());

                match self.applier.apply(&m.resource, &desired).await {
                    Ok(LabelOutcome::Updated) => {
                        report.updated += 1;
                        self.metrics.inc_labels_applied();
                        self.logger.log_labels_applied(&key, desired.len(), None);
                    }
                    Ok(LabelOutcome::Unchanged) => {
                        report.unchanged += 1;
                        self.metrics.inc_labels_unchanged();
                    }
                    Err(e) => {
                        warn!(resource = %key, pod = %pod.name, transient = e.is_transient(), error = %e, "Label apply failed");
                        self.metrics.inc_apply_errors();
                        self.logger
                            .log_labels_applied(&key, desired.len(), Some(&e.to_string()));
                        report.errors.push(format!("Resource {}: {}", key, e));
                    }
                }
            }
        }

        let elapsed = start.elapsed().as_secs_f64();
        self.metrics.observe_pass_latency(elapsed);
        self.logger.log_pass_completed(
            report.pods,
            report.matches,
            report.updated,
            report.unchanged,
            report.errors.len(),
            elapsed,
        );
        Ok(report)
    }
}
