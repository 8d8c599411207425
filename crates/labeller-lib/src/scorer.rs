//! Confidence scoring of identity signals

use crate::models::ManagedResource;
use crate::signals::{identity_signals, SignalKind};
use serde::{Deserialize, Serialize};

/// Weight assigned to each kind of identity signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub name_contains: f64,
    pub namespace_label: f64,
    pub workload_label: f64,
    pub app_label: f64,
    pub environment_label: f64,
    pub label_value_contains: f64,
    pub for_provider_field_contains: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            name_contains: 0.8,
            namespace_label: 0.9,
            workload_label: 0.9,
            app_label: 0.8,
            environment_label: 0.7,
            label_value_contains: 0.6,
            for_provider_field_contains: 0.5,
        }
    }
}

impl ScoringPolicy {
    pub fn weight(&self, kind: SignalKind) -> f64 {
        match kind {
            SignalKind::NameContains => self.name_contains,
            SignalKind::NamespaceLabel => self.namespace_label,
            SignalKind::WorkloadLabel => self.workload_label,
            SignalKind::AppLabel => self.app_label,
            SignalKind::EnvironmentLabel => self.environment_label,
            SignalKind::LabelValueContains => self.label_value_contains,
            SignalKind::ForProviderFieldContains => self.for_provider_field_contains,
        }
    }

    /// Name of the first weight outside [0, 1], if any
    pub fn out_of_range(&self) -> Option<SignalKind> {
        SignalKind::ALL
            .into_iter()
            .find(|kind| !(0.0..=1.0).contains(&self.weight(*kind)))
    }
}

/// Reasons and confidence for one resource against one target
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Score {
    pub reasons: Vec<String>,
    pub confidence: f64,
}

impl Score {
    pub fn is_empty(&self) -> bool {
        self.reasons.is_empty()
    }
}

/// Combine fired weights as Σ(w·w²) / Σ(w²)
///
/// Stronger signals dominate: a single weight scores as itself and extra
/// weaker evidence pulls the result down less than a plain mean would.
/// Falls back to the arithmetic mean when every weight is zero.
pub fn combine_weights(weights: &[f64]) -> f64 {
    if weights.is_empty() {
        return 0.0;
    }

    let (weighted_total, total_weight) = weights
        .iter()
        .fold((0.0, 0.0), |(wt, tw), w| (wt + w * w * w, tw + w * w));

    if total_weight > 0.0 {
        weighted_total / total_weight
    } else {
        weights.iter().sum::<f64>() / weights.len() as f64
    }
}

/// Scores resources against a target under a fixed policy
#[derive(Debug, Clone, Default)]
pub struct ConfidenceScorer {
    policy: ScoringPolicy,
}

impl ConfidenceScorer {
    pub fn new(policy: ScoringPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    pub fn score(&self, resource: &ManagedResource, target: &str) -> Score {
        let signals = identity_signals(resource, target);
        if signals.is_empty() {
            return Score::default();
        }

        let weights: Vec<f64> = signals.iter().map(|s| self.policy.weight(s.kind)).collect();
        Score {
            confidence: combine_weights(&weights),
            reasons: signals.into_iter().map(|s| s.reason).collect(),
        }
    }
}
