//! Labeller status and conditions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CONDITION_READY: &str = "Ready";
pub const CONDITION_LABELING_ERRORS: &str = "LabelingErrors";

/// Errors quoted verbatim in the LabelingErrors condition
const MAX_REPORTED_ERRORS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

/// One observation of the labeller's state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: ConditionStatus,
    pub reason: String,
    pub message: String,
    pub last_transition_time: DateTime<Utc>,
}

/// Observed state of the labeller, served on `/status`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabellerStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reconcile_time: Option<DateTime<Utc>>,
    pub resources_labeled: usize,
    pub conditions: Vec<Condition>,
}

impl LabellerStatus {
    pub fn condition(&self, type_: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.type_ == type_)
    }

    /// Set a condition, keeping the existing entry (and its transition time)
    /// when status, reason and message are all unchanged
    pub fn set_condition(
        &mut self,
        type_: &str,
        status: ConditionStatus,
        reason: &str,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) {
        let condition = Condition {
            type_: type_.to_string(),
            status,
            reason: reason.to_string(),
            message: message.into(),
            last_transition_time: now,
        };

        match self.conditions.iter_mut().find(|c| c.type_ == type_) {
            Some(existing) => {
                if existing.status != condition.status
                    || existing.reason != condition.reason
                    || existing.message != condition.message
                {
                    *existing = condition;
                }
            }
            None => self.conditions.push(condition),
        }
    }

    /// Record a pass that ran to completion
    pub fn record_success(&mut self, labeled: usize, errors: &[String], now: DateTime<Utc>) {
        self.last_reconcile_time = Some(now);
        self.resources_labeled = labeled;
        self.set_condition(
            CONDITION_READY,
            ConditionStatus::True,
            "ReconciliationSucceeded",
            format!("Successfully labeled {} resources", labeled),
            now,
        );

        if errors.is_empty() {
            self.set_condition(
                CONDITION_LABELING_ERRORS,
                ConditionStatus::False,
                "NoErrors",
                "All resources successfully labeled",
                now,
            );
        } else {
            self.set_condition(
                CONDITION_LABELING_ERRORS,
                ConditionStatus::True,
                "ResourceLabelingPartiallyFailed",
                summarize_errors(errors),
                now,
            );
        }
    }

    /// Record a pass that aborted before labelling anything
    pub fn record_failure(&mut self, reason: &str, message: impl Into<String>, now: DateTime<Utc>) {
        self.set_condition(CONDITION_READY, ConditionStatus::False, reason, message, now);
    }
}

fn summarize_errors(errors: &[String]) -> String {
    if errors.len() <= MAX_REPORTED_ERRORS {
        format!("Errors: [{}]", errors.join("; "))
    } else {
        format!(
            "{} errors occurred, first {}: [{}]",
            errors.len(),
            MAX_REPORTED_ERRORS,
            errors[..MAX_REPORTED_ERRORS].join("; ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_unchanged_condition_keeps_transition_time() {
        let t0 = Utc::now();
        let mut status = LabellerStatus::default();
        status.record_success(2, &[], t0);
        status.record_success(2, &[], t0 + Duration::minutes(5));

        let ready = status.condition(CONDITION_READY).unwrap();
        assert_eq!(ready.status, ConditionStatus::True);
        assert_eq!(ready.last_transition_time, t0);
        assert_eq!(status.last_reconcile_time, Some(t0 + Duration::minutes(5)));
    }

    #[test]
    fn test_changed_condition_is_replaced() {
        let t0 = Utc::now();
        let t1 = t0 + Duration::minutes(5);
        let mut status = LabellerStatus::default();
        status.record_success(2, &[], t0);
        status.record_failure("PodsFetchFailed", "Failed to fetch pods: timeout", t1);

        let ready = status.condition(CONDITION_READY).unwrap();
        assert_eq!(ready.status, ConditionStatus::False);
        assert_eq!(ready.reason, "PodsFetchFailed");
        assert_eq!(ready.last_transition_time, t1);
        assert_eq!(status.conditions.len(), 2);
    }

    #[test]
    fn test_labeling_errors_summary() {
        let now = Utc::now();
        let mut status = LabellerStatus::default();
        let errors: Vec<String> = (1..=5).map(|i| format!("Resource Bucket/b{}: conflict", i)).collect();
        status.record_success(1, &errors, now);

        let cond = status.condition(CONDITION_LABELING_ERRORS).unwrap();
        assert_eq!(cond.status, ConditionStatus::True);
        assert_eq!(cond.reason, "ResourceLabelingPartiallyFailed");
        assert!(cond.message.starts_with("5 errors occurred, first 3:"));
        assert!(cond.message.contains("b3"));
        assert!(!cond.message.contains("b4"));

        status.record_success(1, &[], now);
        let cond = status.condition(CONDITION_LABELING_ERRORS).unwrap();
        assert_eq!(cond.reason, "NoErrors");
    }

    #[test]
    fn test_serializes_camel_case() {
        let mut status = LabellerStatus::default();
        status.record_success(0, &[], Utc::now());
        let json = serde_json::to_value(&status).unwrap();
        assert!(json.get("resourcesLabeled").is_some());
        assert_eq!(json["conditions"][0]["type"], "Ready");
        assert_eq!(json["conditions"][0]["status"], "True");
    }
}
