//! Controller configuration

use anyhow::{bail, Context, Result};
use labeller_lib::reconcile::LabellerSpec;
use labeller_lib::resolver::ResolverConfig;
use labeller_lib::scorer::ScoringPolicy;
use serde::{Deserialize, Serialize};

/// Config file read when `STYX_CONFIG` is unset; missing files are ignored
pub const DEFAULT_CONFIG_PATH: &str = "/etc/styx/labeller.yaml";

/// Controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabellerConfig {
    /// Instance name recorded on log events (pod name via the downward API)
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// API server port for health/metrics/status
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Age after which the network index is rebuilt
    #[serde(default = "default_index_ttl")]
    pub index_ttl_secs: u64,

    /// Name-phase matches must score strictly above this
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,

    /// Confidence of network-evidence matches
    #[serde(default = "default_network_confidence")]
    pub network_confidence: f64,

    /// Identity signal weights
    #[serde(default)]
    pub weights: ScoringPolicy,

    /// What to label and how often
    #[serde(default)]
    pub labeller: LabellerSpec,
}

fn default_instance_name() -> String {
    std::env::var("POD_NAME").unwrap_or_else(|_| "styx-labeller".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_index_ttl() -> u64 {
    30 * 60
}

fn default_match_threshold() -> f64 {
    ResolverConfig::default().match_threshold
}

fn default_network_confidence() -> f64 {
    ResolverConfig::default().network_confidence
}

impl LabellerConfig {
    /// Load from `STYX_CONFIG` (or the default path) and `STYX_*` env vars
    pub fn load() -> Result<Self> {
        let path = std::env::var("STYX_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    /// Load from an explicit file path, overlaid with `STYX_*` env vars
    ///
    /// Nested keys use `__`, e.g. `STYX_LABELLER__INTERVAL_SECONDS=60`.
    pub fn load_from(path: &str) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("STYX")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read configuration from {}", path))?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the labeller cannot run with
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("match_threshold", self.match_threshold),
            ("network_confidence", self.network_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                bail!("{} must be within [0, 1], got {}", name, value);
            }
        }
        if let Some(kind) = self.weights.out_of_range() {
            bail!(
                "weight for {} must be within [0, 1], got {}",
                kind,
                self.weights.weight(kind)
            );
        }
        if self.labeller.interval_seconds == 0 {
            bail!("labeller.interval_seconds must be greater than zero");
        }
        if self.index_ttl_secs == 0 {
            bail!("index_ttl_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            match_threshold: self.match_threshold,
            network_confidence: self.network_confidence,
        }
    }
}

impl Default for LabellerConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            api_port: default_api_port(),
            index_ttl_secs: default_index_ttl(),
            match_threshold: default_match_threshold(),
            network_confidence: default_network_confidence(),
            weights: ScoringPolicy::default(),
            labeller: LabellerSpec::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labeller_lib::reconcile::LabelMode;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = LabellerConfig::default();
        assert_eq!(config.api_port, 8080);
        assert_eq!(config.index_ttl_secs, 1800);
        assert_eq!(config.match_threshold, 0.30);
        assert_eq!(config.network_confidence, 0.90);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = LabellerConfig::load_from("/nonexistent/styx/labeller.yaml").unwrap();
        assert_eq!(config.labeller.interval_seconds, 300);
    }

    #[test]
    fn test_load_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            r#"
api_port: 9090
match_threshold: 0.5
weights:
  app_label: 0.6
labeller:
  namespace_selector: "^shop-"
  mode: workload
  interval_seconds: 60
  labels:
    managed-by: styx
  label_mappings:
    - source: team
      target: owner
"#
        )
        .unwrap();

        let config = LabellerConfig::load_from(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.api_port, 9090);
        assert_eq!(config.match_threshold, 0.5);
        assert_eq!(config.weights.app_label, 0.6);
        assert_eq!(config.weights.namespace_label, 0.9);
        assert_eq!(config.labeller.mode, LabelMode::Workload);
        assert_eq!(config.labeller.interval_seconds, 60);
        assert_eq!(config.labeller.namespace_selector.as_deref(), Some("^shop-"));
        assert_eq!(config.labeller.labels["managed-by"], "styx");
        assert_eq!(config.labeller.label_mappings[0].target_key(), "owner");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = LabellerConfig {
            match_threshold: 1.2,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let mut config = LabellerConfig::default();
        config.labeller.interval_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = LabellerConfig::default();
        config.weights.name_contains = -0.1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("name_contains"));
    }
}
