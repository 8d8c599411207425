//! Configuration management for the CLI

use crate::output::OutputFormat;
use anyhow::{Context, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Default output format
    pub default_format: Option<String>,
}

impl Config {
    /// Load configuration from the user's config file, if any
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path; a missing file is empty config
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).context("Failed to read config file")?;

        serde_json::from_str(&content).context("Failed to parse config file")
    }

    /// Default format from the config file, ignoring unknown names
    pub fn output_format(&self) -> Option<OutputFormat> {
        self.default_format.as_deref().and_then(OutputFormat::from_name)
    }

    /// Get the configuration file path
    fn config_path() -> Result<PathBuf> {
        let home = dirs_next::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("styx").join("config.json"))
    }
}

/// Build a Kubernetes client
///
/// An explicit kubeconfig is read as given; otherwise the usual in-cluster
/// then `~/.kube/config` inference applies.
pub async fn kube_client(kubeconfig: Option<&str>) -> Result<kube::Client> {
    let Some(path) = kubeconfig else {
        return kube::Client::try_default()
            .await
            .context("Failed to infer Kubernetes configuration");
    };

    debug!(path = %path, "Loading kubeconfig");
    let kubeconfig = Kubeconfig::read_from(path)
        .with_context(|| format!("Failed to read kubeconfig {}", path))?;
    let config = kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .context("Invalid kubeconfig")?;
    kube::Client::try_from(config).context("Failed to create Kubernetes client")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert!(config.default_format.is_none());
        assert!(config.output_format().is_none());
    }

    #[test]
    fn test_load_default_format() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"default_format": "json"}}"#).unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.output_format(), Some(OutputFormat::Json));
    }

    #[test]
    fn test_invalid_json_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(Config::load_from(file.path()).is_err());
    }
}
