//! Configuration for driftctl.
//!
//! Values come from, in increasing precedence:
//! - `config.json` in the platform config directory
//! - environment variables
//! - command-line flags

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use drift_reconcile::{ReconcilerConfig, DEFAULT_CONCURRENCY};
use drift_synthmon::SmConfig;
use serde::{Deserialize, Serialize};

/// Configuration file name.
const CONFIG_FILE: &str = "config.json";

/// Get the config directory path.
fn config_dir() -> Result<PathBuf> {
    ProjectDirs::from("dev", "drift", "driftctl")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
}

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Resources reconciled concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Deadline for each remote call, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Synthetic Monitoring API URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sm_url: Option<String>,

    /// Synthetic Monitoring API token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sm_token: Option<String>,
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            timeout_secs: None,
            sm_url: None,
            sm_token: None,
        }
    }
}

impl Config {
    /// Load config from disk (or defaults) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = config_dir()?.join(CONFIG_FILE);
        let mut config = Self::load_from(&path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load config from a specific file, or return defaults if it is missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {:?}", path))
    }

    /// Override fields from environment variables.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = lookup("DRIFT_CONCURRENCY") {
            self.concurrency = value
                .parse()
                .with_context(|| format!("Invalid DRIFT_CONCURRENCY: {value}"))?;
        }
        if let Some(value) = lookup("DRIFT_TIMEOUT_SECS") {
            self.timeout_secs = Some(
                value
                    .parse()
                    .with_context(|| format!("Invalid DRIFT_TIMEOUT_SECS: {value}"))?,
            );
        }
        if let Some(url) = lookup("GRAFANA_SM_URL").filter(|s| !s.is_empty()) {
            self.sm_url = Some(url);
        }
        if let Some(token) = lookup("GRAFANA_SM_TOKEN").filter(|s| !s.is_empty()) {
            self.sm_token = Some(token);
        }
        Ok(())
    }

    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            concurrency: self.concurrency.max(1),
            timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }

    /// Synthetic Monitoring settings: environment defaults, then this config.
    pub fn sm_config(&self) -> Result<SmConfig> {
        let mut sm = SmConfig::from_env()?;
        if let Some(url) = &self.sm_url {
            sm.url = url.clone();
        }
        if let Some(token) = &self.sm_token {
            sm.token = Some(token.clone());
        }
        Ok(sm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(
            config.reconciler_config().concurrency,
            ReconcilerConfig::default().concurrency
        );
        assert_eq!(config.reconciler_config().timeout, None);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
    }

    #[test]
    fn test_file_then_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, r#"{"concurrency": 2, "sm_url": "http://file"}"#).unwrap();

        let mut config = Config::load_from(&path).unwrap();
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.sm_url.as_deref(), Some("http://file"));

        let env: HashMap<&str, &str> = [("DRIFT_TIMEOUT_SECS", "9"), ("GRAFANA_SM_URL", "http://env")]
            .into_iter()
            .collect();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.concurrency, 2);
        assert_eq!(config.sm_url.as_deref(), Some("http://env"));
        assert_eq!(
            config.reconciler_config().timeout,
            Some(Duration::from_secs(9))
        );
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = Config::default();
        let result = config.apply_env(|key| (key == "DRIFT_CONCURRENCY").then(|| "many".to_string()));
        assert!(result.is_err());
    }
}
