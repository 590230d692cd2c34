//! Configuration for the Synthetic Monitoring API.

use std::time::Duration;

use thiserror::Error;

/// Default API endpoint.
pub const DEFAULT_URL: &str = "https://synthetic-monitoring-api.grafana.net";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("GRAFANA_SM_TOKEN is not set")]
    MissingToken,

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Synthetic Monitoring API configuration.
#[derive(Debug, Clone)]
pub struct SmConfig {
    /// API base URL.
    pub url: String,

    /// Access token for the API.
    pub token: Option<String>,

    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for SmConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl SmConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let url = lookup("GRAFANA_SM_URL")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_URL.to_string());

        let token = lookup("GRAFANA_SM_TOKEN").filter(|s| !s.is_empty());

        let timeout_secs = match lookup("GRAFANA_SM_TIMEOUT_SECS") {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                key: "GRAFANA_SM_TIMEOUT_SECS",
                value,
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            url,
            token,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// The token, or an error if none is configured.
    pub fn require_token(&self) -> Result<&str, ConfigError> {
        self.token.as_deref().ok_or(ConfigError::MissingToken)
    }
}
