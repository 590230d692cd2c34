//! # drift-synthmon
//!
//! Grafana Synthetic Monitoring support for drift.
//!
//! Maps `SyntheticMonitoringCheck` resources to the check API:
//! - `GET api/v1/check/list` stands in for a single-check lookup
//! - `POST api/v1/check/add` creates a check
//! - `POST api/v1/check/update` replaces a check (requires `id` and `tenantId`)

mod client;
mod config;
mod handler;

pub use client::SmClient;
pub use config::{ConfigError, SmConfig, DEFAULT_TIMEOUT_SECS, DEFAULT_URL};
pub use handler::{SyntheticMonitoringHandler, API_VERSION, KIND};

/// Build a handler from environment configuration.
pub fn handler_from_env() -> Result<SyntheticMonitoringHandler, ConfigError> {
    let config = SmConfig::from_env()?;
    Ok(SyntheticMonitoringHandler::new(SmClient::new(&config)?))
}
