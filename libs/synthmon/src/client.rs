//! HTTP client for the Synthetic Monitoring check API.

use drift_reconcile::{Fields, HandlerError};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::debug;

use crate::config::{ConfigError, SmConfig};

const LIST_PATH: &str = "api/v1/check/list";
const ADD_PATH: &str = "api/v1/check/add";
const UPDATE_PATH: &str = "api/v1/check/update";

/// Client for the check endpoints.
#[derive(Debug, Clone)]
pub struct SmClient {
    client: reqwest::Client,
    base_url: String,
}

impl SmClient {
    /// Create a client. A token is required.
    pub fn new(config: &SmConfig) -> Result<Self, ConfigError> {
        let token = config.require_token()?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let auth = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
            ConfigError::InvalidValue {
                key: "GRAFANA_SM_TOKEN",
                value: "<redacted>".to_string(),
            }
        })?;
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                key: "GRAFANA_SM_URL",
                value: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Every check visible to the token. The API has no single-check GET.
    pub async fn list_checks(&self) -> Result<Vec<Fields>, HandlerError> {
        let response = self
            .client
            .get(self.url(LIST_PATH))
            .send()
            .await
            .map_err(HandlerError::transport)?;
        let response = check_status(response).await?;

        let checks: Vec<Fields> = response.json().await.map_err(HandlerError::transport)?;
        debug!(count = checks.len(), "Listed checks");
        Ok(checks)
    }

    pub async fn add_check(&self, check: &Fields) -> Result<(), HandlerError> {
        self.post(ADD_PATH, check).await
    }

    pub async fn update_check(&self, check: &Fields) -> Result<(), HandlerError> {
        self.post(UPDATE_PATH, check).await
    }

    async fn post(&self, path: &str, check: &Fields) -> Result<(), HandlerError> {
        debug!(path, "Posting check");
        let response = self
            .client
            .post(self.url(path))
            .json(check)
            .send()
            .await
            .map_err(HandlerError::transport)?;
        check_status(response).await?;
        Ok(())
    }
}

/// Turn a non-success response into an API error carrying the body.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, HandlerError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .text()
        .await
        .ok()
        .filter(|body| !body.is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());

    Err(HandlerError::Api {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let config = SmConfig {
            url: "http://localhost:4030/".to_string(),
            token: Some("t".to_string()),
            ..Default::default()
        };
        let client = SmClient::new(&config).unwrap();
        assert_eq!(client.url(ADD_PATH), "http://localhost:4030/api/v1/check/add");
    }

    #[test]
    fn test_token_required() {
        let err = SmClient::new(&SmConfig::default()).unwrap_err();
        assert_eq!(err, ConfigError::MissingToken);
    }
}
