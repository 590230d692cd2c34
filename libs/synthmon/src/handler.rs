//! The `SyntheticMonitoringCheck` handler.
//!
//! The check API has no GET endpoint, so remote lookups list every check and
//! pick the one whose `job` and check type match. Updates must carry the
//! server-assigned `id` and `tenantId`, which declared checks never contain;
//! [`Handler::prepare`] copies them from the fetched remote check.

use async_trait::async_trait;
use drift_reconcile::{Fields, Handler, HandlerError, Resource, Value};
use tracing::{debug, warn};

use crate::client::SmClient;

/// Resource kind served by this handler.
pub const KIND: &str = "SyntheticMonitoringCheck";

/// Group and version of the provider.
pub const API_VERSION: &str = "grizzly.grafana.com/v1alpha1";

/// Fields the server owns; stripped before comparison.
const SERVER_FIELDS: [&str; 4] = ["tenantId", "id", "modified", "created"];

/// Identity fields the update endpoint requires.
const IDENTITY_FIELDS: [&str; 2] = ["tenantId", "id"];

/// Handler for Grafana Synthetic Monitoring checks.
#[derive(Debug, Clone)]
pub struct SyntheticMonitoringHandler {
    client: SmClient,
}

impl SyntheticMonitoringHandler {
    pub fn new(client: SmClient) -> Self {
        Self { client }
    }

    async fn find(&self, matches: impl Fn(&Fields) -> bool) -> Result<Option<Resource>, HandlerError> {
        let checks = self.client.list_checks().await?;
        checks
            .into_iter()
            .find(|check| matches(check))
            .map(check_to_resource)
            .transpose()
    }
}

#[async_trait]
impl Handler for SyntheticMonitoringHandler {
    fn kind(&self) -> &str {
        KIND
    }

    fn api_version(&self) -> &str {
        API_VERSION
    }

    /// The check's `job` is always its resource name.
    fn parse(&self, mut resource: Resource) -> Result<Vec<Resource>, HandlerError> {
        let name = resource.name().to_string();
        resource.set_spec_string("job", name);
        Ok(vec![resource])
    }

    fn unprepare(&self, mut resource: Resource) -> Resource {
        for field in SERVER_FIELDS {
            resource.delete_field(field);
        }
        resource
    }

    fn prepare(&self, existing: &Resource, mut resource: Resource) -> Resource {
        for field in IDENTITY_FIELDS {
            if let Some(value) = existing.get_field(field) {
                resource.set_field(field, value.clone());
            }
        }
        resource
    }

    async fn get_remote(&self, resource: &Resource) -> Result<Resource, HandlerError> {
        let check_type = resource
            .resource_type()
            .map(str::to_string)
            .or_else(|| check_type(resource.spec()))
            .ok_or_else(|| {
                HandlerError::Invalid(format!(
                    "{} has no metadata type and no settings to infer it from",
                    resource.key()
                ))
            })?;
        let uid = format!("{}.{}", check_type, resource.name());
        debug!(uid = %uid, "Looking up check");

        self.find(|check| {
            check.get("job").and_then(Value::as_str) == Some(resource.name())
                && check_type_is(check, &check_type)
        })
        .await?
        .ok_or(HandlerError::NotFound(uid))
    }

    async fn get_by_uid(&self, uid: &str) -> Result<Resource, HandlerError> {
        self.find(|check| check.get("id").map(id_string).as_deref() == Some(uid))
            .await?
            .ok_or_else(|| HandlerError::NotFound(uid.to_string()))
    }

    async fn add(&self, resource: &Resource) -> Result<(), HandlerError> {
        self.client.add_check(resource.spec()).await
    }

    async fn update(&self, _existing: &Resource, resource: &Resource) -> Result<(), HandlerError> {
        self.client.update_check(resource.spec()).await
    }

    /// Every check on the account. Checks that cannot be named are skipped.
    async fn list(&self) -> Result<Vec<Resource>, HandlerError> {
        let checks = self.client.list_checks().await?;
        Ok(checks
            .into_iter()
            .filter_map(|check| match check_to_resource(check) {
                Ok(resource) => Some(resource),
                Err(e) => {
                    warn!(error = %e, "Skipping remote check");
                    None
                }
            })
            .collect())
    }
}

/// The check type is the single key of its `settings` object.
fn check_type(check: &Fields) -> Option<String> {
    check
        .get("settings")
        .and_then(Value::as_object)
        .and_then(|settings| settings.keys().next().cloned())
}

fn check_type_is(check: &Fields, expected: &str) -> bool {
    check
        .get("settings")
        .and_then(Value::as_object)
        .is_some_and(|settings| settings.contains_key(expected))
}

fn id_string(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Build a remote resource from the raw check JSON.
fn check_to_resource(check: Fields) -> Result<Resource, HandlerError> {
    let job = check
        .get("job")
        .and_then(Value::as_str)
        .ok_or_else(|| HandlerError::Invalid("check without a job".to_string()))?
        .to_string();

    let mut resource = Resource::new(API_VERSION, KIND, job);
    if let Some(check_type) = check_type(&check) {
        resource = resource.with_type(check_type);
    }
    if let Some(id) = check.get("id").map(id_string) {
        resource = resource.with_uid(id);
    }
    Ok(resource.with_spec(check))
}
