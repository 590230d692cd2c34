//! The per-kind handler interface.

use async_trait::async_trait;

use crate::error::HandlerError;
use crate::resource::Resource;

/// Binds the reconciliation operations to one external resource type.
///
/// The network operations are awaited by the orchestrator; they are the only
/// points where a reconciliation suspends.
#[async_trait]
pub trait Handler: Send + Sync {
    /// The resource kind this handler serves.
    fn kind(&self) -> &str;

    /// Group and version of the provider this handler belongs to.
    fn api_version(&self) -> &str;

    /// File extension used when writing a resource of this kind.
    fn file_extension(&self) -> &str {
        "json"
    }

    /// Expand a declared resource into the resources to reconcile.
    fn parse(&self, resource: Resource) -> Result<Vec<Resource>, HandlerError> {
        Ok(vec![resource])
    }

    /// Strip server-owned fields from a remote resource so it can be compared
    /// with desired state.
    fn unprepare(&self, resource: Resource) -> Resource;

    /// Re-inject the server-owned identity fields of `existing` into `resource`
    /// before it is sent as an update.
    fn prepare(&self, existing: &Resource, resource: Resource) -> Resource;

    /// Retrieve the remote counterpart of a declared resource.
    ///
    /// Returns [`HandlerError::NotFound`] when it does not exist.
    async fn get_remote(&self, resource: &Resource) -> Result<Resource, HandlerError>;

    /// Retrieve a remote resource by its server-assigned identifier.
    async fn get_by_uid(&self, uid: &str) -> Result<Resource, HandlerError>;

    /// Create the resource remotely.
    async fn add(&self, resource: &Resource) -> Result<(), HandlerError>;

    /// Replace `existing` with `resource` remotely.
    async fn update(&self, existing: &Resource, resource: &Resource) -> Result<(), HandlerError>;

    /// List every remote resource of this kind, for handlers that can.
    async fn list(&self) -> Result<Vec<Resource>, HandlerError> {
        Err(HandlerError::Invalid(format!(
            "listing is not supported for kind '{}'",
            self.kind()
        )))
    }
}
