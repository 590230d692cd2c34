//! Remote state retrieval.

use tracing::debug;

use crate::error::ReconcileError;
use crate::handler::Handler;
use crate::resource::Resource;

/// The result of one fetch, shared by the diff and prepare steps.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteState {
    /// The resource does not exist remotely yet.
    Absent,

    /// The remote copy, as reported by the handler (not normalized).
    Present(Resource),
}

impl RemoteState {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn as_resource(&self) -> Option<&Resource> {
        match self {
            Self::Absent => None,
            Self::Present(resource) => Some(resource),
        }
    }
}

/// Retrieve the remote counterpart of `resource`.
///
/// Uses [`Handler::get_by_uid`] when the resource already carries a UID and
/// [`Handler::get_remote`] otherwise. A "not found" answer becomes
/// [`RemoteState::Absent`]; any other error is a [`ReconcileError::RemoteFetch`].
pub async fn fetch(
    handler: &dyn Handler,
    resource: &Resource,
) -> Result<RemoteState, ReconcileError> {
    let result = match resource.uid() {
        Some(uid) => handler.get_by_uid(uid).await,
        None => handler.get_remote(resource).await,
    };

    match result {
        Ok(remote) => Ok(RemoteState::Present(remote)),
        Err(e) if e.is_not_found() => {
            debug!(kind = %resource.kind(), name = %resource.name(), "Remote resource not found");
            Ok(RemoteState::Absent)
        }
        Err(source) => Err(ReconcileError::RemoteFetch {
            key: resource.key(),
            source,
        }),
    }
}
