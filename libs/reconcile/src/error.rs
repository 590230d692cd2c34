//! Error types for handlers, the registry and reconciliation.

use std::time::Duration;

use thiserror::Error;

use crate::orchestrator::Operation;
use crate::resource::ResourceKey;

/// Errors returned by a [`crate::Handler`] implementation.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The resource does not exist remotely. Not a failure: the fetcher turns
    /// it into [`crate::RemoteState::Absent`].
    #[error("not found: {0}")]
    NotFound(String),

    /// The remote API answered with a non-success status.
    #[error("remote API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The request never produced an API answer.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A resource could not be mapped to or from the remote shape.
    #[error("invalid resource: {0}")]
    Invalid(String),

    /// The call did not finish before the caller's deadline.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl HandlerError {
    /// Wrap any error as a transport failure.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Box::new(err))
    }

    /// Returns true if this error is the "not found" signal.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Errors raised while building a registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A handler was already registered for this kind.
    #[error("handler already registered for kind '{0}'")]
    DuplicateKind(String),
}

/// Reasons a single resource failed to reconcile.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// No handler is registered for the resource kind.
    #[error("no handler registered for kind '{kind}'")]
    UnknownKind { kind: String },

    /// Retrieving remote state failed for a reason other than "not found".
    #[error("failed to fetch remote state for {key}")]
    RemoteFetch {
        key: ResourceKey,
        #[source]
        source: HandlerError,
    },

    /// The add or update call failed.
    #[error("failed to {operation} {key}")]
    Apply {
        key: ResourceKey,
        operation: Operation,
        #[source]
        source: HandlerError,
    },

    /// The handler rejected the declared resource.
    #[error("failed to parse {key}")]
    Parse {
        key: ResourceKey,
        #[source]
        source: HandlerError,
    },

    /// The task reconciling the resource ended without a result.
    #[error("reconciliation of {key} was aborted")]
    Aborted { key: ResourceKey },
}

impl ReconcileError {
    /// The handler error underneath, if any.
    pub fn handler_error(&self) -> Option<&HandlerError> {
        match self {
            Self::UnknownKind { .. } | Self::Aborted { .. } => None,
            Self::RemoteFetch { source, .. }
            | Self::Apply { source, .. }
            | Self::Parse { source, .. } => Some(source),
        }
    }
}
