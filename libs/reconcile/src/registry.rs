//! Kind to handler dispatch.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{ReconcileError, RegistryError};
use crate::handler::Handler;

/// Shared, read-only registry handle.
pub type RegistryHandle = Arc<HandlerRegistry>;

/// Collects handlers before reconciliation starts.
#[derive(Default)]
pub struct RegistryBuilder {
    handlers: BTreeMap<String, Arc<dyn Handler>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `kind`. A kind can only be registered once.
    pub fn register(
        &mut self,
        kind: impl Into<String>,
        handler: Arc<dyn Handler>,
    ) -> Result<&mut Self, RegistryError> {
        let kind = kind.into();
        if self.handlers.contains_key(&kind) {
            return Err(RegistryError::DuplicateKind(kind));
        }

        debug!(kind = %kind, api_version = %handler.api_version(), "Registered handler");
        self.handlers.insert(kind, handler);
        Ok(self)
    }

    /// Register `handler` under its own [`Handler::kind`].
    pub fn register_handler(
        &mut self,
        handler: Arc<dyn Handler>,
    ) -> Result<&mut Self, RegistryError> {
        let kind = handler.kind().to_string();
        self.register(kind, handler)
    }

    /// Freeze the registry.
    pub fn build(self) -> RegistryHandle {
        Arc::new(HandlerRegistry {
            handlers: self.handlers,
        })
    }
}

/// Immutable mapping from resource kind to handler.
///
/// There is no way to mutate a built registry, so it can be read from any
/// number of tasks without locking.
pub struct HandlerRegistry {
    handlers: BTreeMap<String, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Find the handler for `kind`.
    pub fn resolve(&self, kind: &str) -> Result<Arc<dyn Handler>, ReconcileError> {
        self.handlers
            .get(kind)
            .cloned()
            .ok_or_else(|| ReconcileError::UnknownKind {
                kind: kind.to_string(),
            })
    }

    /// Registered kinds in sorted order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("kinds", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
