//! Declarative resource reconciliation.
//!
//! This library decides, for any externally described resource, whether it is
//! absent remotely, present and matching, or present and drifted, and converges
//! it through a uniform [`Handler`] abstraction. Key concepts:
//!
//! - **Desired state**: the user-declared target configuration for a resource.
//! - **Remote state**: what the external system currently reports.
//! - **Normalization**: stripping server-owned fields before comparison.
//! - **Reconciliation**: the fetch, diff, apply cycle.
//!
//! # Invariants
//!
//! - A matching resource never triggers a network write
//! - At most one add-or-update call per resource per pass
//! - One fetch per pass feeds both the diff and the prepare step
//! - "Not found" is the only handler error turned into control flow

mod diff;
mod error;
mod fetch;
mod fingerprint;
mod handler;
mod orchestrator;
mod registry;
mod resource;

pub use diff::{compare, DiffResult, FieldDelta};
pub use error::{HandlerError, ReconcileError, RegistryError};
pub use fetch::{fetch, RemoteState};
pub use fingerprint::Fingerprint;
pub use handler::Handler;
pub use orchestrator::{
    Operation, Phase, Plan, ReconcileOutcome, ReconcileReport, Reconciler, ReconcilerConfig,
    DEFAULT_CONCURRENCY,
};
pub use registry::{HandlerRegistry, RegistryBuilder, RegistryHandle};
pub use resource::{Resource, ResourceKey};

/// Loosely-typed field value.
pub type Value = serde_json::Value;

/// Ordered mapping of spec fields.
pub type Fields = serde_json::Map<String, Value>;
