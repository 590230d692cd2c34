//! The reconciliation state machine.
//!
//! Each resource goes through:
//! - `Start -> Fetched`: one remote fetch
//! - `Fetched -> Diffed`: normalize and compare
//! - `Diffed -> Applied` when matching, with no network write
//! - `Diffed -> Prepared -> Applied`: add when absent, prepare and update when drifted
//!
//! Any error moves the resource to `Failed`. Nothing is retried.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::diff::{compare, DiffResult};
use crate::error::{HandlerError, ReconcileError};
use crate::fetch::{fetch, RemoteState};
use crate::fingerprint::Fingerprint;
use crate::handler::Handler;
use crate::registry::RegistryHandle;
use crate::resource::{Resource, ResourceKey};

/// Default number of resources reconciled at once by [`Reconciler::reconcile_all`].
pub const DEFAULT_CONCURRENCY: usize = 4;

/// The write a reconciliation issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Add,
    Update,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Update => write!(f, "update"),
        }
    }
}

/// Reconciliation phase of a single resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Start,
    Fetched,
    Diffed,
    Prepared,
    Applied,
    Failed,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Applied | Self::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Start => "start",
            Self::Fetched => "fetched",
            Self::Diffed => "diffed",
            Self::Prepared => "prepared",
            Self::Applied => "applied",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Result of reconciling one resource.
#[derive(Debug)]
pub enum ReconcileOutcome {
    /// Remote state already matched; nothing was sent.
    Unchanged,

    /// The resource was absent and has been added.
    Created,

    /// The resource had drifted and has been updated.
    Updated,

    /// Reconciliation stopped with an error.
    Failed(ReconcileError),
}

impl ReconcileOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Short label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unchanged => "unchanged",
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Failed(_) => "failed",
        }
    }

    pub fn error(&self) -> Option<&ReconcileError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Outcome of one resource together with where it stopped.
#[derive(Debug)]
pub struct ReconcileReport {
    pub key: ResourceKey,

    pub outcome: ReconcileOutcome,

    /// `Applied` on success, otherwise the last phase reached before failing.
    pub reached: Phase,
}

impl ReconcileReport {
    /// A report for a resource that failed before anything was fetched.
    pub fn failed(key: ResourceKey, error: ReconcileError) -> Self {
        Self {
            key,
            outcome: ReconcileOutcome::Failed(error),
            reached: Phase::Start,
        }
    }
}

/// Dry-run comparison of one resource.
#[derive(Debug, Clone)]
pub struct Plan {
    pub key: ResourceKey,
    pub diff: DiffResult,

    /// Fingerprint of the desired spec.
    pub desired: Fingerprint,

    /// Fingerprint of the normalized remote spec, if the resource exists.
    pub remote: Option<Fingerprint>,
}

/// Reconciler configuration.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Maximum resources reconciled concurrently in a batch.
    pub concurrency: usize,

    /// Deadline for each handler network call.
    pub timeout: Option<Duration>,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            timeout: None,
        }
    }
}

/// Drives resources to their desired state through registered handlers.
#[derive(Debug, Clone)]
pub struct Reconciler {
    registry: RegistryHandle,
    config: ReconcilerConfig,
}

impl Reconciler {
    pub fn new(registry: RegistryHandle, config: ReconcilerConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &RegistryHandle {
        &self.registry
    }

    /// Expand a declared resource through its handler's parse step.
    pub fn parse(&self, resource: Resource) -> Result<Vec<Resource>, ReconcileError> {
        let handler = self.registry.resolve(resource.kind())?;
        let key = resource.key();
        handler
            .parse(resource)
            .map_err(|source| ReconcileError::Parse { key, source })
    }

    /// Reconcile a single resource.
    pub async fn reconcile(&self, resource: Resource) -> ReconcileOutcome {
        self.reconcile_report(resource).await.outcome
    }

    /// Reconcile a single resource and report the phase it reached.
    pub async fn reconcile_report(&self, resource: Resource) -> ReconcileReport {
        let key = resource.key();
        let mut reached = Phase::Start;

        let outcome = match self.converge(resource, &mut reached).await {
            Ok(outcome) => {
                transition(&key, &mut reached, Phase::Applied);
                info!(kind = %key.kind, name = %key.name, outcome = outcome.label(), "Reconciled");
                outcome
            }
            Err(e) => {
                debug!(
                    kind = %key.kind,
                    name = %key.name,
                    from = %reached,
                    to = %Phase::Failed,
                    "Phase transition"
                );
                warn!(
                    kind = %key.kind,
                    name = %key.name,
                    phase = %reached,
                    error = %e,
                    "Reconciliation failed"
                );
                ReconcileOutcome::Failed(e)
            }
        };

        ReconcileReport {
            key,
            outcome,
            reached,
        }
    }

    /// Reconcile independent resources concurrently.
    ///
    /// Reports come back in input order. A failing resource never stops the
    /// others.
    pub async fn reconcile_all(&self, resources: Vec<Resource>) -> Vec<ReconcileReport> {
        let keys: Vec<ResourceKey> = resources.iter().map(Resource::key).collect();
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (index, resource) in resources.into_iter().enumerate() {
            let reconciler = self.clone();
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                (index, reconciler.reconcile_report(resource).await)
            });
        }

        let mut slots: Vec<Option<ReconcileReport>> = keys.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, report)) => {
                    if let Some(slot) = slots.get_mut(index) {
                        *slot = Some(report);
                    }
                }
                Err(e) => error!(error = %e, "Reconcile task aborted"),
            }
        }

        slots
            .into_iter()
            .zip(keys)
            .map(|(slot, key)| {
                slot.unwrap_or_else(|| {
                    ReconcileReport::failed(key.clone(), ReconcileError::Aborted { key })
                })
            })
            .collect()
    }

    /// Parse declared resources and reconcile everything they expand to.
    ///
    /// A resource whose kind is unknown or whose parse step fails gets a
    /// `Failed` report in its place; the rest are still reconciled. Reports
    /// follow declaration order.
    pub async fn apply_all(&self, declared: Vec<Resource>) -> Vec<ReconcileReport> {
        let mut parsed = Vec::new();
        let mut slots = Vec::with_capacity(declared.len());

        for resource in declared {
            let key = resource.key();
            match self.parse(resource) {
                Ok(expanded) => {
                    slots.push(Ok(expanded.len()));
                    parsed.extend(expanded);
                }
                Err(e) => {
                    warn!(kind = %key.kind, name = %key.name, error = %e, "Skipping resource");
                    slots.push(Err(ReconcileReport::failed(key, e)));
                }
            }
        }

        let mut reconciled = self.reconcile_all(parsed).await.into_iter();
        let mut reports = Vec::with_capacity(slots.len());
        for slot in slots {
            match slot {
                Ok(count) => reports.extend(reconciled.by_ref().take(count)),
                Err(report) => reports.push(report),
            }
        }
        reports
    }

    /// Fetch and compare without applying anything.
    pub async fn plan(&self, resource: &Resource) -> Result<Plan, ReconcileError> {
        let handler = self.registry.resolve(resource.kind())?;
        let remote = self.fetch_remote(handler.as_ref(), resource).await?;
        let diff = compare(handler.as_ref(), resource, &remote);
        let remote_fingerprint = remote
            .as_resource()
            .map(|r| Fingerprint::of(handler.unprepare(r.clone()).spec()));

        Ok(Plan {
            key: resource.key(),
            diff,
            desired: Fingerprint::of(resource.spec()),
            remote: remote_fingerprint,
        })
    }

    async fn converge(
        &self,
        desired: Resource,
        reached: &mut Phase,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let handler = self.registry.resolve(desired.kind())?;
        let key = desired.key();

        let remote = self.fetch_remote(handler.as_ref(), &desired).await?;
        transition(&key, reached, Phase::Fetched);

        let diff = compare(handler.as_ref(), &desired, &remote);
        transition(&key, reached, Phase::Diffed);
        debug!(
            kind = %key.kind,
            name = %key.name,
            absent = remote.is_absent(),
            drifted_fields = diff.deltas().len(),
            "Compared with remote"
        );

        if diff.is_matching() {
            return Ok(ReconcileOutcome::Unchanged);
        }

        let (operation, result) = match remote.as_resource() {
            None => {
                transition(&key, reached, Phase::Prepared);
                let result = self.within(handler.add(&desired)).await;
                (Operation::Add, result)
            }
            Some(existing) => {
                let prepared = handler.prepare(existing, desired);
                transition(&key, reached, Phase::Prepared);
                let result = self.within(handler.update(existing, &prepared)).await;
                (Operation::Update, result)
            }
        };

        result.map_err(|source| ReconcileError::Apply {
            key,
            operation,
            source,
        })?;

        Ok(match operation {
            Operation::Add => ReconcileOutcome::Created,
            Operation::Update => ReconcileOutcome::Updated,
        })
    }

    async fn fetch_remote(
        &self,
        handler: &dyn Handler,
        resource: &Resource,
    ) -> Result<RemoteState, ReconcileError> {
        match self.config.timeout {
            Some(limit) => tokio::time::timeout(limit, fetch(handler, resource))
                .await
                .unwrap_or_else(|_| {
                    Err(ReconcileError::RemoteFetch {
                        key: resource.key(),
                        source: HandlerError::Timeout(limit),
                    })
                }),
            None => fetch(handler, resource).await,
        }
    }

    async fn within<T>(
        &self,
        call: impl Future<Output = Result<T, HandlerError>>,
    ) -> Result<T, HandlerError> {
        match self.config.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or(Err(HandlerError::Timeout(limit))),
            None => call.await,
        }
    }
}

fn transition(key: &ResourceKey, reached: &mut Phase, next: Phase) {
    debug!(kind = %key.kind, name = %key.name, from = %reached, to = %next, "Phase transition");
    *reached = next;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconciler_config_default() {
        let config = ReconcilerConfig::default();
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(config.timeout, None);
    }

    #[test]
    fn test_terminal_phases() {
        assert!(Phase::Applied.is_terminal());
        assert!(Phase::Failed.is_terminal());
        assert!(!Phase::Prepared.is_terminal());
    }

    #[test]
    fn test_failed_report_stops_at_start() {
        let key = ResourceKey::new("Folder", "f");
        let report = ReconcileReport::failed(
            key.clone(),
            ReconcileError::UnknownKind {
                kind: "Folder".into(),
            },
        );
        assert_eq!(report.key, key);
        assert_eq!(report.reached, Phase::Start);
        assert!(report.outcome.is_failed());
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(ReconcileOutcome::Unchanged.label(), "unchanged");
        assert_eq!(ReconcileOutcome::Created.label(), "created");
        assert_eq!(ReconcileOutcome::Updated.label(), "updated");
        let failed = ReconcileOutcome::Failed(ReconcileError::UnknownKind { kind: "X".into() });
        assert!(failed.is_failed());
        assert!(failed.error().is_some());
    }
}
