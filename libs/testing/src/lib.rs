//! Test fixtures for reconciliation.
//!
//! [`MemoryHandler`] stands in for a remote API: it keeps resources in memory,
//! assigns server-owned identity fields on add, rejects updates that lack
//! them, counts every call and can be told to fail or stall.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use drift_reconcile::{Fields, Handler, HandlerError, Resource};
use serde_json::{json, Value};

/// API version reported by [`MemoryHandler`].
pub const API_VERSION: &str = "test.drift.dev/v1";

/// Spec fields owned by the fake server.
pub const SERVER_FIELDS: [&str; 4] = ["tenantId", "id", "created", "modified"];

/// Call counts observed by a [`MemoryHandler`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub get_remote: usize,
    pub get_by_uid: usize,
    pub add: usize,
    pub update: usize,
}

impl CallCounts {
    /// Number of add and update calls.
    pub fn writes(&self) -> usize {
        self.add + self.update
    }
}

#[derive(Default)]
struct Counters {
    get_remote: AtomicUsize,
    get_by_uid: AtomicUsize,
    add: AtomicUsize,
    update: AtomicUsize,
}

/// In-memory handler keyed by resource name.
pub struct MemoryHandler {
    kind: String,
    tenant_id: String,
    next_id: AtomicU64,
    store: Mutex<BTreeMap<String, Resource>>,
    submitted: Mutex<Vec<Resource>>,
    fail_fetch: Mutex<BTreeSet<String>>,
    fail_apply: Mutex<BTreeSet<String>>,
    fail_parse: Mutex<BTreeSet<String>>,
    delay: Option<Duration>,
    write_delay: Option<Duration>,
    counters: Counters,
}

impl MemoryHandler {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            tenant_id: "t1".to_string(),
            next_id: AtomicU64::new(1),
            store: Mutex::new(BTreeMap::new()),
            submitted: Mutex::new(Vec::new()),
            fail_fetch: Mutex::new(BTreeSet::new()),
            fail_apply: Mutex::new(BTreeSet::new()),
            fail_parse: Mutex::new(BTreeSet::new()),
            delay: None,
            write_delay: None,
            counters: Counters::default(),
        }
    }

    /// Stall every network call for `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Stall only add and update calls for `delay`.
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    /// Store a remote resource as-is. Its `id` spec field becomes the UID.
    pub fn seed(&self, name: &str, spec: Value) {
        let spec = into_fields(spec);
        let mut resource = Resource::new(API_VERSION, &self.kind, name).with_spec(spec);
        if let Some(id) = resource.get_field("id").map(value_to_uid) {
            resource = resource.with_uid(id);
        }
        self.lock_store().insert(name.to_string(), resource);
    }

    /// Make fetches of `name` fail with a transport error.
    pub fn fail_fetch(&self, name: &str) {
        lock(&self.fail_fetch).insert(name.to_string());
    }

    /// Make add and update of `name` fail with an API error.
    pub fn fail_apply(&self, name: &str) {
        lock(&self.fail_apply).insert(name.to_string());
    }

    /// Make the parse step reject `name`.
    pub fn fail_parse(&self, name: &str) {
        lock(&self.fail_parse).insert(name.to_string());
    }

    /// The stored remote copy of `name`.
    pub fn remote(&self, name: &str) -> Option<Resource> {
        self.lock_store().get(name).cloned()
    }

    /// Every resource passed to add or update, in call order.
    pub fn submitted(&self) -> Vec<Resource> {
        lock(&self.submitted).clone()
    }

    pub fn calls(&self) -> CallCounts {
        CallCounts {
            get_remote: self.counters.get_remote.load(Ordering::SeqCst),
            get_by_uid: self.counters.get_by_uid.load(Ordering::SeqCst),
            add: self.counters.add.load(Ordering::SeqCst),
            update: self.counters.update.load(Ordering::SeqCst),
        }
    }

    fn lock_store(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Resource>> {
        lock(&self.store)
    }

    async fn network(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    async fn write(&self) {
        self.network().await;
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn check_apply(&self, resource: &Resource) -> Result<(), HandlerError> {
        lock(&self.submitted).push(resource.clone());
        if lock(&self.fail_apply).contains(resource.name()) {
            return Err(HandlerError::Api {
                status: 500,
                message: json!({"msg": "injected failure"}).to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Handler for MemoryHandler {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn api_version(&self) -> &str {
        API_VERSION
    }

    fn parse(&self, resource: Resource) -> Result<Vec<Resource>, HandlerError> {
        if lock(&self.fail_parse).contains(resource.name()) {
            return Err(HandlerError::Invalid(format!(
                "cannot parse {}",
                resource.key()
            )));
        }
        Ok(vec![resource])
    }

    fn unprepare(&self, mut resource: Resource) -> Resource {
        for field in SERVER_FIELDS {
            resource.delete_field(field);
        }
        resource
    }

    fn prepare(&self, existing: &Resource, mut resource: Resource) -> Resource {
        for field in ["tenantId", "id"] {
            if let Some(value) = existing.get_field(field) {
                resource.set_field(field, value.clone());
            }
        }
        resource
    }

    async fn get_remote(&self, resource: &Resource) -> Result<Resource, HandlerError> {
        self.counters.get_remote.fetch_add(1, Ordering::SeqCst);
        self.network().await;

        if lock(&self.fail_fetch).contains(resource.name()) {
            return Err(HandlerError::transport(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "injected fetch failure",
            )));
        }

        self.remote(resource.name())
            .ok_or_else(|| HandlerError::NotFound(resource.key().to_string()))
    }

    async fn get_by_uid(&self, uid: &str) -> Result<Resource, HandlerError> {
        self.counters.get_by_uid.fetch_add(1, Ordering::SeqCst);
        self.network().await;

        self.lock_store()
            .values()
            .find(|r| r.uid() == Some(uid))
            .cloned()
            .ok_or_else(|| HandlerError::NotFound(uid.to_string()))
    }

    async fn add(&self, resource: &Resource) -> Result<(), HandlerError> {
        self.counters.add.fetch_add(1, Ordering::SeqCst);
        self.write().await;
        self.check_apply(resource)?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut stored = resource.clone().with_uid(id.to_string());
        stored.set_field("id", json!(id));
        stored.set_spec_string("tenantId", &self.tenant_id);
        stored.set_field("created", json!(1_700_000_000));
        stored.set_field("modified", json!(1_700_000_000));

        self.lock_store().insert(resource.name().to_string(), stored);
        Ok(())
    }

    async fn update(&self, existing: &Resource, resource: &Resource) -> Result<(), HandlerError> {
        self.counters.update.fetch_add(1, Ordering::SeqCst);
        self.write().await;
        self.check_apply(resource)?;

        if resource.get_field("id").is_none() || resource.get_field("tenantId").is_none() {
            return Err(HandlerError::Api {
                status: 400,
                message: json!({"msg": "id and tenantId are required"}).to_string(),
            });
        }

        let mut stored = resource.clone();
        if let Some(uid) = existing.uid() {
            stored = stored.with_uid(uid);
        }
        stored.set_field("modified", json!(1_700_000_100));
        if let Some(created) = existing.get_field("created") {
            stored.set_field("created", created.clone());
        }

        self.lock_store().insert(resource.name().to_string(), stored);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Resource>, HandlerError> {
        self.network().await;
        Ok(self.lock_store().values().cloned().collect())
    }
}

/// A declared resource of `kind` named `name` with `spec`.
pub fn resource(kind: &str, name: &str, spec: Value) -> Resource {
    Resource::new(API_VERSION, kind, name).with_spec(into_fields(spec))
}

fn into_fields(spec: Value) -> Fields {
    match spec {
        Value::Object(map) => map,
        _ => Fields::new(),
    }
}

fn value_to_uid(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
