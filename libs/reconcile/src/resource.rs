//! The canonical in-memory resource envelope.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Fields, Value};

/// Identity of a resource within one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    pub kind: String,
    pub name: String,
}

impl ResourceKey {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Metadata {
    name: String,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    resource_type: Option<String>,

    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

/// A declared or remote resource.
///
/// Kind and name are fixed at construction. The UID is assigned by the remote
/// system: it is never read from client input and only handlers attach it
/// (see [`Resource::with_uid`]).
///
/// Serialized as `{"apiVersion", "kind", "metadata": {"name", "type"}, "spec"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    #[serde(default)]
    api_version: String,

    kind: String,

    metadata: Metadata,

    #[serde(default)]
    spec: Fields,

    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    uid: Option<String>,
}

impl Resource {
    /// Create a resource with an empty spec.
    pub fn new(
        api_version: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            metadata: Metadata {
                name: name.into(),
                resource_type: None,
                extra: BTreeMap::new(),
            },
            spec: Fields::new(),
            uid: None,
        }
    }

    /// Set the `type` metadata field.
    pub fn with_type(mut self, resource_type: impl Into<String>) -> Self {
        self.metadata.resource_type = Some(resource_type.into());
        self
    }

    /// Replace the whole spec.
    pub fn with_spec(mut self, spec: Fields) -> Self {
        self.spec = spec;
        self
    }

    /// Attach the server-assigned identifier. Handlers call this when they
    /// build a resource from remote state.
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn uid(&self) -> Option<&str> {
        self.uid.as_deref()
    }

    /// The `type` metadata field, if set.
    pub fn resource_type(&self) -> Option<&str> {
        self.metadata.resource_type.as_deref()
    }

    /// Look up a string metadata field. `name` and `type` are always resolvable.
    pub fn metadata(&self, key: &str) -> Option<&str> {
        match key {
            "name" => Some(self.name()),
            "type" => self.resource_type(),
            _ => self.metadata_value(key).and_then(Value::as_str),
        }
    }

    /// Any other metadata field, whatever its JSON type.
    pub fn metadata_value(&self, key: &str) -> Option<&Value> {
        self.metadata.extra.get(key)
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(&self.kind, self.name())
    }

    pub fn spec(&self) -> &Fields {
        &self.spec
    }

    pub fn into_spec(self) -> Fields {
        self.spec
    }

    /// Insert or replace a spec field.
    pub fn set_field(&mut self, key: impl Into<String>, value: Value) {
        self.spec.insert(key.into(), value);
    }

    /// Remove a spec field. Removing a missing key is a no-op.
    pub fn delete_field(&mut self, key: &str) -> Option<Value> {
        self.spec.remove(key)
    }

    pub fn get_field(&self, key: &str) -> Option<&Value> {
        self.spec.get(key)
    }

    /// A spec field as a string slice, if it is a JSON string.
    pub fn get_spec_str(&self, key: &str) -> Option<&str> {
        self.spec.get(key).and_then(Value::as_str)
    }

    pub fn set_spec_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.set_field(key, Value::String(value.into()));
    }
}
