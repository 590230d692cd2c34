//! Desired versus remote comparison.

use serde::Serialize;

use crate::fetch::RemoteState;
use crate::handler::Handler;
use crate::resource::Resource;
use crate::{Fields, Value};

/// A single field that differs between desired and normalized remote state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDelta {
    /// Dotted path to the field, e.g. `settings.http.method`.
    pub path: String,

    /// Desired value, `None` when only the remote side has the field.
    pub desired: Option<Value>,

    /// Remote value, `None` when only the desired side has the field.
    pub remote: Option<Value>,
}

/// Outcome of comparing desired state with remote state.
#[derive(Debug, Clone, PartialEq)]
pub enum DiffResult {
    /// No remote counterpart exists.
    Absent,

    /// Normalized remote state equals desired state.
    Matching,

    /// Remote state differs in the listed fields.
    Drifted(Vec<FieldDelta>),
}

impl DiffResult {
    pub fn is_matching(&self) -> bool {
        matches!(self, Self::Matching)
    }

    /// Field deltas, empty unless drifted.
    pub fn deltas(&self) -> &[FieldDelta] {
        match self {
            Self::Drifted(deltas) => deltas,
            Self::Absent | Self::Matching => &[],
        }
    }
}

/// Compare `desired` with the fetched remote state.
///
/// The remote copy is normalized with [`Handler::unprepare`] first, because
/// desired state never carries server-owned fields. Absent remote state
/// short-circuits without calling the handler.
pub fn compare(handler: &dyn Handler, desired: &Resource, remote: &RemoteState) -> DiffResult {
    let RemoteState::Present(remote) = remote else {
        return DiffResult::Absent;
    };

    let normalized = handler.unprepare(remote.clone());
    if desired.spec() == normalized.spec() {
        return DiffResult::Matching;
    }

    let mut deltas = Vec::new();
    diff_fields("", desired.spec(), normalized.spec(), &mut deltas);
    DiffResult::Drifted(deltas)
}

fn diff_fields(prefix: &str, desired: &Fields, remote: &Fields, out: &mut Vec<FieldDelta>) {
    for (key, want) in desired {
        let path = join_path(prefix, key);
        match (want, remote.get(key)) {
            (Value::Object(want), Some(Value::Object(have))) => {
                diff_fields(&path, want, have, out);
            }
            (want, Some(have)) if want == have => {}
            (want, have) => out.push(FieldDelta {
                path,
                desired: Some(want.clone()),
                remote: have.cloned(),
            }),
        }
    }

    for (key, have) in remote {
        if !desired.contains_key(key) {
            out.push(FieldDelta {
                path: join_path(prefix, key),
                desired: None,
                remote: Some(have.clone()),
            });
        }
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => Fields::new(),
        }
    }

    fn deltas(desired: Value, remote: Value) -> Vec<FieldDelta> {
        let mut out = Vec::new();
        diff_fields("", &fields(desired), &fields(remote), &mut out);
        out
    }

    #[test]
    fn test_equal_maps_have_no_deltas() {
        let out = deltas(
            json!({"job": "a", "settings": {"http": {"method": "GET"}}}),
            json!({"settings": {"http": {"method": "GET"}}, "job": "a"}),
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_changed_scalar() {
        let out = deltas(json!({"target": "x"}), json!({"target": "y"}));
        assert_eq!(
            out,
            vec![FieldDelta {
                path: "target".into(),
                desired: Some(json!("x")),
                remote: Some(json!("y")),
            }]
        );
    }

    #[test]
    fn test_nested_paths() {
        let out = deltas(
            json!({"settings": {"http": {"method": "GET", "ipVersion": "V4"}}}),
            json!({"settings": {"http": {"method": "POST", "ipVersion": "V4"}}}),
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path, "settings.http.method");
    }

    #[test]
    fn test_missing_and_extra_fields() {
        let out = deltas(json!({"a": 1}), json!({"b": 2}));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].path, "a");
        assert_eq!(out[0].remote, None);
        assert_eq!(out[1].path, "b");
        assert_eq!(out[1].desired, None);
    }

    #[test]
    fn test_arrays_compare_whole() {
        let out = deltas(json!({"probes": [1, 2]}), json!({"probes": [2, 1]}));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path, "probes");
    }

    #[test]
    fn test_type_change_is_reported_at_field() {
        let out = deltas(json!({"labels": {"a": "b"}}), json!({"labels": "none"}));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path, "labels");
    }
}
