//! Content fingerprints for normalized specs.

use sha2::{Digest, Sha256};

use crate::{Fields, Value};

/// A spec hash for deterministic comparison and display.
///
/// Two specs with the same fields produce the same fingerprint regardless of
/// key order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint a spec map.
    pub fn of(spec: &Fields) -> Self {
        let canonical = canonical_json(&Value::Object(spec.clone()));
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        let result = hasher.finalize();
        Self(format!("sha256:{}", hex::encode(&result[..16])))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for tables and logs.
    pub fn short(&self) -> &str {
        let end = self.0.len().min("sha256:".len() + 12);
        &self.0[..end]
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical JSON: sorted keys, no whitespace.
fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut pairs: Vec<_> = map.iter().collect();
            pairs.sort_by_key(|(k, _)| *k);
            let inner: Vec<String> = pairs
                .iter()
                .map(|(k, v)| format!("{}:{}", Value::String((*k).clone()), canonical_json(v)))
                .collect();
            format!("{{{}}}", inner.join(","))
        }
        Value::Array(arr) => {
            let inner: Vec<String> = arr.iter().map(canonical_json).collect();
            format!("[{}]", inner.join(","))
        }
        scalar => scalar.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(value: Value) -> Fields {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_fingerprint_ignores_key_order() {
        let a = Fingerprint::of(&spec(json!({"b": 2, "a": {"y": 1, "x": [1, 2]}})));
        let b = Fingerprint::of(&spec(json!({"a": {"x": [1, 2], "y": 1}, "b": 2})));
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_sees_value_changes() {
        let a = Fingerprint::of(&spec(json!({"target": "x"})));
        let b = Fingerprint::of(&spec(json!({"target": "y"})));
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("sha256:"));
        assert_eq!(a.short().len(), "sha256:".len() + 12);
    }

    #[test]
    fn test_canonical_escapes_strings() {
        assert_eq!(canonical_json(&json!({"k\"": "a\nb"})), r#"{"k\"":"a\nb"}"#);
    }
}
