//! Loading resource envelopes from JSON files.
//!
//! Each file holds either one resource object or an array of them.

use std::path::Path;

use drift_reconcile::Resource;
use serde_json::Value;

use crate::error::CliError;

/// Read every resource from `paths`, in file order.
pub fn load_resources(paths: &[impl AsRef<Path>]) -> Result<Vec<Resource>, CliError> {
    let mut resources = Vec::new();
    for path in paths {
        resources.extend(load_file(path.as_ref())?);
    }
    Ok(resources)
}

fn load_file(path: &Path) -> Result<Vec<Resource>, CliError> {
    let contents = std::fs::read_to_string(path).map_err(|e| CliError::load(path, e))?;
    let value: Value = serde_json::from_str(&contents).map_err(|e| CliError::load(path, e))?;

    let items = match value {
        Value::Array(items) => items,
        object @ Value::Object(_) => vec![object],
        _ => {
            return Err(CliError::load(
                path,
                "expected a resource object or an array of resources",
            ))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item)
                .map_err(|e| CliError::load(path, format!("resource #{index}: {e}")))
        })
        .collect()
}
