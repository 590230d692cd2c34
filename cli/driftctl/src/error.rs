//! Error handling and display for the CLI.

use std::path::PathBuf;

use colored::Colorize;
use drift_reconcile::{HandlerError, ReconcileError};
use drift_synthmon::ConfigError;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Failed to load resources from {path}: {message}")]
    Load { path: PathBuf, message: String },

    #[error("{failed} of {total} resource(s) failed to reconcile")]
    ApplyFailed { failed: usize, total: usize },

    #[error("{failed} of {total} resource(s) could not be compared")]
    DiffFailed { failed: usize, total: usize },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

impl CliError {
    pub fn load(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Load {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// A suggestion for fixing the error, if there is one.
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::Config(ConfigError::MissingToken) => Some(
                "Set GRAFANA_SM_TOKEN or add `sm_token` to the driftctl config file.".to_string(),
            ),
            Self::Config(ConfigError::InvalidValue { key, .. }) => {
                Some(format!("Check the value of {key}."))
            }
            Self::Reconcile(ReconcileError::UnknownKind { .. }) => {
                Some("Run `driftctl kinds` to see the supported resource kinds.".to_string())
            }
            Self::Reconcile(e) => match e.handler_error() {
                Some(HandlerError::Api {
                    status: 401 | 403, ..
                }) => Some("The API rejected the token. Check GRAFANA_SM_TOKEN.".to_string()),
                _ => None,
            },
            Self::ApplyFailed { .. } | Self::DiffFailed { .. } => {
                Some("Re-run with -v for per-resource logs.".to_string())
            }
            Self::Load { .. } => None,
        }
    }
}

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {}", "Error:".red().bold(), err);

    for cause in err.chain().skip(1) {
        eprintln!("  {} {}", "caused by:".dimmed(), cause);
    }

    if let Some(hint) = err.downcast_ref::<CliError>().and_then(CliError::hint) {
        eprintln!("\n{}", format!("Hint: {hint}").yellow());
    }
}
