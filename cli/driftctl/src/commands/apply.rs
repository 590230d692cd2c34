//! Apply command.
//!
//! Loads resource envelopes, runs each through its handler's parse step and
//! reconciles the batch. One failing resource does not stop the others.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use drift_reconcile::ReconcileReport;
use tracing::info;

use crate::error::CliError;
use crate::load::load_resources;
use crate::output::{print_output, print_success, ReportRow};

use super::CommandContext;

/// Create or update remote resources to match the given files.
#[derive(Debug, Args)]
pub struct ApplyCommand {
    /// Resource files (JSON object or array of objects).
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,
}

impl ApplyCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let declared = load_resources(&self.files)?;
        let reconciler = ctx.reconciler()?;
        info!(count = declared.len(), "Applying resources");

        let reports = reconciler.apply_all(declared).await;
        let rows: Vec<ReportRow> = reports.iter().map(ReportRow::from).collect();
        print_output(&rows, ctx.format);

        let total = check_reports(&reports)?;
        print_success(&format!("{total} resource(s) reconciled"));
        Ok(())
    }
}

/// Number of reports, or `ApplyFailed` if any of them failed.
fn check_reports(reports: &[ReconcileReport]) -> Result<usize, CliError> {
    let total = reports.len();
    let failed = reports.iter().filter(|r| r.outcome.is_failed()).count();
    if failed > 0 {
        return Err(CliError::ApplyFailed { failed, total });
    }
    Ok(total)
}
