//! Diff command: a dry run of apply.
//!
//! Resources that cannot be parsed or fetched are reported alongside the
//! others instead of stopping the run.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use drift_reconcile::{Plan, ReconcileError, Reconciler, Resource, ResourceKey};

use crate::error::CliError;
use crate::load::load_resources;
use crate::output::{
    print_info, print_plan, print_plan_error, print_single, DiffEntryJson, OutputFormat,
};

use super::CommandContext;

/// Show what apply would change, without changing anything.
#[derive(Debug, Args)]
pub struct DiffCommand {
    /// Resource files (JSON object or array of objects).
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,
}

/// Plan for one resource, or why there is none.
type DiffEntry = (ResourceKey, Result<Plan, ReconcileError>);

impl DiffCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let declared = load_resources(&self.files)?;
        let reconciler = ctx.reconciler()?;

        let entries = plan_all(&reconciler, declared).await;

        match ctx.format {
            OutputFormat::Json => {
                let json: Vec<DiffEntryJson<'_>> = entries
                    .iter()
                    .map(|(key, result)| DiffEntryJson::new(key, result))
                    .collect();
                print_single(&json);
            }
            OutputFormat::Table => {
                for (key, result) in &entries {
                    match result {
                        Ok(plan) => print_plan(plan),
                        Err(e) => print_plan_error(key, e),
                    }
                }
                let changes = entries
                    .iter()
                    .filter(|(_, result)| matches!(result, Ok(plan) if !plan.diff.is_matching()))
                    .count();
                print_info(&format!(
                    "{changes} of {} resource(s) would change",
                    entries.len()
                ));
            }
        }

        check_entries(&entries)?;
        Ok(())
    }
}

async fn plan_all(reconciler: &Reconciler, declared: Vec<Resource>) -> Vec<DiffEntry> {
    let mut entries = Vec::with_capacity(declared.len());
    for resource in declared {
        let key = resource.key();
        match reconciler.parse(resource) {
            Ok(parsed) => {
                for resource in parsed {
                    let plan = reconciler.plan(&resource).await;
                    entries.push((resource.key(), plan));
                }
            }
            Err(e) => entries.push((key, Err(e))),
        }
    }
    entries
}

fn check_entries(entries: &[DiffEntry]) -> Result<(), CliError> {
    let failed = entries.iter().filter(|(_, result)| result.is_err()).count();
    if failed > 0 {
        return Err(CliError::DiffFailed {
            failed,
            total: entries.len(),
        });
    }
    Ok(())
}
