//! List command.

use anyhow::Result;
use clap::Args;

use crate::error::CliError;
use crate::output::{print_output, ResourceRow};

use super::CommandContext;

/// List remote resources of a kind.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Resource kind.
    pub kind: String,
}

impl ListCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let registry = ctx.registry()?;
        let handler = registry.resolve(&self.kind).map_err(CliError::from)?;

        let rows: Vec<ResourceRow> = handler
            .list()
            .await?
            .iter()
            .map(|r| ResourceRow {
                uid: r.uid().unwrap_or("-").to_string(),
                name: r.name().to_string(),
                resource_type: r.resource_type().unwrap_or("-").to_string(),
            })
            .collect();

        print_output(&rows, ctx.format);
        Ok(())
    }
}
