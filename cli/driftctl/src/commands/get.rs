//! Get command.

use anyhow::Result;
use clap::Args;

use crate::error::CliError;
use crate::output::print_single;

use super::CommandContext;

/// Fetch one remote resource by its server-assigned UID.
#[derive(Debug, Args)]
pub struct GetCommand {
    /// Resource kind.
    pub kind: String,

    /// Server-assigned UID.
    pub uid: String,

    /// Print the remote copy as-is, including server-owned fields.
    #[arg(long)]
    pub raw: bool,
}

impl GetCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let registry = ctx.registry()?;
        let handler = registry.resolve(&self.kind).map_err(CliError::from)?;

        let remote = handler
            .get_by_uid(&self.uid)
            .await
            .map_err(|e| anyhow::Error::new(e).context(format!("{} {}", self.kind, self.uid)))?;

        let shown = if self.raw {
            remote
        } else {
            handler.unprepare(remote)
        };
        print_single(&shown);
        Ok(())
    }
}
