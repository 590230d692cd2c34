//! Kinds command.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use crate::output::print_output;

use super::CommandContext;

/// List supported resource kinds.
#[derive(Debug, Args)]
pub struct KindsCommand {}

#[derive(Debug, Serialize, Tabled)]
struct KindRow {
    #[tabled(rename = "KIND")]
    kind: &'static str,
    #[tabled(rename = "API VERSION")]
    api_version: &'static str,
}

/// Kinds with a built-in handler.
fn supported_kinds() -> Vec<KindRow> {
    vec![KindRow {
        kind: drift_synthmon::KIND,
        api_version: drift_synthmon::API_VERSION,
    }]
}

impl KindsCommand {
    pub fn run(self, ctx: CommandContext) -> Result<()> {
        print_output(&supported_kinds(), ctx.format);
        Ok(())
    }
}
