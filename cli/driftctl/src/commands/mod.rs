//! CLI commands.

mod apply;
mod diff;
mod get;
mod kinds;
mod list;

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use drift_reconcile::{HandlerRegistry, Reconciler, RegistryHandle};
use drift_synthmon::{SmClient, SyntheticMonitoringHandler};

use crate::config::Config;
use crate::error::CliError;
use crate::output::OutputFormat;

/// driftctl - converge declared resources with remote systems.
#[derive(Debug, Parser)]
#[command(name = "driftctl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format (table or json).
    #[arg(long, global = true, default_value = "table")]
    format: String,

    /// Resources reconciled concurrently.
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    /// Deadline for each remote call, in seconds.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create or update remote resources to match the given files.
    Apply(apply::ApplyCommand),

    /// Show what apply would change, without changing anything.
    Diff(diff::DiffCommand),

    /// Fetch one remote resource by its server-assigned UID.
    Get(get::GetCommand),

    /// List remote resources of a kind.
    List(list::ListCommand),

    /// List supported resource kinds.
    Kinds(kinds::KindsCommand),

    /// Show CLI version.
    Version,
}

impl Cli {
    /// Log filter used when `RUST_LOG` is unset.
    pub fn default_log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }

    /// Run the CLI command.
    pub async fn run(self) -> Result<()> {
        let mut config = Config::load()?;
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(timeout_secs) = self.timeout_secs {
            config.timeout_secs = Some(timeout_secs);
        }

        let ctx = CommandContext {
            config,
            format: OutputFormat::parse(&self.format),
        };

        match self.command {
            Commands::Apply(cmd) => cmd.run(ctx).await,
            Commands::Diff(cmd) => cmd.run(ctx).await,
            Commands::Get(cmd) => cmd.run(ctx).await,
            Commands::List(cmd) => cmd.run(ctx).await,
            Commands::Kinds(cmd) => cmd.run(ctx),
            Commands::Version => {
                println!("driftctl {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }
}

/// Shared command context.
pub struct CommandContext {
    pub config: Config,
    pub format: OutputFormat,
}

impl CommandContext {
    /// Build the handler registry once for this invocation.
    pub fn registry(&self) -> Result<RegistryHandle> {
        let sm = self.config.sm_config()?;
        let client = SmClient::new(&sm).map_err(CliError::from)?;

        let mut builder = HandlerRegistry::builder();
        builder.register_handler(Arc::new(SyntheticMonitoringHandler::new(client)))?;
        Ok(builder.build())
    }

    pub fn reconciler(&self) -> Result<Reconciler> {
        Ok(Reconciler::new(
            self.registry()?,
            self.config.reconciler_config(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_filter() {
        let cli = Cli::parse_from(["driftctl", "-vv", "kinds"]);
        assert_eq!(cli.default_log_filter(), "debug");

        let cli = Cli::parse_from(["driftctl", "version"]);
        assert_eq!(cli.default_log_filter(), "warn");
    }
}
