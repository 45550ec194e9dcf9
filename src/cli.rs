//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI parser for `ecs-reconcile`.
#[derive(Debug, Parser)]
#[command(
    name = "ecs-reconcile",
    version,
    about = "Diff and verify task and service definitions against the deployed state"
)]
pub struct Cli {
    /// Config file.
    #[arg(long, short, env = "ECS_RECONCILE_CONFIG", default_value = "ecs-reconcile.yml")]
    pub config: PathBuf,
    /// YAML file describing the remote state to reconcile against.
    #[arg(long, env = "ECS_RECONCILE_REMOTE_STATE")]
    pub remote_state: Option<PathBuf>,
    /// Probe image registries over HTTP instead of the remote state file.
    #[arg(long)]
    pub live_registry: bool,
    /// Force coloured output.
    #[arg(long, overrides_with = "no_color")]
    pub color: bool,
    /// Disable coloured output.
    #[arg(long, overrides_with = "color")]
    pub no_color: bool,
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Resolves the colour flags, deferring to the environment when
    /// neither is given.
    #[must_use]
    pub fn color(&self) -> Option<bool> {
        match (self.color, self.no_color) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show differences between local definitions and the deployed ones.
    Diff(DiffArgs),
    /// Verify that resources referenced by the definitions exist and are usable.
    Verify(VerifyArgs),
}

/// Options for `diff`.
#[derive(Debug, Args)]
pub struct DiffArgs {
    /// Render a unified diff (default).
    #[arg(long, overrides_with = "no_unified")]
    pub unified: bool,
    /// Render every line instead of hunks.
    #[arg(long, overrides_with = "unified")]
    pub no_unified: bool,
    /// External diff command; receives the remote and local files as arguments.
    #[arg(long, env = "ECS_RECONCILE_DIFF_COMMAND")]
    pub external: Option<String>,
}

/// Options for `verify`.
#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Do not read secret values.
    #[arg(long)]
    pub no_get_secrets: bool,
    /// Do not write probe events to log streams.
    #[arg(long)]
    pub no_put_logs: bool,
    /// Re-run checks that already ran with the same inputs.
    #[arg(long)]
    pub no_cache: bool,
}
