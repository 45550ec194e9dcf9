//! Command dispatch and handlers.

pub mod diff;
pub mod verify;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use crate::adapters::live::{HttpRegistry, LocalFileSystem};
use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::context::ServiceContext;
use crate::error::{Error, Result};

/// Builds the service context for a parsed command line.
///
/// # Errors
///
/// Returns an error when no remote state file is given or it cannot be loaded.
pub fn context(cli: &Cli, config: &Config) -> Result<ServiceContext> {
    let Some(path) = &cli.remote_state else {
        return Err(Error::Config("--remote-state is required".into()));
    };
    let services = ServiceContext::from_remote_state(path, config.region())?;
    if cli.live_registry {
        return Ok(services.with_registry(Arc::new(HttpRegistry::new())));
    }
    Ok(services)
}

/// Dispatch a parsed command line, writing command output to `out`.
///
/// The whole command runs under the configured timeout.
///
/// # Errors
///
/// Returns an error if configuration fails, the selected command fails, or
/// the timeout elapses.
pub async fn dispatch(cli: &Cli, out: &mut (dyn Write + Send)) -> Result<()> {
    let color = cli.color().unwrap_or_else(|| colored::control::SHOULD_COLORIZE.should_colorize());
    colored::control::set_override(color);

    let config = Config::load(&LocalFileSystem, &cli.config)?;
    let services = context(cli, &config)?;
    let work = async {
        match &cli.command {
            Command::Diff(args) => diff::run(&services, &config, args, color, out).await,
            Command::Verify(args) => verify::run(&services, &config, args, color, out).await,
        }
    };
    tokio::time::timeout(Duration::from_secs(config.timeout), work)
        .await
        .map_err(|_| Error::Timeout(config.timeout))?
}
