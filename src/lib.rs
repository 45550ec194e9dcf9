//! Core library entry for the `ecs-reconcile` CLI.
//!
//! Local task and service definitions are compared with, and checked
//! against, the deployed state: [`diff`] renders canonical differences and
//! [`verify`] walks a tree of named resource checks.

pub mod adapters;
pub mod canonical;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod diff;
pub mod error;
pub mod loader;
pub mod logging;
pub mod model;
pub mod ports;
pub mod verify;

use clap::error::ErrorKind;
use clap::Parser;

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match cli::Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            print!("{err}");
            return Ok(());
        }
        Err(err) => return Err(err.to_string()),
    };
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to start runtime: {e}"))?;
    let mut stdout = std::io::stdout();
    runtime.block_on(commands::dispatch(&cli, &mut stdout)).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::run;

    #[test]
    fn run_prints_help() {
        assert!(run(["ecs-reconcile", "--help"]).is_ok());
    }

    #[test]
    fn run_errors_on_unknown_subcommand() {
        let result = run(["ecs-reconcile", "unknown"]);
        assert!(result.is_err());
    }

    #[test]
    fn run_errors_on_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("absent.yml");
        let args = ["ecs-reconcile", "--config", config.to_str().unwrap(), "verify"];
        let err = run(args).unwrap_err();
        assert!(err.starts_with("failed to read config"), "{err}");
    }
}
