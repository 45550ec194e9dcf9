//! Process runner backed by `tokio::process`.

use std::error::Error;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::ports::{CommandOutput, CommandRunner};

/// Spawns real child processes.
///
/// The child is killed when the returned future is dropped, so a timeout
/// around the call also stops the process.
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<CommandOutput, Box<dyn Error + Send + Sync>> {
        tracing::debug!(program, ?args, cwd = %cwd.display(), "running external command");
        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| format!("failed to run {program}: {e}"))?;
        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_in_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "here").unwrap();
        let out = ProcessRunner
            .run("cat", &["marker.txt".to_string()], dir.path())
            .await
            .unwrap();
        assert_eq!(out.exit_code, Some(0));
        assert_eq!(out.stdout, "here");
    }

    #[tokio::test]
    async fn reports_non_zero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let out = ProcessRunner
            .run("sh", &["-c".to_string(), "exit 3".to_string()], dir.path())
            .await
            .unwrap();
        assert_eq!(out.exit_code, Some(3));
    }

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ProcessRunner.run("ecs-reconcile-no-such-tool", &[], dir.path()).await.is_err());
    }
}
