//! Command runner port for launching external processes.

use std::error::Error;
use std::path::Path;

use async_trait::async_trait;

/// The result of running an external command to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// The exit code, or `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    /// The captured standard output.
    pub stdout: String,
}

/// Runs external programs such as a user-configured diff tool.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `program` with `args` in `cwd`, inheriting standard error and
    /// capturing standard output.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be spawned or waited on.
    async fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<CommandOutput, Box<dyn Error + Send + Sync>>;
}
