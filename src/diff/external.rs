//! Diffing through an operator-supplied command.

use crate::error::{Error, Result};
use crate::ports::{CommandRunner, FileSystem};

/// Splits a command line into words with POSIX shell quoting rules.
///
/// # Errors
///
/// Returns [`Error::Config`] for an unterminated quote or escape.
pub fn split_command(line: &str) -> Result<Vec<String>> {
    shell_words::split(line)
        .map_err(|e| Error::Config(format!("invalid diff command {line:?}: {e}")))
}

/// Writes both texts under a scratch directory and returns what `command`
/// prints when given `remote/<target>.json local/<target>.json`.
///
/// The command runs with the scratch directory as its working directory,
/// so the appended paths are relative. The directory is removed on return.
///
/// # Errors
///
/// Returns an error when the command line is empty or unparsable, when the
/// scratch files cannot be written, or when the command cannot be launched
/// or exits non-zero.
pub async fn run(
    commands: &dyn CommandRunner,
    fs: &dyn FileSystem,
    command: &str,
    target: &str,
    remote: &str,
    local: &str,
) -> Result<String> {
    let mut argv = split_command(command)?;
    if argv.is_empty() {
        return Err(Error::Config("diff command is empty".into()));
    }
    let program = argv.remove(0);

    let dir = tempfile::Builder::new()
        .prefix("ecs-reconcile-diff-")
        .tempdir()
        .map_err(|e| Error::io("failed to create diff directory", &e))?;
    let remote_rel = format!("remote/{target}.json");
    let local_rel = format!("local/{target}.json");
    for (rel, text) in [(&remote_rel, remote), (&local_rel, local)] {
        fs.write(&dir.path().join(rel), text)
            .map_err(|e| Error::io(format!("failed to write {rel}"), &e))?;
    }
    argv.push(remote_rel);
    argv.push(local_rel);

    tracing::debug!(program = %program, args = ?argv, "running external diff");
    let output = commands
        .run(&program, &argv, dir.path())
        .await
        .map_err(|e| Error::io(format!("failed to run {program}"), &e))?;
    match output.exit_code {
        Some(0) => Ok(output.stdout),
        Some(code) => Err(Error::Io {
            context: format!("failed to run {program}"),
            message: format!("exit status {code}"),
        }),
        None => Err(Error::Io {
            context: format!("failed to run {program}"),
            message: "terminated by signal".into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::live::{LocalFileSystem, ProcessRunner};

    #[test]
    fn splits_quoted_words() {
        assert_eq!(
            split_command(r#"diff -u --label 'a b' "c \"d\"" e\ f"#).unwrap(),
            vec!["diff", "-u", "--label", "a b", r#"c "d""#, "e f"]
        );
        assert_eq!(split_command("  ").unwrap(), Vec::<String>::new());
        assert_eq!(split_command("''").unwrap(), vec![String::new()]);
    }

    #[test]
    fn rejects_unterminated_quotes() {
        assert!(matches!(split_command("diff 'oops"), Err(Error::Config(_))));
        assert!(matches!(split_command("diff \"oops"), Err(Error::Config(_))));
        assert!(matches!(split_command("diff oops\\"), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn appends_relative_paths_and_captures_stdout() {
        let out = run(&ProcessRunner, &LocalFileSystem, "cat", "taskdef", "R\n", "L\n")
            .await
            .unwrap();
        assert_eq!(out, "R\nL\n");
    }

    #[tokio::test]
    async fn passes_extra_arguments_before_paths() {
        let out = run(&ProcessRunner, &LocalFileSystem, "echo target", "service", "", "")
            .await
            .unwrap();
        assert_eq!(out, "target remote/service.json local/service.json\n");
    }

    #[tokio::test]
    async fn non_zero_exit_is_an_error() {
        let err = run(&ProcessRunner, &LocalFileSystem, "false", "taskdef", "", "")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "failed to run false: exit status 1");
    }

    #[tokio::test]
    async fn empty_command_is_rejected() {
        let err = run(&ProcessRunner, &LocalFileSystem, " ", "taskdef", "", "").await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
