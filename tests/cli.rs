//! Integration tests for top-level CLI behavior.

use std::path::Path;
use std::process::Command;

const REMOTE: &str = r#"
clusters:
  default: {}
task_definitions:
  - arn: arn:aws:ecs:us-east-1:000000000000:task-definition/web:1
    definition:
      family: web
      revision: 1
      containerDefinitions:
        - name: app
          image: nginx:1.25
images:
  registry-1.docker.io/library/nginx:1.25: [linux/amd64]
"#;

fn run_cli(dir: &Path, args: &[&str]) -> std::process::Output {
    let bin = env!("CARGO_BIN_EXE_ecs-reconcile");
    Command::new(bin)
        .args(args)
        .current_dir(dir)
        .env_remove("ECS_RECONCILE_CONFIG")
        .env_remove("ECS_RECONCILE_REMOTE_STATE")
        .env_remove("ECS_RECONCILE_DIFF_COMMAND")
        .env("ECS_RECONCILE_LOG", "error")
        .output()
        .expect("failed to run ecs-reconcile binary")
}

fn project(image: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("remote.yaml"), REMOTE).unwrap();
    std::fs::write(dir.path().join("ecs-reconcile.yml"), "task_definition: td.json\n").unwrap();
    let td = format!(
        r#"{{"family": "web", "containerDefinitions": [{{"name": "app", "image": "{image}"}}]}}"#
    );
    std::fs::write(dir.path().join("td.json"), td).unwrap();
    dir
}

#[test]
fn help_lists_subcommands() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_cli(dir.path(), &["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("diff"));
    assert!(stdout.contains("verify"));
}

#[test]
fn unknown_subcommand_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_cli(dir.path(), &["deploy"]);
    assert!(!output.status.success());
}

#[test]
fn remote_state_is_required() {
    let dir = project("nginx:1.25");
    let output = run_cli(dir.path(), &["verify"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("--remote-state is required"), "{stderr}");
}

#[test]
fn diff_without_changes_prints_nothing() {
    let dir = project("nginx:1.25");
    let output = run_cli(dir.path(), &["--remote-state", "remote.yaml", "diff"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(output.stdout.is_empty());
}

#[test]
fn diff_prints_changed_lines() {
    let dir = project("nginx:1.26");
    let output = run_cli(dir.path(), &["--remote-state", "remote.yaml", "--no-color", "diff"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("--- arn:aws:ecs:us-east-1:000000000000:task-definition/web:1\n"));
    assert!(stdout.contains("\n-      \"image\": \"nginx:1.25\",\n"));
    assert!(stdout.contains("\n+      \"image\": \"nginx:1.26\",\n"));
}

#[test]
fn slow_external_diff_times_out_and_is_killed() {
    let dir = project("nginx:1.26");
    std::fs::write(dir.path().join("ecs-reconcile.yml"), "task_definition: td.json\ntimeout: 1\n")
        .unwrap();
    let marker = dir.path().join("finished");
    let command = format!("sh -c 'sleep 3 >/dev/null 2>&1; touch {}'", marker.display());

    let started = std::time::Instant::now();
    let output =
        run_cli(dir.path(), &["--remote-state", "remote.yaml", "diff", "--external", &command]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("operation timed out after 1s"), "{stderr}");
    assert!(started.elapsed() < std::time::Duration::from_secs(3));

    std::thread::sleep(std::time::Duration::from_secs(4));
    assert!(!marker.exists(), "external diff kept running after the timeout");
}

#[test]
fn verify_reports_checks_and_succeeds() {
    let dir = project("nginx:1.25");
    let output = run_cli(dir.path(), &["--remote-state", "remote.yaml", "--no-color", "verify"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("  ContainerDefinition[app]\n"));
    assert!(stdout.contains("      Image[nginx:1.25]\n      --> [OK]\n"));
    assert!(stdout.ends_with("  Cluster\n  --> [OK]\n"));
}

#[test]
fn verify_failure_exits_non_zero() {
    let dir = project("nginx:9.99");
    let output = run_cli(dir.path(), &["--remote-state", "remote.yaml", "--no-color", "verify"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(
        stderr.contains(
            "verify TaskDefinition failed: verify ContainerDefinition[app] failed: \
             verify Image[nginx:9.99] failed: nginx:9.99 is not found in Registry"
        ),
        "{stderr}"
    );
}
