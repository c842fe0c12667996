//! Real shell and git through the process gateway.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use blockbuild_lib::exec::{CommandRunner, ExecError, ShellRunner, run_checked};
use blockbuild_lib::vcs;
use tempfile::tempdir;

fn git(dir: &Path, args: &[&str]) -> bool {
  Command::new("git")
    .args(["-c", "user.name=blockbuild", "-c", "user.email=ci@example.com"])
    .args(args)
    .current_dir(dir)
    .output()
    .is_ok_and(|o| o.status.success())
}

#[tokio::test]
async fn reads_commit_and_message_from_real_repository() {
  let temp = tempdir().unwrap();
  if !git(temp.path(), &["init", "-q"])
    || !git(temp.path(), &["commit", "-q", "--allow-empty", "-m", "Bump\n\n[blockbuild:build] alpha"])
  {
    eprintln!("git unavailable, skipping");
    return;
  }
  let runner = ShellRunner::new();

  let hash = vcs::current_commit(&runner, temp.path()).await.unwrap();
  let message = vcs::latest_message(&runner, temp.path()).await.unwrap();

  assert_eq!(hash.len(), 40);
  assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
  assert!(message.ends_with("[blockbuild:build] alpha"));
}

#[tokio::test]
async fn nonzero_exit_is_reported_with_context() {
  let temp = tempdir().unwrap();
  let runner = ShellRunner::new();

  let output = runner.run("echo out; echo err >&2; exit 3", temp.path()).await.unwrap();
  assert_eq!(output.code, Some(3));
  assert_eq!(output.stdout, "out");
  assert_eq!(output.stderr, "err");

  let err = run_checked(&runner, "exit 3", temp.path(), "failed to frobnicate")
    .await
    .unwrap_err();
  assert!(err.to_string().starts_with("failed to frobnicate (exit code Some(3))"));
}

#[tokio::test]
async fn timeout_is_fatal() {
  let temp = tempdir().unwrap();
  let runner = ShellRunner::new().with_timeout(Some(Duration::from_millis(100)));

  let err = runner.run("sleep 5", temp.path()).await.unwrap_err();
  assert!(matches!(err, ExecError::TimedOut { .. }));
}
