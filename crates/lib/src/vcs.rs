//! Git queries, run through the process gateway.

use std::path::Path;

use crate::exec::{CommandRunner, ExecError, run_checked};

/// Commit hash checked out at `dir`.
pub async fn current_commit<R: CommandRunner>(runner: &R, dir: &Path) -> Result<String, ExecError> {
  let context = format!("failed to get commit hash in {}", dir.display());
  let output = run_checked(runner, "git rev-parse HEAD", dir, &context).await?;

  if output.stdout.is_empty() {
    return Err(ExecError::Failed {
      context: format!("{}: empty output", context),
      cmd: "git rev-parse HEAD".to_string(),
      code: output.code,
      stderr: output.stderr,
    });
  }

  Ok(output.stdout)
}

/// Full message of the latest commit at `dir`.
pub async fn latest_message<R: CommandRunner>(runner: &R, dir: &Path) -> Result<String, ExecError> {
  let output = run_checked(runner, "git log -1 --pretty=%B", dir, "failed to get commit description").await?;
  Ok(output.stdout)
}
