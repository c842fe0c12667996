//! External process gateway.
//!
//! Every external tool the pipeline drives (git, gradle, maven, gpg) is reached
//! through [`CommandRunner`]. A non-zero exit is returned as data; callers that
//! treat it as fatal go through [`run_checked`].

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Errors from running an external command.
#[derive(Debug, Error)]
pub enum ExecError {
  /// The shell could not be started at all.
  #[error("failed to spawn `{cmd}` in {dir}: {source}")]
  Spawn {
    cmd: String,
    dir: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The command ran longer than the configured limit.
  #[error("command timed out after {timeout:?}: {cmd}")]
  TimedOut { cmd: String, timeout: Duration },

  /// The command exited unsuccessfully where success was required.
  #[error("{context} (exit code {code:?}): {cmd}{}", indented(.stderr))]
  Failed {
    context: String,
    cmd: String,
    code: Option<i32>,
    stderr: String,
  },
}

/// Tool output appended below an error line, one indented line per output line.
fn indented(output: &str) -> String {
  output.lines().map(|line| format!("\n  {}", line)).collect()
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
  /// Exit code, `None` when terminated by a signal.
  pub code: Option<i32>,
  /// Trimmed stdout.
  pub stdout: String,
  /// Trimmed stderr.
  pub stderr: String,
}

impl CommandOutput {
  pub fn ok(stdout: impl Into<String>) -> Self {
    Self {
      code: Some(0),
      stdout: stdout.into(),
      stderr: String::new(),
    }
  }

  pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
    Self {
      code: Some(code),
      stdout: String::new(),
      stderr: stderr.into(),
    }
  }

  pub fn success(&self) -> bool {
    self.code == Some(0)
  }
}

/// Runs a shell command line in a working directory.
pub trait CommandRunner: Send + Sync {
  fn run(&self, command: &str, working_dir: &Path) -> impl Future<Output = Result<CommandOutput, ExecError>> + Send;
}

/// Run a command and turn a non-zero exit into [`ExecError::Failed`].
pub async fn run_checked<R: CommandRunner>(
  runner: &R,
  command: &str,
  working_dir: &Path,
  context: &str,
) -> Result<CommandOutput, ExecError> {
  let output = runner.run(command, working_dir).await?;
  if output.success() {
    return Ok(output);
  }

  if !output.stdout.is_empty() {
    warn!(cmd = %command, stdout = %output.stdout, "output of failed command");
  }

  Err(ExecError::Failed {
    context: context.to_string(),
    cmd: command.to_string(),
    code: output.code,
    stderr: output.stderr,
  })
}

/// [`CommandRunner`] backed by the platform shell.
///
/// Unlike isolated build sandboxes, the inherited environment is kept: the
/// tools invoked here need the CI runner's PATH, JAVA_HOME and GNUPGHOME.
#[derive(Debug, Clone, Default)]
pub struct ShellRunner {
  timeout: Option<Duration>,
}

impl ShellRunner {
  pub fn new() -> Self {
    Self::default()
  }

  /// Abort any command running longer than `timeout`. A timeout is fatal, never retried.
  pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
    self.timeout = timeout;
    self
  }
}

impl CommandRunner for ShellRunner {
  async fn run(&self, command: &str, working_dir: &Path) -> Result<CommandOutput, ExecError> {
    info!(cmd = %command, dir = ?working_dir, "executing command");

    let (shell_cmd, shell_args) = get_shell();

    let mut process = Command::new(&shell_cmd);
    process
      .args(&shell_args)
      .arg(command)
      .current_dir(working_dir)
      .kill_on_drop(true);

    debug!(shell = %shell_cmd, "spawning process");

    let spawned = match self.timeout {
      Some(limit) => tokio::time::timeout(limit, process.output())
        .await
        .map_err(|_| ExecError::TimedOut {
          cmd: command.to_string(),
          timeout: limit,
        })?,
      None => process.output().await,
    };

    let output = spawned.map_err(|source| ExecError::Spawn {
      cmd: command.to_string(),
      dir: working_dir.to_path_buf(),
      source,
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    if !stdout.is_empty() {
      debug!(stdout = %stdout, "command stdout");
    }
    if !stderr.is_empty() {
      debug!(stderr = %stderr, "command stderr");
    }

    Ok(CommandOutput {
      code: output.status.code(),
      stdout,
      stderr,
    })
  }
}

/// Shell command and arguments for the current platform.
fn get_shell() -> (String, Vec<String>) {
  #[cfg(unix)]
  {
    ("/bin/sh".to_string(), vec!["-c".to_string()])
  }

  #[cfg(windows)]
  {
    (
      "powershell.exe".to_string(),
      vec![
        "-NoProfile".to_string(),
        "-ExecutionPolicy".to_string(),
        "Bypass".to_string(),
        "-Command".to_string(),
      ],
    )
  }
}
