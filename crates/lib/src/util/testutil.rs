//! Test utilities for blockbuild-lib.
//!
//! [`FakeRunner`] stands in for the shell: each rule matches a substring of the
//! command line and produces a canned [`CommandOutput`], optionally touching the
//! filesystem the way the real tool would. Every invocation is recorded.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::exec::{CommandOutput, CommandRunner, ExecError};

type Responder = Box<dyn Fn(&str, &Path) -> CommandOutput + Send + Sync>;

struct Rule {
  pattern: String,
  respond: Responder,
}

/// A recorded invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
  pub command: String,
  pub dir: PathBuf,
}

/// Scripted [`CommandRunner`]. Unmatched commands succeed with empty output.
#[derive(Default)]
pub struct FakeRunner {
  rules: Vec<Rule>,
  calls: Mutex<Vec<Call>>,
}

impl FakeRunner {
  pub fn new() -> Self {
    Self::default()
  }

  /// Respond to commands containing `pattern` with a fixed output.
  pub fn on(self, pattern: &str, output: CommandOutput) -> Self {
    self.on_with(pattern, move |_, _| output.clone())
  }

  /// Respond to commands containing `pattern` by calling `respond`.
  pub fn on_with(mut self, pattern: &str, respond: impl Fn(&str, &Path) -> CommandOutput + Send + Sync + 'static) -> Self {
    self.rules.push(Rule {
      pattern: pattern.to_string(),
      respond: Box::new(respond),
    });
    self
  }

  pub fn calls(&self) -> Vec<Call> {
    self.calls.lock().unwrap().clone()
  }

  /// Commands whose text contains `pattern`.
  pub fn calls_matching(&self, pattern: &str) -> Vec<Call> {
    self
      .calls()
      .into_iter()
      .filter(|call| call.command.contains(pattern))
      .collect()
  }

  fn respond(&self, command: &str, dir: &Path) -> CommandOutput {
    self.calls.lock().unwrap().push(Call {
      command: command.to_string(),
      dir: dir.to_path_buf(),
    });

    self
      .rules
      .iter()
      .find(|rule| command.contains(&rule.pattern))
      .map(|rule| (rule.respond)(command, dir))
      .unwrap_or_else(|| CommandOutput::ok(""))
  }
}

impl CommandRunner for FakeRunner {
  fn run(&self, command: &str, working_dir: &Path) -> impl Future<Output = Result<CommandOutput, ExecError>> + Send {
    std::future::ready(Ok(self.respond(command, working_dir)))
  }
}

/// Value following `flag` in a command line, with surrounding quotes removed.
pub fn arg_after(command: &str, flag: &str) -> Option<String> {
  let mut words = command.split_whitespace();
  words.find(|word| *word == flag)?;
  words.next().map(|word| word.trim_matches('"').to_string())
}

/// Emulates `gpg --output <file> ...` by writing a placeholder signature/key.
pub fn gpg_writes_output(command: &str, _dir: &Path) -> CommandOutput {
  if let Some(out) = arg_after(command, "--output") {
    std::fs::write(out, format!("signed by: {}", command)).unwrap();
  }
  CommandOutput::ok("")
}

/// Emulates `gradlew build -p <project>` by dropping jars into the output directory.
pub fn gradle_builds(jars: &'static [&'static str]) -> impl Fn(&str, &Path) -> CommandOutput + Send + Sync + 'static {
  move |command, dir| {
    let project = arg_after(command, "-p").unwrap_or_else(|| ".".to_string());
    let libs = dir.join(project).join("build").join("libs");
    std::fs::create_dir_all(&libs).unwrap();
    for jar in jars {
      std::fs::write(libs.join(jar), format!("contents of {}", jar)).unwrap();
    }
    CommandOutput::ok("BUILD SUCCESSFUL")
  }
}

/// Create an executable gradle wrapper stub for a module checkout.
pub fn write_gradle_wrapper(module_dir: &Path) {
  std::fs::create_dir_all(module_dir).unwrap();
  let wrapper = module_dir.join("gradlew");
  std::fs::write(&wrapper, "#!/bin/sh\n").unwrap();
  #[cfg(unix)]
  {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(&wrapper, std::fs::Permissions::from_mode(0o755)).unwrap();
  }
}
