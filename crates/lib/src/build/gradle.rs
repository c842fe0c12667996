//! Gradle wrapper invocation.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use super::BuildError;

/// A gradle project inside a module checkout, driven through its `gradlew` wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradleProject {
  module_dir: PathBuf,
  project: String,
}

impl GradleProject {
  pub fn new(module_dir: impl Into<PathBuf>, project: impl Into<String>) -> Self {
    Self {
      module_dir: module_dir.into(),
      project: project.into(),
    }
  }

  /// Directory commands are run from.
  pub fn module_dir(&self) -> &Path {
    &self.module_dir
  }

  pub fn wrapper_path(&self) -> PathBuf {
    self.module_dir.join(wrapper_name())
  }

  /// Where `gradlew build` leaves its jars.
  pub fn output_dir(&self) -> PathBuf {
    self.module_dir.join(&self.project).join("build").join("libs")
  }

  /// Command line for `task` with any extra arguments.
  pub fn command(&self, task: &str, extra: &[&str]) -> String {
    let mut parts = vec![invocation().to_string(), task.to_string()];
    parts.extend(extra.iter().map(|arg| arg.to_string()));
    parts.push(format!("-p \"{}\"", self.project));
    parts.join(" ")
  }

  /// Fail if the wrapper is missing; make it executable if it is not.
  pub fn ensure_wrapper(&self) -> Result<(), BuildError> {
    let wrapper = self.wrapper_path();
    if !wrapper.is_file() {
      return Err(BuildError::WrapperMissing(wrapper));
    }

    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;

      let to_err = |source| BuildError::Io {
        path: wrapper.clone(),
        source,
      };
      let mode = fs::metadata(&wrapper).map_err(to_err)?.permissions().mode();
      if mode & 0o111 == 0 {
        info!(path = ?wrapper, "setting execute on gradlew");
        fs::set_permissions(&wrapper, fs::Permissions::from_mode(0o755)).map_err(to_err)?;
      }
    }

    Ok(())
  }
}

#[cfg(unix)]
fn wrapper_name() -> &'static str {
  "gradlew"
}

#[cfg(windows)]
fn wrapper_name() -> &'static str {
  "gradlew.bat"
}

#[cfg(unix)]
fn invocation() -> &'static str {
  "./gradlew"
}

#[cfg(windows)]
fn invocation() -> &'static str {
  "gradlew"
}
