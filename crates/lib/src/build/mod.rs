//! Module builds.
//!
//! A rebuild clears the project's stale output, runs `gradlew build`, and
//! copies every produced file into a freshly recreated `out/<module>/`.
//! A failed build stops the whole run: nothing is published from a broken tree.

mod gradle;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::config::ModuleDescriptor;
use crate::exec::{CommandRunner, ExecError, run_checked};
use crate::layout::Layout;

pub use gradle::GradleProject;

#[derive(Debug, Error)]
pub enum BuildError {
  #[error("gradle wrapper not found at {0}")]
  WrapperMissing(PathBuf),

  #[error("build produced no output directory at {0}")]
  OutputMissing(PathBuf),

  #[error(transparent)]
  Exec(#[from] ExecError),

  #[error("io error at {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Result of building one module.
#[derive(Debug, Clone)]
pub struct BuiltModule {
  pub project: GradleProject,
  /// Files as produced in the gradle output directory.
  pub artifacts: Vec<PathBuf>,
  /// The same files copied into staging.
  pub staged: Vec<PathBuf>,
}

/// Build `module` and stage its artifacts.
pub async fn build_module<R: CommandRunner>(
  runner: &R,
  layout: &Layout,
  module: &ModuleDescriptor,
) -> Result<BuiltModule, BuildError> {
  let name = module.name.as_str();
  let project = GradleProject::new(layout.module_dir(name), module.project.as_str());
  let output_dir = project.output_dir();

  info!(module = %name, "building");

  if output_dir.exists() {
    debug!(path = ?output_dir, "cleaning build directory");
    fs::remove_dir_all(&output_dir).map_err(io_err(&output_dir))?;
  }

  project.ensure_wrapper()?;

  run_checked(
    runner,
    &project.command("build", &[]),
    project.module_dir(),
    &format!("failed to build {}", name),
  )
  .await?;

  if !output_dir.is_dir() {
    return Err(BuildError::OutputMissing(output_dir));
  }

  let stage_dir = layout.module_out_dir(name);
  let artifacts = list_files(&output_dir)?;
  let staged = stage(&artifacts, &stage_dir)?;

  info!(module = %name, count = staged.len(), "copied build artifacts");

  Ok(BuiltModule {
    project,
    artifacts,
    staged,
  })
}

/// Regular files directly inside `dir`, sorted by name.
fn list_files(dir: &Path) -> Result<Vec<PathBuf>, BuildError> {
  let mut files = Vec::new();
  for entry in fs::read_dir(dir).map_err(io_err(dir))? {
    let entry = entry.map_err(io_err(dir))?;
    let file_type = entry.file_type().map_err(io_err(&entry.path()))?;
    if file_type.is_file() {
      files.push(entry.path());
    } else {
      debug!(path = ?entry.path(), "ignoring non-file build output");
    }
  }
  files.sort();
  Ok(files)
}

/// Replace `stage_dir` with copies of `files`.
fn stage(files: &[PathBuf], stage_dir: &Path) -> Result<Vec<PathBuf>, BuildError> {
  if stage_dir.exists() {
    fs::remove_dir_all(stage_dir).map_err(io_err(stage_dir))?;
  }
  fs::create_dir_all(stage_dir).map_err(io_err(stage_dir))?;

  let mut staged = Vec::with_capacity(files.len());
  for file in files {
    let Some(file_name) = file.file_name() else {
      continue;
    };
    let dest = stage_dir.join(file_name);
    fs::copy(file, &dest).map_err(io_err(&dest))?;
    staged.push(dest);
  }
  Ok(staged)
}

fn io_err(path: &Path) -> impl Fn(io::Error) -> BuildError + '_ {
  move |source| BuildError::Io {
    path: path.to_path_buf(),
    source,
  }
}
