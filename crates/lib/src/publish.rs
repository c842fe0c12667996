//! Maven publication of built modules.
//!
//! Projects that apply `maven-publish` expose `publishToMavenLocal`, which is
//! pointed at the staging repository. Everything else is deployed file by file
//! with `mvn deploy:deploy-file`, using coordinates read from `gradlew properties`.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::build::GradleProject;
use crate::consts::MAVEN_REPOSITORY_ID;
use crate::exec::{CommandRunner, ExecError, run_checked};

pub const MAVEN_LOCAL_TASK: &str = "publishToMavenLocal";

const SOURCES_SUFFIX: &str = "-sources.jar";

#[derive(Debug, Error)]
pub enum PublishError {
  #[error("missing maven coordinates for {module}: group={group:?}, artifact={artifact:?}, version={version:?}")]
  MissingCoordinates {
    module: String,
    group: Option<String>,
    artifact: Option<String>,
    version: Option<String>,
  },

  #[error(transparent)]
  Exec(#[from] ExecError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishMethod {
  MavenPublish,
  ManualDeploy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinates {
  pub group: String,
  pub artifact: String,
  pub version: String,
}

impl Coordinates {
  /// Read `group`, `archivesBaseName` and `version` from `gradlew properties` output.
  pub fn from_properties(module: &str, properties: &str) -> Result<Self, PublishError> {
    let group = property(properties, "group");
    let artifact = property(properties, "archivesBaseName");
    let version = property(properties, "version");

    match (group, artifact, version) {
      (Some(group), Some(artifact), Some(version)) => Ok(Self {
        group,
        artifact,
        version,
      }),
      (group, artifact, version) => Err(PublishError::MissingCoordinates {
        module: module.to_string(),
        group,
        artifact,
        version,
      }),
    }
  }
}

/// Value of `key: value` in a property listing, with one layer of quotes removed.
fn property(properties: &str, key: &str) -> Option<String> {
  properties.lines().find_map(|line| {
    let (name, value) = line.split_once(':')?;
    if name.trim() != key {
      return None;
    }
    let value = value.trim();
    let unquoted = ['\'', '"']
      .into_iter()
      .find_map(|q| value.strip_prefix(q).and_then(|v| v.strip_suffix(q)))
      .unwrap_or(value);
    (!unquoted.is_empty()).then(|| unquoted.to_string())
  })
}

/// Whether a `gradlew tasks` listing offers `publishToMavenLocal`.
fn has_maven_local_task(tasks: &str) -> bool {
  tasks
    .lines()
    .any(|line| line.split_whitespace().next() == Some(MAVEN_LOCAL_TASK))
}

/// The sources jar paired with `artifact`, if it was built.
fn sources_for(artifact: &Path, artifacts: &[PathBuf]) -> Option<PathBuf> {
  let name = artifact.file_name()?.to_str()?;
  let stem = name.strip_suffix(".jar")?;
  let candidate = artifact.with_file_name(format!("{}{}", stem, SOURCES_SUFFIX));
  artifacts.contains(&candidate).then_some(candidate)
}

/// The main jar `sources` belongs to, if it was built.
fn main_for(sources: &Path, artifacts: &[PathBuf]) -> Option<PathBuf> {
  let name = sources.file_name()?.to_str()?;
  let stem = name.strip_suffix(SOURCES_SUFFIX)?;
  let candidate = sources.with_file_name(format!("{}.jar", stem));
  artifacts.contains(&candidate).then_some(candidate)
}

fn is_sources(artifact: &Path) -> bool {
  artifact
    .file_name()
    .and_then(|n| n.to_str())
    .is_some_and(|n| n.ends_with(SOURCES_SUFFIX))
}

fn deploy_args(coords: &Coordinates, file: &Path) -> Vec<String> {
  vec![
    "mvn deploy:deploy-file".to_string(),
    format!("-DgroupId={}", coords.group),
    format!("-DartifactId={}", coords.artifact),
    format!("-Dversion={}", coords.version),
    "-Dpackaging=jar".to_string(),
    format!("-DrepositoryId={}", MAVEN_REPOSITORY_ID),
    format!("-Dfile=\"{}\"", file.display()),
  ]
}

/// `mvn deploy:deploy-file` for one artifact, pairing its sources jar when present.
pub fn deploy_command(coords: &Coordinates, artifact: &Path, sources: Option<&Path>, repository: &Path) -> String {
  let mut args = deploy_args(coords, artifact);
  if let Some(sources) = sources {
    args.push(format!("-Dsources=\"{}\"", sources.display()));
  }
  args.push(format!("-Durl=\"file://{}\"", repository.display()));
  args.join(" ")
}

/// `mvn deploy:deploy-file` for a sources jar whose main jar was not built.
pub fn deploy_sources_command(coords: &Coordinates, sources: &Path, repository: &Path) -> String {
  let mut args = deploy_args(coords, sources);
  args.push("-Dclassifier=sources".to_string());
  args.push(format!("-Durl=\"file://{}\"", repository.display()));
  args.join(" ")
}

/// Publish a built module's artifacts into the maven repository at `repository`.
pub async fn publish_module<R: CommandRunner>(
  runner: &R,
  module: &str,
  project: &GradleProject,
  artifacts: &[PathBuf],
  repository: &Path,
) -> Result<PublishMethod, PublishError> {
  let dir = project.module_dir();
  info!(module = %module, "deploying to maven");

  let properties = run_checked(
    runner,
    &project.command("properties", &["-q"]),
    dir,
    &format!("failed to read gradle properties for {}", module),
  )
  .await?;
  let tasks = run_checked(
    runner,
    &project.command("tasks", &["-q"]),
    dir,
    &format!("failed to list gradle tasks for {}", module),
  )
  .await?;

  if has_maven_local_task(&tasks.stdout) {
    info!(module = %module, "using maven-publish");
    let repo_arg = format!("-Dmaven.repo.local=\"{}\"", repository.display());
    run_checked(
      runner,
      &project.command(MAVEN_LOCAL_TASK, &["-q", &repo_arg]),
      dir,
      &format!("failed to publish {} to maven", module),
    )
    .await?;
    return Ok(PublishMethod::MavenPublish);
  }

  info!(module = %module, "using manual publish");
  let coords = Coordinates::from_properties(module, &properties.stdout)?;

  for artifact in artifacts {
    let command = if !is_sources(artifact) {
      deploy_command(&coords, artifact, sources_for(artifact, artifacts).as_deref(), repository)
    } else if main_for(artifact, artifacts).is_none() {
      info!(module = %module, path = ?artifact, "sources jar has no main jar, deploying with classifier");
      deploy_sources_command(&coords, artifact, repository)
    } else {
      continue;
    };
    run_checked(runner, &command, dir, &format!("failed to publish {} to maven", module)).await?;
  }

  Ok(PublishMethod::ManualDeploy)
}
