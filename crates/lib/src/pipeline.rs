//! The build pipeline.
//!
//! A run is a fixed sequence of stages, each of which either succeeds or ends
//! the run:
//!
//! 1. Resolve directives from the latest commit (a `skip` ends the run here, successfully)
//! 2. Recreate the staging and scratch directories
//! 3. Fetch the previous run's manifests and restore its bundle into staging
//! 4. Remove the previous manifests, signatures and bundle from staging
//! 5. Decide per module whether to rebuild
//! 6. Build and publish every module that needs it
//! 7. Write `hashes.txt`, `commits.txt` and `info.txt`
//! 8. Sign, when a signing key is present
//! 9. Bundle the staging directory
//!
//! Only a module whose commit hash cannot be read is tolerated; it is left out
//! of the run and everything else proceeds.

use std::io;
use std::path::PathBuf;

use chrono::Utc;
use thiserror::Error;
use tracing::info;

use crate::archive::{self, ArchiveError};
use crate::build::{self, BuildError};
use crate::config::{ModuleDescriptor, RunContext, SigningIdentities};
use crate::consts::{BUNDLE_FILE, COMMITS_FILE, HASHES_FILE, INFO_FILE, UNKNOWN_COMMIT};
use crate::decision::{BuildOutcome, ModulePlan, plan_modules};
use crate::directive::DirectiveSet;
use crate::exec::{CommandRunner, ExecError};
use crate::fetch::{FetchError, PriorState, RemoteState};
use crate::manifest::{self, CommitManifest, HashManifest, ManifestError, RunInfo};
use crate::publish::{self, PublishError};
use crate::sign::{self, SignError, SignatureRecord};
use crate::vcs;

#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("failed to prepare workspace: {0}")]
  Prepare(#[source] io::Error),

  #[error(transparent)]
  Exec(#[from] ExecError),

  #[error(transparent)]
  Fetch(#[from] FetchError),

  #[error(transparent)]
  Archive(#[from] ArchiveError),

  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error(transparent)]
  Build(#[from] BuildError),

  #[error(transparent)]
  Publish(#[from] PublishError),

  #[error(transparent)]
  Sign(#[from] SignError),
}

#[derive(Debug)]
pub enum RunReport {
  /// The `skip` directive was present; nothing was touched.
  Skipped,
  Completed(RunSummary),
}

#[derive(Debug)]
pub struct RunSummary {
  pub plans: Vec<ModulePlan>,
  pub hashes: HashManifest,
  pub commits: CommitManifest,
  /// Rendered `info.txt`.
  pub info: String,
  pub signatures: Vec<SignatureRecord>,
  pub bundle: PathBuf,
}

impl RunSummary {
  pub fn count(&self, outcome: BuildOutcome) -> usize {
    self.plans.iter().filter(|plan| plan.outcome == outcome).count()
  }
}

/// Decisions computed without building anything.
#[derive(Debug)]
pub struct PlanReport {
  pub directives: DirectiveSet,
  pub plans: Vec<ModulePlan>,
}

pub struct Pipeline<'a, R> {
  ctx: &'a RunContext,
  runner: &'a R,
  remote: &'a RemoteState,
}

impl<'a, R: CommandRunner> Pipeline<'a, R> {
  pub fn new(ctx: &'a RunContext, runner: &'a R, remote: &'a RemoteState) -> Self {
    Self { ctx, runner, remote }
  }

  pub async fn run(&self) -> Result<RunReport, PipelineError> {
    let directives = self.resolve_directives().await?;
    if directives.skip {
      info!("commit was set to skip all builds");
      return Ok(RunReport::Skipped);
    }
    if directives.force_all {
      info!("commit was set to force all builds");
    }

    let identities = self.signing_identities()?;
    let layout = &self.ctx.layout;
    let out = layout.out_dir();

    info!("setting up filesystem");
    layout.prepare().map_err(PipelineError::Prepare)?;

    let prior = self.restore_prior().await?;
    manifest::clean_previous(&out)?;

    let plans = plan_modules(
      self.runner,
      layout,
      &self.ctx.config.modules,
      &prior.commits,
      &directives,
    )
    .await;

    for plan in plans.iter().filter(|plan| plan.outcome.needs_build()) {
      self.build_and_publish(&plan.module).await?;
    }

    info!("generating hash file");
    let hashes = HashManifest::generate(&out)?;
    manifest::write_file(&out, HASHES_FILE, &hashes.to_string())?;

    info!("generating commit file");
    let commits = commit_manifest(&plans);
    manifest::write_file(&out, COMMITS_FILE, &commits.to_string())?;

    let mut run_info = RunInfo {
      built_at: Utc::now(),
      commit: vcs::current_commit(self.runner, layout.root()).await?,
      log_url: self.ctx.env.job_url.clone(),
      hashes: hashes.clone(),
      commits: commits.clone(),
      keys: None,
    };

    let signatures = match (identities, self.ctx.env.secret_key.as_deref()) {
      (Some(identities), Some(secret_key)) => {
        info!("signing hashes");
        run_info.keys = Some(sign::prepare_keys(self.runner, layout, identities, secret_key).await?);
        manifest::write_file(&out, INFO_FILE, &run_info.render())?;
        sign::sign_staging(self.runner, layout, identities).await?
      }
      _ => {
        manifest::write_file(&out, INFO_FILE, &run_info.render())?;
        Vec::new()
      }
    };

    info!("compressing build artifacts");
    let bundle = archive::pack(&out, &layout.tmp_dir())?;

    info!("done");
    Ok(RunReport::Completed(RunSummary {
      plans,
      hashes,
      commits,
      info: run_info.render(),
      signatures,
      bundle,
    }))
  }

  /// Resolve directives and decisions only. Nothing on disk is changed.
  pub async fn plan(&self) -> Result<PlanReport, PipelineError> {
    let directives = self.resolve_directives().await?;
    let prior = PriorState::load(self.remote).await?;
    let plans = plan_modules(
      self.runner,
      &self.ctx.layout,
      &self.ctx.config.modules,
      &prior.commits,
      &directives,
    )
    .await;

    Ok(PlanReport { directives, plans })
  }

  async fn resolve_directives(&self) -> Result<DirectiveSet, PipelineError> {
    info!("parsing commit directives");
    let message = vcs::latest_message(self.runner, self.ctx.layout.root()).await?;
    Ok(DirectiveSet::resolve(&message, &self.ctx.env.directive_overrides))
  }

  /// Identities to sign with, or `None` when this run is unsigned.
  fn signing_identities(&self) -> Result<Option<&'a SigningIdentities>, SignError> {
    if !self.ctx.signing_enabled() {
      return Ok(None);
    }
    self
      .ctx
      .config
      .gpg
      .as_ref()
      .map(Some)
      .ok_or(SignError::MissingIdentities)
  }

  async fn restore_prior(&self) -> Result<PriorState, PipelineError> {
    info!("fetching previous build information");
    let prior = PriorState::load(self.remote).await?;

    let layout = &self.ctx.layout;
    let pending = layout.tmp_dir().join(BUNDLE_FILE);
    if self.remote.download(BUNDLE_FILE, &pending).await? {
      archive::unpack(&pending, &layout.out_dir())?;
    } else {
      info!("no previous build artifacts found");
    }

    Ok(prior)
  }

  async fn build_and_publish(&self, module: &ModuleDescriptor) -> Result<(), PipelineError> {
    let layout = &self.ctx.layout;
    let built = build::build_module(self.runner, layout, module).await?;
    publish::publish_module(
      self.runner,
      &module.name,
      &built.project,
      &built.artifacts,
      &layout.maven_dir(),
    )
    .await?;
    Ok(())
  }
}

/// One record per configured module, whatever its outcome.
fn commit_manifest(plans: &[ModulePlan]) -> CommitManifest {
  let mut commits = CommitManifest::new();
  for plan in plans {
    commits.push(
      plan.module.name.as_str(),
      plan.recorded_commit().unwrap_or(UNKNOWN_COMMIT),
    );
  }
  commits
}
