//! Rebuild decisions.
//!
//! A module is rebuilt when its checkout moved since the last published run,
//! or when a directive forces it. [`decide`] is a pure function of its inputs;
//! [`plan_modules`] gathers those inputs for every configured module.

use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::ModuleDescriptor;
use crate::directive::DirectiveSet;
use crate::exec::CommandRunner;
use crate::layout::Layout;
use crate::manifest::CommitManifest;
use crate::vcs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildOutcome {
  /// Unchanged since the last run; previous artifacts are kept.
  Skipped,
  /// Unchanged, but a directive demanded a rebuild.
  ForcedRebuilt,
  /// New commit, or no usable prior record.
  ChangedRebuilt,
  /// The current commit could not be determined; the module is left out of this run.
  Failed,
}

impl BuildOutcome {
  pub fn needs_build(self) -> bool {
    matches!(self, BuildOutcome::ForcedRebuilt | BuildOutcome::ChangedRebuilt)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      BuildOutcome::Skipped => "skipped",
      BuildOutcome::ForcedRebuilt => "forced",
      BuildOutcome::ChangedRebuilt => "changed",
      BuildOutcome::Failed => "failed",
    }
  }
}

impl fmt::Display for BuildOutcome {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Decide what to do with one module.
pub fn decide(current: &str, prior: Option<&str>, directives: &DirectiveSet, module: &str) -> BuildOutcome {
  if prior != Some(current) {
    return BuildOutcome::ChangedRebuilt;
  }
  if directives.forces(module) {
    BuildOutcome::ForcedRebuilt
  } else {
    BuildOutcome::Skipped
  }
}

/// The decision for one module along with the hashes it was based on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModulePlan {
  pub module: ModuleDescriptor,
  pub current: Option<String>,
  pub prior: Option<String>,
  pub outcome: BuildOutcome,
}

impl ModulePlan {
  /// Commit to record for this module: the fresh hash, else whatever was recorded before.
  pub fn recorded_commit(&self) -> Option<&str> {
    self.current.as_deref().or(self.prior.as_deref())
  }
}

/// Decide for every module, in configured order.
///
/// Failing to read a module's commit only affects that module.
pub async fn plan_modules<R: CommandRunner>(
  runner: &R,
  layout: &Layout,
  modules: &[ModuleDescriptor],
  prior: &CommitManifest,
  directives: &DirectiveSet,
) -> Vec<ModulePlan> {
  let mut plans = Vec::with_capacity(modules.len());

  for module in modules {
    let name = module.name.as_str();
    let prior_commit = prior.prior_for(name).map(str::to_string);

    let (current, outcome) = match vcs::current_commit(runner, &layout.module_dir(name)).await {
      Ok(hash) => {
        let outcome = decide(&hash, prior_commit.as_deref(), directives, name);
        (Some(hash), outcome)
      }
      Err(e) => {
        warn!(module = %name, error = %e, "failed to get commit hash, leaving module out of this run");
        (None, BuildOutcome::Failed)
      }
    };

    match outcome {
      BuildOutcome::Skipped => info!(module = %name, "skipping, commit hash is unchanged"),
      BuildOutcome::ForcedRebuilt => info!(module = %name, "commit is unchanged, but force building anyways"),
      BuildOutcome::ChangedRebuilt => info!(
        module = %name,
        prior = prior_commit.as_deref().unwrap_or("none"),
        current = current.as_deref().unwrap_or_default(),
        "commit changed, rebuilding"
      ),
      BuildOutcome::Failed => {}
    }

    plans.push(ModulePlan {
      module: module.clone(),
      current,
      prior: prior_commit,
      outcome,
    });
  }

  plans
}
