//! Implementation of the `blockbuild run` command.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

use blockbuild_lib::config::RunContext;
use blockbuild_lib::decision::{BuildOutcome, ModulePlan};
use blockbuild_lib::exec::ShellRunner;
use blockbuild_lib::fetch::RemoteState;
use blockbuild_lib::pipeline::{Pipeline, RunReport, RunSummary};

use crate::output::{OutputFormat, Status, elapsed, emit_json, human_size, print_decision, stat, status};

#[derive(Serialize)]
struct RunOutput<'a> {
  skipped: bool,
  modules: &'a [ModulePlan],
  files: usize,
  signatures: usize,
  bundle: Option<String>,
}

/// Run the full pipeline against the workspace in `ctx`.
///
/// A run skipped by directive is a success.
pub fn cmd_run(ctx: RunContext, timeout: Option<Duration>, output: OutputFormat) -> Result<()> {
  let start = Instant::now();
  debug!(root = ?ctx.layout.root(), modules = ctx.config.modules.len(), signed = ctx.signing_enabled(), "starting run");
  let runner = ShellRunner::new().with_timeout(timeout);
  let remote = RemoteState::new(&ctx.config.host).context("Failed to create HTTP client")?;

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let report = rt
    .block_on(Pipeline::new(&ctx, &runner, &remote).run())
    .context("Build run failed")?;

  let summary = match report {
    RunReport::Skipped => {
      if output.is_json() {
        emit_json(&RunOutput {
          skipped: true,
          modules: &[],
          files: 0,
          signatures: 0,
          bundle: None,
        })?;
      } else {
        status(Status::Note, "Commit was set to skip all builds");
      }
      return Ok(());
    }
    RunReport::Completed(summary) => summary,
  };

  if output.is_json() {
    return emit_json(&RunOutput {
      skipped: false,
      modules: &summary.plans,
      files: summary.hashes.len(),
      signatures: summary.signatures.len(),
      bundle: Some(summary.bundle.display().to_string()),
    });
  }

  print_text(&summary, start.elapsed());
  Ok(())
}

fn print_text(summary: &RunSummary, took: Duration) {
  for plan in &summary.plans {
    print_decision(plan);
  }
  for plan in summary.plans.iter().filter(|p| p.outcome == BuildOutcome::Failed) {
    status(Status::Warn, &format!("{}: commit hash unavailable, not built", plan.module.name));
  }

  println!();
  status(Status::Done, "Build complete!");
  stat("Rebuilt (changed)", summary.count(BuildOutcome::ChangedRebuilt));
  stat("Rebuilt (forced)", summary.count(BuildOutcome::ForcedRebuilt));
  stat("Unchanged", summary.count(BuildOutcome::Skipped));
  stat("Files hashed", summary.hashes.len());
  if !summary.signatures.is_empty() {
    stat("Signatures", summary.signatures.len());
  }
  let size = std::fs::metadata(&summary.bundle).map(|m| m.len()).unwrap_or(0);
  stat("Bundle", format!("{} ({})", summary.bundle.display(), human_size(size)));
  stat("Duration", elapsed(took));
}
