//! Implementation of the `blockbuild plan` command.
//!
//! Fetches the previous run's commit record and reports the decision for each
//! module. Nothing is built and the workspace is not modified.

use anyhow::{Context, Result};
use serde::Serialize;

use blockbuild_lib::config::RunContext;
use blockbuild_lib::decision::ModulePlan;
use blockbuild_lib::exec::ShellRunner;
use blockbuild_lib::fetch::RemoteState;
use blockbuild_lib::pipeline::Pipeline;

use crate::output::{OutputFormat, Status, emit_json, print_decision, status};

#[derive(Serialize)]
struct PlanOutput<'a> {
  skip: bool,
  force_all: bool,
  modules: &'a [ModulePlan],
}

pub fn cmd_plan(ctx: RunContext, output: OutputFormat) -> Result<()> {
  let runner = ShellRunner::new();
  let remote = RemoteState::new(&ctx.config.host).context("Failed to create HTTP client")?;

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let report = rt
    .block_on(Pipeline::new(&ctx, &runner, &remote).plan())
    .context("Failed to compute plan")?;

  if output.is_json() {
    return emit_json(&PlanOutput {
      skip: report.directives.skip,
      force_all: report.directives.force_all,
      modules: &report.plans,
    });
  }

  if report.directives.skip {
    status(Status::Note, "Commit is set to skip all builds; a run would do nothing");
    return Ok(());
  }
  if report.directives.force_all {
    status(Status::Note, "Commit is set to force all builds");
  }

  for plan in &report.plans {
    print_decision(plan);
  }

  let rebuilds = report.plans.iter().filter(|p| p.outcome.needs_build()).count();
  println!();
  status(Status::Note, &format!("Would rebuild {} of {} module(s)", rebuilds, report.plans.len()));

  Ok(())
}
