//! Terminal output for blockbuild commands.
//!
//! Status lines go through [`status`]; module decisions are rendered the same
//! way by `plan` (what would happen) and `run` (what happened).

use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

use blockbuild_lib::decision::{BuildOutcome, ModulePlan};

/// Characters of a commit hash shown in decision lines.
const SHORT_COMMIT: usize = 12;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
  Done,
  Failed,
  Warn,
  Note,
}

/// Print a one-line status message. Failures and warnings go to stderr.
pub fn status(kind: Status, message: &str) {
  match kind {
    Status::Done => println!("{} {}", "✓".if_supports_color(Stream::Stdout, |s| s.green()), message),
    Status::Note => println!("{} {}", "•".if_supports_color(Stream::Stdout, |s| s.blue()), message),
    Status::Warn => eprintln!(
      "{} {}",
      "⚠".if_supports_color(Stream::Stderr, |s| s.yellow()),
      message.if_supports_color(Stream::Stderr, |s| s.yellow())
    ),
    Status::Failed => eprintln!(
      "{} {}",
      "✗".if_supports_color(Stream::Stderr, |s| s.red()),
      message.if_supports_color(Stream::Stderr, |s| s.red())
    ),
  }
}

pub fn stat(label: &str, value: impl std::fmt::Display) {
  println!("  {}: {}", label.if_supports_color(Stream::Stdout, |s| s.dimmed()), value);
}

pub fn emit_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}

pub fn outcome_marker(outcome: BuildOutcome) -> &'static str {
  match outcome {
    BuildOutcome::Skipped => "=",
    BuildOutcome::ForcedRebuilt => "!",
    BuildOutcome::ChangedRebuilt => "+",
    BuildOutcome::Failed => "?",
  }
}

/// First [`SHORT_COMMIT`] characters of a commit hash.
///
/// Commit files are hand-editable, so the value is not guaranteed to be hex.
pub fn short_commit(hash: &str) -> &str {
  hash.char_indices().nth(SHORT_COMMIT).map_or(hash, |(end, _)| &hash[..end])
}

/// Plain text of a module's decision: `marker name prior → current (outcome)`.
pub fn decision_line(plan: &ModulePlan) -> String {
  format!(
    "{} {} {} → {} ({})",
    outcome_marker(plan.outcome),
    plan.module.name,
    plan.prior.as_deref().map_or("none", short_commit),
    plan.current.as_deref().map_or("unknown", short_commit),
    plan.outcome.as_str()
  )
}

pub fn print_decision(plan: &ModulePlan) {
  let line = decision_line(plan);
  match plan.outcome {
    BuildOutcome::Skipped => println!("  {}", line.if_supports_color(Stream::Stdout, |s| s.dimmed())),
    BuildOutcome::Failed => println!("  {}", line.if_supports_color(Stream::Stdout, |s| s.yellow())),
    BuildOutcome::ForcedRebuilt | BuildOutcome::ChangedRebuilt => {
      println!("  {}", line.if_supports_color(Stream::Stdout, |s| s.bold()))
    }
  }
}

/// Bundle size in binary units, one decimal above bytes.
pub fn human_size(bytes: u64) -> String {
  let mut value = bytes as f64;
  for unit in ["B", "KiB", "MiB"] {
    if value < 1024.0 {
      return if unit == "B" { format!("{} B", bytes) } else { format!("{:.1} {}", value, unit) };
    }
    value /= 1024.0;
  }
  format!("{:.1} GiB", value)
}

/// Wall time of a run, rounded to milliseconds.
pub fn elapsed(duration: Duration) -> String {
  let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
  humantime::format_duration(Duration::from_millis(millis)).to_string()
}

#[cfg(test)]
mod tests {
  use super::*;
  use blockbuild_lib::config::ModuleDescriptor;

  fn plan(outcome: BuildOutcome, prior: Option<&str>, current: Option<&str>) -> ModulePlan {
    ModulePlan {
      module: ModuleDescriptor::new("alpha", "."),
      prior: prior.map(str::to_string),
      current: current.map(str::to_string),
      outcome,
    }
  }

  #[test]
  fn short_commit_keeps_twelve_chars() {
    assert_eq!(short_commit("9fceb02d0ae598e95dc970b74767f19372d61af8"), "9fceb02d0ae5");
    assert_eq!(short_commit("abc"), "abc");
    assert_eq!(short_commit(""), "");
  }

  #[test]
  fn short_commit_respects_char_boundaries() {
    assert_eq!(short_commit("ééééééééééééé"), "éééééééééééé");
    assert_eq!(short_commit("commit-héad-x"), "commit-héad-");
  }

  #[test]
  fn decision_line_for_changed_module() {
    let line = decision_line(&plan(
      BuildOutcome::ChangedRebuilt,
      Some("1111111111111111111111111111111111111111"),
      Some("2222222222222222222222222222222222222222"),
    ));
    assert_eq!(line, format!("+ alpha 111111111111 → 222222222222 ({})", BuildOutcome::ChangedRebuilt.as_str()));
  }

  #[test]
  fn decision_line_without_hashes() {
    let line = decision_line(&plan(BuildOutcome::Failed, None, None));
    assert!(line.starts_with("? alpha none → unknown ("), "{line}");
  }

  #[test]
  fn every_outcome_has_distinct_marker() {
    let markers = [
      BuildOutcome::Skipped,
      BuildOutcome::ForcedRebuilt,
      BuildOutcome::ChangedRebuilt,
      BuildOutcome::Failed,
    ]
    .map(outcome_marker);
    for (i, marker) in markers.iter().enumerate() {
      assert!(!markers[i + 1..].contains(marker), "{marker} repeated");
    }
  }

  #[test]
  fn human_size_steps_through_units() {
    assert_eq!(human_size(0), "0 B");
    assert_eq!(human_size(1023), "1023 B");
    assert_eq!(human_size(1536), "1.5 KiB");
    assert_eq!(human_size(5 * 1024 * 1024), "5.0 MiB");
    assert_eq!(human_size(3 * 1024 * 1024 * 1024), "3.0 GiB");
  }

  #[test]
  fn elapsed_drops_sub_millisecond_noise() {
    assert_eq!(elapsed(Duration::from_micros(1_500_250)), "1s 500ms");
    assert_eq!(elapsed(Duration::from_secs(65)), "1m 5s");
  }
}
