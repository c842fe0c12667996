//! Human-readable run summary (`info.txt`).

use chrono::{DateTime, SecondsFormat, Utc};

use super::{CommitManifest, HashManifest};
use crate::consts::{COMMITS_FILE, HASHES_FILE};

#[derive(Debug, Clone)]
pub struct RunInfo {
  pub built_at: DateTime<Utc>,
  /// Commit of the orchestrating repository itself.
  pub commit: String,
  pub log_url: Option<String>,
  pub hashes: HashManifest,
  pub commits: CommitManifest,
  /// `gpg --list-keys` output, present when the run was signed.
  pub keys: Option<String>,
}

impl RunInfo {
  pub fn render(&self) -> String {
    let mut out = format!(
      "Build date: {}\nCommit hash: {}\nCI log file: {}\n\n{}:\n{}\n\n{}:\n{}",
      self.built_at.to_rfc3339_opts(SecondsFormat::Millis, true),
      self.commit,
      self.log_url.as_deref().unwrap_or("N/A"),
      HASHES_FILE,
      self.hashes,
      COMMITS_FILE,
      self.commits,
    );

    if let Some(keys) = &self.keys {
      out.push_str("\n\nGPG keys:\n");
      out.push_str(keys.trim());
    }

    out.trim().to_string()
  }
}
