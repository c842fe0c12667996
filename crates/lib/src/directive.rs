//! Build directives.
//!
//! A directive is a marker token such as `[blockbuild:force]` placed on a line
//! of the latest commit message. When no commit line carries the marker, the
//! matching `BLOCKBUILD_DIRECTIVE_*` environment override is used instead.
//!
//! Precedence:
//! - `skip` ends the run before anything is touched, with a successful exit.
//! - `force` rebuilds every module regardless of commit hashes.
//! - `build` rebuilds each module whose name appears anywhere in the matched line.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Directive {
  Skip,
  Force,
  Build,
}

impl Directive {
  pub const ALL: [Directive; 3] = [Directive::Skip, Directive::Force, Directive::Build];

  pub fn as_str(self) -> &'static str {
    match self {
      Directive::Skip => "skip",
      Directive::Force => "force",
      Directive::Build => "build",
    }
  }

  /// Token searched for in commit message lines.
  pub fn marker(self) -> &'static str {
    match self {
      Directive::Skip => "[blockbuild:skip]",
      Directive::Force => "[blockbuild:force]",
      Directive::Build => "[blockbuild:build]",
    }
  }

  /// Environment variable consulted when no commit line matches.
  pub fn env_var(self) -> &'static str {
    match self {
      Directive::Skip => "BLOCKBUILD_DIRECTIVE_SKIP",
      Directive::Force => "BLOCKBUILD_DIRECTIVE_FORCE",
      Directive::Build => "BLOCKBUILD_DIRECTIVE_BUILD",
    }
  }
}

impl fmt::Display for Directive {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Directives in effect for one run. Immutable once resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectiveSet {
  pub skip: bool,
  pub force_all: bool,
  /// Text of the line carrying the `build` directive; module names are matched against it.
  pub build_line: Option<String>,
}

impl DirectiveSet {
  /// Resolve directives from a commit message, falling back to `overrides`.
  pub fn resolve(commit_message: &str, overrides: &BTreeMap<Directive, String>) -> Self {
    let lookup = |directive: Directive| -> Option<String> {
      if let Some(line) = find_marker_line(commit_message, directive) {
        debug!(%directive, line = %line, "directive found in commit message");
        return Some(line);
      }
      let fallback = overrides.get(&directive).cloned();
      if fallback.is_some() {
        debug!(%directive, var = directive.env_var(), "directive taken from environment");
      }
      fallback
    };

    Self {
      skip: lookup(Directive::Skip).is_some(),
      force_all: lookup(Directive::Force).is_some(),
      build_line: lookup(Directive::Build),
    }
  }

  /// Whether the `build` directive names this module.
  pub fn names(&self, module: &str) -> bool {
    self.build_line.as_deref().is_some_and(|line| line.contains(module))
  }

  /// Whether this module must be rebuilt even when unchanged.
  pub fn forces(&self, module: &str) -> bool {
    self.force_all || self.names(module)
  }
}

fn find_marker_line(message: &str, directive: Directive) -> Option<String> {
  message
    .lines()
    .find(|line| line.contains(directive.marker()))
    .map(str::to_string)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn no_overrides() -> BTreeMap<Directive, String> {
    BTreeMap::new()
  }

  #[test]
  fn empty_message_resolves_nothing() {
    let set = DirectiveSet::resolve("Update dependencies", &no_overrides());
    assert_eq!(set, DirectiveSet::default());
  }

  #[test]
  fn skip_marker_anywhere_in_message() {
    let set = DirectiveSet::resolve("Fix typo\n\nci: [blockbuild:skip]", &no_overrides());
    assert!(set.skip);
    assert!(!set.force_all);
  }

  #[test]
  fn force_marker_forces_every_module() {
    let set = DirectiveSet::resolve("[blockbuild:force] rebuild world", &no_overrides());
    assert!(set.force_all);
    assert!(set.forces("anything"));
  }

  #[test]
  fn build_marker_keeps_full_line() {
    let set = DirectiveSet::resolve("Bump\n[blockbuild:build] alpha gamma\ntrailer", &no_overrides());
    assert_eq!(set.build_line.as_deref(), Some("[blockbuild:build] alpha gamma"));
    assert!(set.forces("alpha"));
    assert!(set.forces("gamma"));
    assert!(!set.forces("beta"));
  }

  #[test]
  fn build_matching_is_substring_containment() {
    let set = DirectiveSet::resolve("[blockbuild:build] sodium-fabric", &no_overrides());
    assert!(set.names("sodium"));
    assert!(set.names("fabric"));
  }

  #[test]
  fn environment_override_used_when_commit_silent() {
    let mut overrides = no_overrides();
    overrides.insert(Directive::Build, "beta".to_string());
    overrides.insert(Directive::Force, "1".to_string());

    let set = DirectiveSet::resolve("plain commit", &overrides);
    assert!(set.force_all);
    assert_eq!(set.build_line.as_deref(), Some("beta"));
  }

  #[test]
  fn commit_line_wins_over_environment() {
    let mut overrides = no_overrides();
    overrides.insert(Directive::Build, "beta".to_string());

    let set = DirectiveSet::resolve("[blockbuild:build] alpha", &overrides);
    assert!(set.names("alpha"));
    assert!(!set.names("beta"));
  }

  #[test]
  fn resolution_is_deterministic() {
    let message = "[blockbuild:build] alpha\n[blockbuild:force]";
    assert_eq!(
      DirectiveSet::resolve(message, &no_overrides()),
      DirectiveSet::resolve(message, &no_overrides())
    );
  }
}
