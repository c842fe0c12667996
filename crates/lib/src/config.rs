//! Run configuration.
//!
//! Everything the pipeline reads from outside (the JSON config file and the
//! process environment) is loaded here exactly once into a [`RunContext`].
//! No other module consults ambient process state.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::directive::Directive;
use crate::layout::Layout;

/// Environment variable holding the base64 primary signing key.
pub const SECRET_KEY_ENV: &str = "GPG_SECRET_KEY";
/// Environment variable holding the CI log URL.
pub const JOB_URL_ENV: &str = "GITHUB_JOB_URL";

const DEFAULT_PROJECT: &str = ".";

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config '{path}': {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config: {0}")]
  Parse(#[from] serde_json::Error),

  #[error("config has no host")]
  MissingHost,

  #[error("module name must not be empty")]
  EmptyModuleName,

  #[error("module '{0}' is declared more than once")]
  DuplicateModule(String),
}

/// A buildable module: its checkout lives at `mods/<name>`, built with `-p <project>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleDescriptor {
  pub name: String,
  pub project: String,
}

impl ModuleDescriptor {
  pub fn new(name: impl Into<String>, project: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      project: project.into(),
    }
  }
}

/// Signing identities, each an email known to the keyring.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SigningIdentities {
  /// Long-lived primary key, imported from the environment.
  pub main: String,
  /// Ephemeral key generated fresh each run.
  pub temp: String,
}

impl SigningIdentities {
  /// `(name, email)` pairs in export order.
  pub fn entries(&self) -> [(&'static str, &str); 2] {
    [("main", self.main.as_str()), ("temp", self.temp.as_str())]
  }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ModuleEntry {
  Name(String),
  Explicit {
    name: String,
    #[serde(default = "default_project")]
    project: String,
  },
}

fn default_project() -> String {
  DEFAULT_PROJECT.to_string()
}

#[derive(Debug, Deserialize)]
struct RawConfig {
  host: String,
  #[serde(default)]
  builds: Vec<ModuleEntry>,
  #[serde(default)]
  gpg: Option<SigningIdentities>,
}

/// Validated static configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  /// Base URL of the previous run's published output, always ending in `/`.
  pub host: String,
  pub modules: Vec<ModuleDescriptor>,
  pub gpg: Option<SigningIdentities>,
}

impl Config {
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_json(&content)
  }

  pub fn from_json(content: &str) -> Result<Self, ConfigError> {
    let raw: RawConfig = serde_json::from_str(content)?;

    let host = raw.host.trim();
    if host.is_empty() {
      return Err(ConfigError::MissingHost);
    }
    let host = if host.ends_with('/') {
      host.to_string()
    } else {
      format!("{}/", host)
    };

    let mut seen = HashSet::new();
    let mut modules = Vec::with_capacity(raw.builds.len());
    for entry in raw.builds {
      let module = match entry {
        ModuleEntry::Name(name) => ModuleDescriptor::new(name, DEFAULT_PROJECT),
        ModuleEntry::Explicit { name, project } => ModuleDescriptor::new(name, project),
      };
      if module.name.trim().is_empty() {
        return Err(ConfigError::EmptyModuleName);
      }
      if !seen.insert(module.name.clone()) {
        return Err(ConfigError::DuplicateModule(module.name));
      }
      modules.push(module);
    }

    Ok(Self {
      host,
      modules,
      gpg: raw.gpg,
    })
  }
}

/// Values taken from the process environment. Blank values count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
  pub directive_overrides: BTreeMap<Directive, String>,
  /// Base64-encoded primary signing key.
  pub secret_key: Option<String>,
  pub job_url: Option<String>,
}

impl Environment {
  pub fn from_process() -> Self {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
    let present = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    let directive_overrides = Directive::ALL
      .into_iter()
      .filter_map(|directive| present(directive.env_var()).map(|value| (directive, value)))
      .collect();

    Self {
      directive_overrides,
      secret_key: present(SECRET_KEY_ENV),
      job_url: present(JOB_URL_ENV),
    }
  }
}

/// Everything a run needs, assembled once at startup.
#[derive(Debug, Clone)]
pub struct RunContext {
  pub config: Config,
  pub env: Environment,
  pub layout: Layout,
}

impl RunContext {
  pub fn new(config: Config, env: Environment, layout: Layout) -> Self {
    Self { config, env, layout }
  }

  /// Whether this run signs its output.
  pub fn signing_enabled(&self) -> bool {
    self.env.secret_key.is_some()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  #[test]
  fn parses_bare_and_explicit_modules() {
    let config = Config::from_json(
      r#"{
        "host": "https://builds.example.com/out",
        "builds": ["alpha", { "name": "beta", "project": "fabric" }, { "name": "gamma" }],
        "gpg": { "main": "main@example.com", "temp": "temp@example.com" }
      }"#,
    )
    .unwrap();

    assert_eq!(config.host, "https://builds.example.com/out/");
    assert_eq!(
      config.modules,
      vec![
        ModuleDescriptor::new("alpha", "."),
        ModuleDescriptor::new("beta", "fabric"),
        ModuleDescriptor::new("gamma", "."),
      ]
    );
    assert_eq!(config.gpg.unwrap().temp, "temp@example.com");
  }

  #[test]
  fn gpg_is_optional() {
    let config = Config::from_json(r#"{ "host": "https://h/", "builds": [] }"#).unwrap();
    assert!(config.gpg.is_none());
    assert!(config.modules.is_empty());
  }

  #[test]
  fn rejects_duplicate_modules() {
    let err = Config::from_json(r#"{ "host": "https://h/", "builds": ["a", {"name": "a"}] }"#).unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateModule(name) if name == "a"));
  }

  #[test]
  fn rejects_empty_host() {
    let err = Config::from_json(r#"{ "host": " ", "builds": [] }"#).unwrap_err();
    assert!(matches!(err, ConfigError::MissingHost));
  }

  #[test]
  fn rejects_empty_module_name() {
    let err = Config::from_json(r#"{ "host": "https://h/", "builds": [""] }"#).unwrap_err();
    assert!(matches!(err, ConfigError::EmptyModuleName));
  }

  #[test]
  fn load_reports_missing_file() {
    let temp = tempfile::tempdir().unwrap();
    let err = Config::load(&temp.path().join("config.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
  }

  #[test]
  fn environment_from_lookup_ignores_blank_values() {
    let vars: BTreeMap<&str, &str> = [
      ("BLOCKBUILD_DIRECTIVE_FORCE", "yes"),
      ("BLOCKBUILD_DIRECTIVE_SKIP", "  "),
      ("GPG_SECRET_KEY", ""),
      ("GITHUB_JOB_URL", "https://ci.example.com/job/1"),
    ]
    .into_iter()
    .collect();

    let env = Environment::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

    assert_eq!(env.directive_overrides.len(), 1);
    assert_eq!(env.directive_overrides[&Directive::Force], "yes");
    assert!(env.secret_key.is_none());
    assert_eq!(env.job_url.as_deref(), Some("https://ci.example.com/job/1"));
  }

  #[test]
  #[serial]
  fn environment_from_process_reads_once() {
    temp_env::with_vars(
      [
        ("BLOCKBUILD_DIRECTIVE_BUILD", Some("alpha")),
        ("GPG_SECRET_KEY", Some("a2V5")),
        ("GITHUB_JOB_URL", None),
      ],
      || {
        let env = Environment::from_process();
        assert_eq!(env.directive_overrides[&Directive::Build], "alpha");
        assert_eq!(env.secret_key.as_deref(), Some("a2V5"));
        assert!(env.job_url.is_none());
      },
    );
  }
}
