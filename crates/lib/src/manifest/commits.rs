//! Commit manifest: the commit each module was built from.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitRecord {
  pub commit: String,
  pub module: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitManifest {
  records: Vec<CommitRecord>,
}

impl CommitManifest {
  pub fn new() -> Self {
    Self::default()
  }

  /// Parse `<commit> <module>` lines. Blank and malformed lines are skipped.
  pub fn parse(text: &str) -> Self {
    let records = text
      .lines()
      .filter_map(|line| {
        let (commit, module) = line.trim().split_once(' ')?;
        let module = module.trim();
        (!commit.is_empty() && !module.is_empty()).then(|| CommitRecord {
          commit: commit.to_string(),
          module: module.to_string(),
        })
      })
      .collect();
    Self { records }
  }

  pub fn push(&mut self, module: impl Into<String>, commit: impl Into<String>) {
    self.records.push(CommitRecord {
      commit: commit.into(),
      module: module.into(),
    });
  }

  /// The recorded commit for `module`, if exactly one record names it.
  pub fn prior_for(&self, module: &str) -> Option<&str> {
    let mut matches = self.records.iter().filter(|record| record.module == module);
    let first = matches.next()?;
    match matches.next() {
      Some(_) => None,
      None => Some(first.commit.as_str()),
    }
  }

  pub fn records(&self) -> &[CommitRecord] {
    &self.records
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }
}

impl fmt::Display for CommitManifest {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, record) in self.records.iter().enumerate() {
      if i > 0 {
        writeln!(f)?;
      }
      write!(f, "{} {}", record.commit, record.module)?;
    }
    Ok(())
  }
}
