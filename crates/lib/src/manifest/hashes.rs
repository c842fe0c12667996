//! Hash manifest: a content digest for every staged file.

use std::fmt;
use std::path::Path;

use serde::Serialize;
use walkdir::WalkDir;

use super::ManifestError;
use crate::util::hash::{ContentHash, hash_file};

/// One staged file and its digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HashRecord {
  pub digest: ContentHash,
  /// Path relative to the staging root, `/`-separated.
  pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HashManifest {
  records: Vec<HashRecord>,
}

impl HashManifest {
  /// Hash every file under `staging`.
  ///
  /// Entries are visited in file-name order within each directory so the
  /// listing is stable between runs over the same tree.
  pub fn generate(staging: &Path) -> Result<Self, ManifestError> {
    let mut records = Vec::new();

    for entry in WalkDir::new(staging).sort_by_file_name() {
      let entry = entry?;
      if entry.file_type().is_dir() {
        continue;
      }

      let path = entry.path();
      let relative = path.strip_prefix(staging).unwrap_or(path);
      records.push(HashRecord {
        digest: hash_file(path)?,
        path: to_manifest_path(relative),
      });
    }

    Ok(Self { records })
  }

  /// Parse `<digest> <path>` lines. Malformed lines are skipped.
  pub fn parse(text: &str) -> Self {
    let records = text
      .lines()
      .filter_map(|line| {
        let (digest, path) = line.trim().split_once(' ')?;
        let path = path.trim();
        (!digest.is_empty() && !path.is_empty()).then(|| HashRecord {
          digest: ContentHash(digest.to_string()),
          path: path.to_string(),
        })
      })
      .collect();
    Self { records }
  }

  pub fn records(&self) -> &[HashRecord] {
    &self.records
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  pub fn get(&self, path: &str) -> Option<&HashRecord> {
    self.records.iter().find(|record| record.path == path)
  }

  /// Paths whose current content under `staging` no longer matches the recorded digest.
  pub fn mismatches(&self, staging: &Path) -> Vec<String> {
    self
      .records
      .iter()
      .filter(|record| {
        hash_file(&staging.join(&record.path))
          .map(|actual| actual != record.digest)
          .unwrap_or(true)
      })
      .map(|record| record.path.clone())
      .collect()
  }
}

impl fmt::Display for HashManifest {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, record) in self.records.iter().enumerate() {
      if i > 0 {
        writeln!(f)?;
      }
      write!(f, "{} {}", record.digest, record.path)?;
    }
    Ok(())
  }
}

fn to_manifest_path(relative: &Path) -> String {
  relative
    .components()
    .map(|c| c.as_os_str().to_string_lossy())
    .collect::<Vec<_>>()
    .join("/")
}
