//! Run manifests.
//!
//! Three records describe each run's published output:
//! - `hashes.txt`: [`HashManifest`], one `<sha256> <path>` line per staged file
//! - `commits.txt`: [`CommitManifest`], one `<commit> <module>` line per configured module
//! - `info.txt`: [`RunInfo`], a human-readable summary of both plus run metadata

mod commits;
mod hashes;
mod info;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::consts::{BUNDLE_FILE, KEYS_DIR, MANIFEST_PREFIXES};
use crate::util::hash::HashError;

pub use commits::{CommitManifest, CommitRecord};
pub use hashes::{HashManifest, HashRecord};
pub use info::RunInfo;

#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("failed to walk staging directory: {0}")]
  Walk(#[from] walkdir::Error),

  #[error(transparent)]
  Hash(#[from] HashError),

  #[error("failed to write {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to remove {path}: {source}")]
  Remove {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Remove the previous run's manifests, signatures, keys and bundle from `staging`.
///
/// Run after restoring the previous bundle so that the new hash manifest only
/// covers real build output.
pub fn clean_previous(staging: &Path) -> Result<Vec<PathBuf>, ManifestError> {
  let mut removed = Vec::new();

  let entries = match fs::read_dir(staging) {
    Ok(entries) => entries,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(removed),
    Err(source) => {
      return Err(ManifestError::Remove {
        path: staging.to_path_buf(),
        source,
      });
    }
  };

  let mut targets: Vec<PathBuf> = entries
    .filter_map(Result::ok)
    .filter(|entry| {
      let name = entry.file_name();
      let name = name.to_string_lossy();
      MANIFEST_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
    })
    .map(|entry| entry.path())
    .collect();
  targets.push(staging.join(KEYS_DIR));
  targets.push(staging.join(BUNDLE_FILE));

  for path in targets {
    let result = if path.is_dir() {
      fs::remove_dir_all(&path)
    } else if path.exists() {
      fs::remove_file(&path)
    } else {
      continue;
    };
    result.map_err(|source| ManifestError::Remove {
      path: path.clone(),
      source,
    })?;
    debug!(path = ?path, "removed previous output");
    removed.push(path);
  }

  Ok(removed)
}

/// Write a manifest file into `staging`.
pub fn write_file(staging: &Path, name: &str, content: &str) -> Result<PathBuf, ManifestError> {
  let path = staging.join(name);
  fs::write(&path, content).map_err(|source| ManifestError::Write {
    path: path.clone(),
    source,
  })?;
  Ok(path)
}
