//! On-disk layout of a run.
//!
//! ```text
//! {root}/
//! ├── mods/<name>/        # module checkouts (inputs, never modified here)
//! ├── out/                # staging area, published as-is
//! │   ├── <name>/         # per-module artifacts
//! │   ├── mvn/            # maven repository
//! │   └── gpg/            # exported public keys
//! └── tmp/                # scratch: key material, bundles in flight
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::consts::{KEYS_DIR, MAVEN_DIR, MODS_DIR, OUT_DIR, TMP_DIR};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
  root: PathBuf,
}

impl Layout {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  /// Layout rooted at `root` resolved against the current directory.
  ///
  /// Tools run with their working directory set to a module checkout, so every
  /// path handed to them must be absolute.
  pub fn absolute(root: impl AsRef<Path>) -> io::Result<Self> {
    std::path::absolute(root).map(Self::new)
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn module_dir(&self, name: &str) -> PathBuf {
    self.root.join(MODS_DIR).join(name)
  }

  pub fn out_dir(&self) -> PathBuf {
    self.root.join(OUT_DIR)
  }

  pub fn module_out_dir(&self, name: &str) -> PathBuf {
    self.out_dir().join(name)
  }

  pub fn maven_dir(&self) -> PathBuf {
    self.out_dir().join(MAVEN_DIR)
  }

  pub fn keys_dir(&self) -> PathBuf {
    self.out_dir().join(KEYS_DIR)
  }

  pub fn tmp_dir(&self) -> PathBuf {
    self.root.join(TMP_DIR)
  }

  /// Recreate `out/`, `out/mvn/` and `tmp/` empty.
  pub fn prepare(&self) -> io::Result<()> {
    for dir in [self.out_dir(), self.tmp_dir()] {
      if dir.exists() {
        info!(path = ?dir, "cleaning directory");
        fs::remove_dir_all(&dir)?;
      }
      fs::create_dir_all(&dir)?;
    }
    fs::create_dir_all(self.maven_dir())
  }
}
