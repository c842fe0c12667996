//! Bundling of the staging directory.
//!
//! The bundle is a gzipped tarball rooted at the staging directory, so that
//! extracting it into an empty staging directory reproduces the same layout.
//! It is built in scratch space and then moved into staging, where the next
//! run fetches it as the previous bundle.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tar::{Archive, Builder};
use thiserror::Error;
use tracing::info;

use crate::consts::BUNDLE_FILE;

#[derive(Debug, Error)]
pub enum ArchiveError {
  #[error("failed to compress {path}: {source}")]
  Pack {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to extract {path}: {source}")]
  Unpack {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Compress `staging` into `scratch/out.tar.gz`, then move it to `staging/out.tar.gz`.
pub fn pack(staging: &Path, scratch: &Path) -> Result<PathBuf, ArchiveError> {
  let pending = scratch.join(BUNDLE_FILE);
  let to_err = |source| ArchiveError::Pack {
    path: staging.to_path_buf(),
    source,
  };

  fs::create_dir_all(scratch).map_err(to_err)?;
  let file = File::create(&pending).map_err(to_err)?;
  let mut builder = Builder::new(GzEncoder::new(BufWriter::new(file), Compression::default()));
  builder.follow_symlinks(false);

  let mut entries: Vec<_> = fs::read_dir(staging)
    .map_err(to_err)?
    .collect::<Result<_, _>>()
    .map_err(to_err)?;
  entries.sort_by_key(|entry| entry.file_name());

  for entry in entries {
    let name = entry.file_name();
    let path = entry.path();
    if entry.file_type().map_err(to_err)?.is_dir() {
      builder.append_dir_all(&name, &path).map_err(to_err)?;
    } else {
      builder.append_path_with_name(&path, &name).map_err(to_err)?;
    }
  }

  let encoder = builder.into_inner().map_err(to_err)?;
  let writer = encoder.finish().map_err(to_err)?;
  writer.into_inner().map_err(|e| to_err(e.into_error()))?;

  let bundle = staging.join(BUNDLE_FILE);
  fs::rename(&pending, &bundle).map_err(to_err)?;

  info!(path = ?bundle, "compressed build artifacts");
  Ok(bundle)
}

/// Extract a bundle produced by [`pack`] into `staging`.
pub fn unpack(bundle: &Path, staging: &Path) -> Result<(), ArchiveError> {
  let to_err = |source| ArchiveError::Unpack {
    path: bundle.to_path_buf(),
    source,
  };

  fs::create_dir_all(staging).map_err(to_err)?;
  let file = File::open(bundle).map_err(to_err)?;
  let mut archive = Archive::new(GzDecoder::new(BufReader::new(file)));
  archive.unpack(staging).map_err(to_err)?;

  info!(path = ?staging, "extracted previous build artifacts");
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::manifest::HashManifest;
  use tempfile::tempdir;

  fn populate(staging: &Path) {
    fs::create_dir_all(staging.join("alpha")).unwrap();
    fs::create_dir_all(staging.join("mvn/com/example/alpha/1.0")).unwrap();
    fs::create_dir_all(staging.join("gpg")).unwrap();
    fs::write(staging.join("alpha/alpha-1.0.jar"), "alpha jar").unwrap();
    fs::write(staging.join("mvn/com/example/alpha/1.0/alpha-1.0.pom"), "<project/>").unwrap();
    fs::write(staging.join("gpg/main.asc"), "-----BEGIN PGP PUBLIC KEY BLOCK-----").unwrap();
    fs::write(staging.join("hashes.txt"), "h").unwrap();
    fs::write(staging.join("hashes.txt.sig"), "sig").unwrap();
  }

  #[test]
  fn bundle_lands_in_staging_root() {
    let temp = tempdir().unwrap();
    let staging = temp.path().join("out");
    let scratch = temp.path().join("tmp");
    populate(&staging);

    let bundle = pack(&staging, &scratch).unwrap();

    assert_eq!(bundle, staging.join("out.tar.gz"));
    assert!(bundle.is_file());
    assert!(!scratch.join("out.tar.gz").exists());
  }

  #[test]
  fn archive_root_is_staging_dir() {
    let temp = tempdir().unwrap();
    let staging = temp.path().join("out");
    populate(&staging);
    let bundle = pack(&staging, &temp.path().join("tmp")).unwrap();

    let file = File::open(&bundle).unwrap();
    let mut archive = Archive::new(GzDecoder::new(file));
    let names: Vec<String> = archive
      .entries()
      .unwrap()
      .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
      .collect();

    assert!(names.contains(&"alpha/alpha-1.0.jar".to_string()));
    assert!(names.contains(&"hashes.txt".to_string()));
    assert!(names.iter().all(|n| !n.starts_with("out/") && !n.starts_with('/')));
    assert!(names.iter().all(|n| n != "out.tar.gz"));
  }

  #[test]
  fn round_trip_preserves_files_and_hashes() {
    let temp = tempdir().unwrap();
    let first = temp.path().join("first");
    populate(&first);
    let original = HashManifest::generate(&first).unwrap();
    let bundle = pack(&first, &temp.path().join("tmp")).unwrap();

    let second = temp.path().join("second");
    unpack(&bundle, &second).unwrap();
    let rebundle = pack(&second, &temp.path().join("tmp")).unwrap();

    let third = temp.path().join("third");
    unpack(&rebundle, &third).unwrap();

    assert!(!third.join("out.tar.gz").exists());
    assert_eq!(HashManifest::generate(&third).unwrap(), original);
  }

  #[test]
  fn unpack_missing_bundle_fails() {
    let temp = tempdir().unwrap();
    let err = unpack(&temp.path().join("none.tar.gz"), &temp.path().join("out")).unwrap_err();
    assert!(matches!(err, ArchiveError::Unpack { .. }));
  }

  #[test]
  fn unpack_corrupt_bundle_fails() {
    let temp = tempdir().unwrap();
    let bundle = temp.path().join("out.tar.gz");
    fs::write(&bundle, "definitely not gzip").unwrap();

    assert!(unpack(&bundle, &temp.path().join("out")).is_err());
  }
}
