//! Dual-key signing of the published manifests.
//!
//! Each signed run imports the long-lived primary key, generates a throwaway
//! ephemeral key, exports both public keys into `out/gpg/`, and signs every
//! top-level staged file with both. Any failure aborts the run so that a
//! partial signature set is never published.

use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;
use tracing::info;

use crate::config::SigningIdentities;
use crate::consts::{EPHEMERAL_SIGNATURE_SUFFIX, SIGNATURE_SUFFIX};
use crate::exec::{CommandRunner, ExecError, run_checked};
use crate::layout::Layout;

const SECRET_KEY_FILE: &str = "secret.key";
const KEY_PARAMS_FILE: &str = "gpg.conf";

#[derive(Debug, Error)]
pub enum SignError {
  #[error("signing key supplied but no gpg identities configured")]
  MissingIdentities,

  #[error("signing key is not valid base64: {0}")]
  Decode(#[from] base64::DecodeError),

  #[error("io error at {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error(transparent)]
  Exec(#[from] ExecError),
}

/// One detached signature produced for a staged file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureRecord {
  pub file: PathBuf,
  /// Identity (email) of the signing key.
  pub signer: String,
  pub signature: PathBuf,
}

/// Batch parameters for an unprotected, non-expiring ephemeral key.
pub fn ephemeral_key_params(email: &str) -> String {
  format!(
    "Key-Type: RSA\n\
     Key-Length: 4096\n\
     Name-Real: blockbuild\n\
     Name-Email: {}\n\
     Expire-Date: 0\n\
     %no-protection\n\
     %commit",
    email
  )
}

/// Import the primary key, generate the ephemeral key and export both public keys.
///
/// Returns the keyring listing for the run summary.
pub async fn prepare_keys<R: CommandRunner>(
  runner: &R,
  layout: &Layout,
  identities: &SigningIdentities,
  secret_key: &str,
) -> Result<String, SignError> {
  let root = layout.root();
  let tmp = layout.tmp_dir();

  info!("importing secret key");
  let decoded = STANDARD.decode(secret_key.trim())?;
  let key_path = tmp.join(SECRET_KEY_FILE);
  write(&key_path, &decoded)?;
  run_checked(
    runner,
    &format!("gpg --batch --import \"{}\"", key_path.display()),
    root,
    "failed to import secret key",
  )
  .await?;

  info!(email = %identities.temp, "generating temporary key");
  let params_path = tmp.join(KEY_PARAMS_FILE);
  write(&params_path, ephemeral_key_params(&identities.temp).as_bytes())?;
  run_checked(
    runner,
    &format!("gpg --batch --gen-key \"{}\"", params_path.display()),
    root,
    "failed to generate temporary key",
  )
  .await?;

  info!("exporting keys");
  let keys_dir = layout.keys_dir();
  fs::create_dir_all(&keys_dir).map_err(|source| SignError::Io {
    path: keys_dir.clone(),
    source,
  })?;
  for (name, email) in identities.entries() {
    let dest = keys_dir.join(format!("{}.asc", name));
    run_checked(
      runner,
      &format!("gpg --batch --yes --armor --output \"{}\" --export {}", dest.display(), email),
      root,
      &format!("failed to export key {}", name),
    )
    .await?;
  }

  let listing = run_checked(runner, "gpg --list-keys", root, "failed to list keys").await?;
  Ok(listing.stdout)
}

/// Sign every regular file directly inside `staging` with both keys.
pub async fn sign_staging<R: CommandRunner>(
  runner: &R,
  layout: &Layout,
  identities: &SigningIdentities,
) -> Result<Vec<SignatureRecord>, SignError> {
  let staging = layout.out_dir();
  let files = top_level_files(&staging)?;
  let mut records = Vec::with_capacity(files.len() * 2);

  for file in files {
    info!(path = ?file, "signing");
    for (signer, suffix) in [
      (identities.main.as_str(), SIGNATURE_SUFFIX),
      (identities.temp.as_str(), EPHEMERAL_SIGNATURE_SUFFIX),
    ] {
      let signature = with_suffix(&file, suffix);
      run_checked(
        runner,
        &sign_command(&file, &signature, signer),
        layout.root(),
        &format!("failed to sign {} with {}", file.display(), signer),
      )
      .await?;
      records.push(SignatureRecord {
        file: file.clone(),
        signer: signer.to_string(),
        signature,
      });
    }
  }

  Ok(records)
}

fn sign_command(file: &Path, signature: &Path, signer: &str) -> String {
  format!(
    "gpg --batch --yes --output \"{}\" --sign --default-key \"{}\" \"{}\"",
    signature.display(),
    signer,
    file.display()
  )
}

fn with_suffix(file: &Path, suffix: &str) -> PathBuf {
  let mut name = file.as_os_str().to_os_string();
  name.push(suffix);
  PathBuf::from(name)
}

fn top_level_files(dir: &Path) -> Result<Vec<PathBuf>, SignError> {
  let to_err = |source| SignError::Io {
    path: dir.to_path_buf(),
    source,
  };
  let mut files = Vec::new();
  for entry in fs::read_dir(dir).map_err(to_err)? {
    let entry = entry.map_err(to_err)?;
    if entry.file_type().map_err(to_err)?.is_file() {
      files.push(entry.path());
    }
  }
  files.sort();
  Ok(files)
}

fn write(path: &Path, content: &[u8]) -> Result<(), SignError> {
  fs::write(path, content).map_err(|source| SignError::Io {
    path: path.to_path_buf(),
    source,
  })
}
